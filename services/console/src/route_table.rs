//! Declarative route table
//!
//! Maps page paths to the roles permitted to open them. The table is built
//! once from configuration and never mutated, so it can be shared across
//! requests without synchronisation.

use std::collections::HashMap;

use auth::{RoleAliases, RoleSet, UnknownRole};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Route table entry as written in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    pub path: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub nav_section: Option<String>,
    #[serde(default)]
    pub nav_title: Option<String>,
    #[serde(default)]
    pub nav_description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Errors raised while building the route table or gate
#[derive(Error, Debug)]
pub enum RouteTableError {
    #[error("Route path must start with '/': {0:?}")]
    InvalidPath(String),

    #[error("Route {0} is declared more than once")]
    Duplicate(String),

    #[error("Route {path} names an unknown role: {source}")]
    UnknownRole {
        path: String,
        #[source]
        source: UnknownRole,
    },

    #[error("Route {0} lists no roles")]
    NoRoles(String),

    #[error("Invalid gate settings: {0}")]
    Gate(String),
}

/// Validated route entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    pub path: String,
    pub roles: RoleSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl RouteEntry {
    /// Any-of match between held roles and permitted roles
    pub fn permits(&self, roles: &RoleSet) -> bool {
        self.roles.intersects(roles)
    }

    /// Entries with a title appear in navigation menus
    pub fn is_navigable(&self) -> bool {
        self.nav_title.is_some()
    }
}

/// Immutable exact-match route table
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    /// Build the table, resolving role names strictly
    pub fn from_specs(specs: Vec<RouteSpec>, aliases: &RoleAliases) -> Result<Self, RouteTableError> {
        let mut table = RouteTable::default();

        for spec in specs {
            let Some(key) = canonical_path(&spec.path) else {
                return Err(RouteTableError::InvalidPath(spec.path));
            };
            if table.index.contains_key(&key) {
                return Err(RouteTableError::Duplicate(key));
            }
            let path = spec.path;
            if spec.roles.is_empty() {
                return Err(RouteTableError::NoRoles(path));
            }

            let roles = RoleSet::parse_strict(&spec.roles, aliases).map_err(|source| {
                RouteTableError::UnknownRole {
                    path: path.clone(),
                    source,
                }
            })?;

            table.index.insert(key, table.entries.len());
            table.entries.push(RouteEntry {
                path,
                roles,
                nav_section: spec.nav_section,
                nav_title: spec.nav_title,
                nav_description: spec.nav_description,
                icon: spec.icon,
            });
        }

        Ok(table)
    }

    /// Exact lookup on the canonical form of `path`
    pub fn lookup(&self, path: &str) -> Option<&RouteEntry> {
        canonical_path(path).and_then(|key| self.lookup_canonical(&key))
    }

    /// Lookup for a path already passed through [`canonical_path`]
    pub fn lookup_canonical(&self, key: &str) -> Option<&RouteEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical form of a request path, used for every gate comparison
///
/// Percent-encoded unreserved characters are decoded, empty and `.` segments
/// are dropped, `..` removes the previous segment and the result is
/// lowercased. Other escapes stay encoded. Returns `None` for a relative
/// path, a malformed escape or a `..` that climbs above the root.
pub fn canonical_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix('/')?;

    let mut segments: Vec<String> = Vec::new();
    for raw in rest.split('/') {
        let segment = decode_unreserved(raw)?;
        match segment.as_str() {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            _ => segments.push(segment.to_lowercase()),
        }
    }

    Some(format!("/{}", segments.join("/")))
}

fn decode_unreserved(segment: &str) -> Option<String> {
    let mut decoded = String::with_capacity(segment.len());
    let mut rest = segment;

    while let Some(pos) = rest.find('%') {
        decoded.push_str(&rest[..pos]);
        let hex = rest.get(pos + 1..pos + 3)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let byte = u8::from_str_radix(hex, 16).ok()?;
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            decoded.push(char::from(byte));
        } else {
            decoded.push('%');
            decoded.push_str(hex);
        }
        rest = &rest[pos + 3..];
    }
    decoded.push_str(rest);

    Some(decoded)
}

//! Role enumeration and normalisation
//!
//! The console recognises one canonical role vocabulary. Role names coming
//! from sessions or configuration are matched case-insensitively, and legacy
//! vocabularies are only understood through an explicit [`RoleAliases`] map.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical console role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Role {
    Admin,
    User,
    Ordertaker,
    Manager,
}

/// A role name that is neither canonical nor aliased
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    /// Every canonical role
    pub const ALL: [Role; 4] = [Role::Admin, Role::User, Role::Ordertaker, Role::Manager];

    /// Get the canonical role name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
            Role::Ordertaker => "Ordertaker",
            Role::Manager => "Manager",
        }
    }

    /// Resolve a role name, trying canonical names first and aliases second
    pub fn parse(name: &str, aliases: &RoleAliases) -> Option<Role> {
        let name = name.trim();
        name.parse().ok().or_else(|| aliases.resolve(name))
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit mapping from legacy role names to canonical roles
///
/// Keys are stored lowercased, so lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HashMap<String, String>")]
pub struct RoleAliases(HashMap<String, Role>);

impl RoleAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alias, returning the updated map
    pub fn with(mut self, alias: &str, role: Role) -> Self {
        self.0.insert(alias.trim().to_ascii_lowercase(), role);
        self
    }

    /// Look up an alias
    pub fn resolve(&self, alias: &str) -> Option<Role> {
        self.0.get(&alias.trim().to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<HashMap<String, String>> for RoleAliases {
    type Error = UnknownRole;

    fn try_from(raw: HashMap<String, String>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .try_fold(RoleAliases::new(), |aliases, (alias, target)| {
                Ok(aliases.with(&alias, target.parse()?))
            })
    }
}

/// Deduplicated set of canonical roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Normalise role names held by a principal
    ///
    /// Names that resolve to no canonical role are dropped.
    pub fn normalize<I, S>(names: I, aliases: &RoleAliases) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| Role::parse(name.as_ref(), aliases))
            .collect()
    }

    /// Parse role names from configuration, failing on the first unknown name
    pub fn parse_strict<I, S>(names: I, aliases: &RoleAliases) -> Result<Self, UnknownRole>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                Role::parse(name, aliases).ok_or_else(|| UnknownRole(name.trim().to_string()))
            })
            .collect()
    }

    /// True when at least one role is shared ("any-of" matching)
    pub fn intersects(&self, other: &RoleSet) -> bool {
        self.0.iter().any(|role| other.0.contains(role))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Canonical role names in a stable order
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|role| role.as_str()).collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        RoleSet(iter.into_iter().collect())
    }
}

impl Serialize for RoleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

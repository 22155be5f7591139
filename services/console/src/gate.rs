//! Route access gate
//!
//! Decides, for every page request, whether to let it through or where to
//! redirect it. The decision depends only on the requested path, the verified
//! session (if any), the immutable route table and the gate settings.

use std::collections::HashSet;

use auth::{RoleAliases, Session};
use reqwest::Url;
use serde::Deserialize;

use crate::route_table::{RouteEntry, RouteTable, RouteTableError, canonical_path};

/// Query parameter carrying the originally requested path to the login page
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// What to do with a non-public path that has no route table entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPathPolicy {
    /// Any authenticated session may open it
    #[default]
    Allow,
    /// Redirect to the access-denied page
    Deny,
}

/// Gate settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub login_path: String,
    pub access_denied_path: String,
    pub home_path: String,
    /// Paths exempt from the gate
    pub public_paths: Vec<String>,
    /// Path prefixes exempt from the gate (API routes, static assets)
    pub excluded_prefixes: Vec<String>,
    pub unknown_path_policy: UnknownPathPolicy,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            access_denied_path: "/access-denied".to_string(),
            home_path: "/".to_string(),
            public_paths: vec!["/access-denied".to_string()],
            excluded_prefixes: vec![
                "/api/".to_string(),
                "/assets/".to_string(),
                "/static/".to_string(),
                "/favicon.ico".to_string(),
            ],
            unknown_path_policy: UnknownPathPolicy::Allow,
        }
    }
}

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Public or excluded path; the gate does not apply
    Public,
    Allow,
    RedirectLogin { callback_url: String },
    RedirectHome,
    RedirectAccessDenied,
    /// The path has no canonical form
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Public => "public",
            Decision::Allow => "allow",
            Decision::RedirectLogin { .. } => "redirect_login",
            Decision::RedirectHome => "redirect_home",
            Decision::RedirectAccessDenied => "redirect_access_denied",
            Decision::Reject => "reject",
        }
    }
}

/// Role-based access gate
#[derive(Debug, Clone)]
pub struct RouteGate {
    settings: GateSettings,
    login_key: String,
    public_paths: HashSet<String>,
    excluded_prefixes: Vec<String>,
    table: RouteTable,
    aliases: RoleAliases,
}

impl RouteGate {
    /// Validate settings and assemble the gate
    pub fn new(
        settings: GateSettings,
        table: RouteTable,
        aliases: RoleAliases,
    ) -> Result<Self, RouteTableError> {
        let fixed = [
            &settings.login_path,
            &settings.access_denied_path,
            &settings.home_path,
        ];
        for path in fixed
            .into_iter()
            .chain(&settings.public_paths)
            .chain(&settings.excluded_prefixes)
        {
            if !path.starts_with('/') {
                return Err(RouteTableError::InvalidPath(path.clone()));
            }
        }

        let canonical = |path: &String| {
            canonical_path(path).ok_or_else(|| RouteTableError::InvalidPath(path.clone()))
        };

        let login_key = canonical(&settings.login_path)?;
        if canonical(&settings.home_path)? == login_key {
            return Err(RouteTableError::Gate(
                "home path must differ from the login path".to_string(),
            ));
        }
        // The access-denied page must stay reachable or denials would loop.
        let public_paths = settings
            .public_paths
            .iter()
            .chain(std::iter::once(&settings.access_denied_path))
            .map(canonical)
            .collect::<Result<HashSet<_>, _>>()?;
        if public_paths.contains(&login_key) {
            return Err(RouteTableError::Gate(format!(
                "login path {} must not be listed as public",
                settings.login_path
            )));
        }
        if table.lookup(&settings.access_denied_path).is_some() {
            return Err(RouteTableError::Gate(format!(
                "access-denied path {} must not be role protected",
                settings.access_denied_path
            )));
        }

        let excluded_prefixes = settings
            .excluded_prefixes
            .iter()
            .map(|prefix| prefix.to_lowercase())
            .collect();

        Ok(Self {
            settings,
            login_key,
            public_paths,
            excluded_prefixes,
            table,
            aliases,
        })
    }

    /// Whether the canonical path `key` bypasses the gate entirely
    fn is_public(&self, key: &str) -> bool {
        self.public_paths.contains(key)
            || self
                .excluded_prefixes
                .iter()
                .any(|prefix| key.starts_with(prefix.as_str()))
    }

    /// Decide the fate of a request for `target` (path plus optional query)
    ///
    /// Matching uses the canonical form of the path; the login callback
    /// carries `target` as requested. `session` must already be verified; an
    /// expired or forged cookie is passed as `None`.
    pub fn decide(&self, target: &str, session: Option<&Session>) -> Decision {
        let path = target.split(['?', '#']).next().unwrap_or_default();
        let Some(key) = canonical_path(path) else {
            return Decision::Reject;
        };

        if key == self.login_key {
            return match session {
                Some(_) => Decision::RedirectHome,
                None => Decision::Allow,
            };
        }

        if self.is_public(&key) {
            return Decision::Public;
        }

        let Some(session) = session else {
            return Decision::RedirectLogin {
                callback_url: target.to_string(),
            };
        };

        let roles = session.role_set(&self.aliases);
        match self.table.lookup_canonical(&key) {
            Some(entry) if entry.permits(&roles) => Decision::Allow,
            Some(_) => Decision::RedirectAccessDenied,
            None => match self.settings.unknown_path_policy {
                UnknownPathPolicy::Allow => Decision::Allow,
                UnknownPathPolicy::Deny => Decision::RedirectAccessDenied,
            },
        }
    }

    /// Redirect target for a decision; `None` when the request is not redirected
    pub fn location(&self, decision: &Decision) -> Option<String> {
        match decision {
            Decision::Public | Decision::Allow | Decision::Reject => None,
            Decision::RedirectLogin { callback_url } => {
                Some(login_location(&self.settings.login_path, callback_url))
            }
            Decision::RedirectHome => Some(self.settings.home_path.clone()),
            Decision::RedirectAccessDenied => Some(self.settings.access_denied_path.clone()),
        }
    }

    /// Where to send a user after login
    ///
    /// Only local absolute paths are honoured; anything else, including a
    /// callback to the login page itself, falls back to the home page.
    pub fn post_login_target(&self, callback_url: Option<&str>) -> String {
        callback_url
            .filter(|url| is_local_path(url))
            .filter(|url| {
                let path = url.split(['?', '#']).next().unwrap_or_default();
                canonical_path(path).is_some_and(|key| key != self.login_key)
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.home_path.clone())
    }

    /// Navigable entries the session may open, in declaration order
    pub fn navigation(&self, session: &Session) -> Vec<&RouteEntry> {
        let roles = session.role_set(&self.aliases);
        self.table
            .entries()
            .iter()
            .filter(|entry| entry.is_navigable() && entry.permits(&roles))
            .collect()
    }

    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    pub fn aliases(&self) -> &RoleAliases {
        &self.aliases
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

/// Build `/login?callbackUrl=<path>` with the callback percent-encoded
fn login_location(login_path: &str, callback_url: &str) -> String {
    // Any absolute base works; only the path and query are kept.
    match Url::parse("http://console.invalid/").and_then(|base| base.join(login_path)) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair(CALLBACK_PARAM, callback_url);
            match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            }
        }
        Err(_) => login_path.to_string(),
    }
}

fn is_local_path(url: &str) -> bool {
    url.starts_with('/')
        && !url.starts_with("//")
        && !url.contains('\\')
        && !url.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route_table::RouteSpec;
    use auth::Role;

    fn route(path: &str, roles: &[&str], nav_title: Option<&str>) -> RouteSpec {
        RouteSpec {
            path: path.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            nav_section: None,
            nav_title: nav_title.map(str::to_string),
            nav_description: None,
            icon: None,
        }
    }

    fn aliases() -> RoleAliases {
        RoleAliases::new()
            .with("requester", Role::User)
            .with("approver", Role::Manager)
            .with("moderator", Role::Admin)
    }

    fn gate_with(settings: GateSettings) -> RouteGate {
        let aliases = aliases();
        let table = RouteTable::from_specs(
            vec![
                route("/request", &["User", "Admin"], Some("Meal request")),
                route("/approve", &["approver"], Some("Approvals")),
                route("/setting/users", &["admin", "moderator"], Some("Users")),
                route("/report/raw", &["Admin"], None),
            ],
            &aliases,
        )
        .unwrap();
        RouteGate::new(settings, table, aliases).unwrap()
    }

    fn gate() -> RouteGate {
        gate_with(GateSettings::default())
    }

    fn session(roles: &[&str]) -> Session {
        Session {
            sub: "1".to_string(),
            name: "Test".to_string(),
            username: "test".to_string(),
            title: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: 0,
            exp: i64::MAX,
            jti: "jti".to_string(),
            api_token: None,
        }
    }

    #[test]
    fn test_public_paths_always_allowed() {
        let gate = gate();
        for path in ["/access-denied", "/api/session", "/assets/app.js", "/favicon.ico"] {
            assert_eq!(gate.decide(path, None), Decision::Public, "{path}");
            assert_eq!(
                gate.decide(path, Some(&session(&["User"]))),
                Decision::Public,
                "{path}"
            );
        }
    }

    #[test]
    fn test_anonymous_redirected_to_login() {
        let gate = gate();
        for path in ["/", "/request", "/setting/users", "/unlisted"] {
            assert_eq!(
                gate.decide(path, None),
                Decision::RedirectLogin {
                    callback_url: path.to_string()
                }
            );
        }
    }

    #[test]
    fn test_login_callback_keeps_query() {
        let gate = gate();
        let decision = gate.decide("/report/raw?month=3&year=2024", None);
        assert_eq!(
            decision,
            Decision::RedirectLogin {
                callback_url: "/report/raw?month=3&year=2024".to_string()
            }
        );
        assert_eq!(
            gate.location(&decision).as_deref(),
            Some("/login?callbackUrl=%2Freport%2Fraw%3Fmonth%3D3%26year%3D2024")
        );
    }

    #[test]
    fn test_path_variants_match_protected_route() {
        let gate = gate();
        for path in [
            "/setting/users/",
            "/setting/users//",
            "//setting/users",
            "/setting/user%73",
            "/Setting/Users",
            "/setting/./users",
            "/assets/../setting/users",
            "/api/%2e%2e/setting/users",
        ] {
            assert_eq!(
                gate.decide(path, Some(&session(&["User"]))),
                Decision::RedirectAccessDenied,
                "{path}"
            );
            assert_eq!(
                gate.decide(path, Some(&session(&["Admin"]))),
                Decision::Allow,
                "{path}"
            );
        }
    }

    #[test]
    fn test_malformed_paths_rejected() {
        let gate = gate();
        for path in ["/..", "/assets/../../setting/users", "/setting/users%zz"] {
            assert_eq!(
                gate.decide(path, Some(&session(&["Admin"]))),
                Decision::Reject,
                "{path}"
            );
            assert_eq!(gate.location(&Decision::Reject), None);
        }
    }

    #[test]
    fn test_login_page() {
        let gate = gate();
        assert_eq!(gate.decide("/login", None), Decision::Allow);
        assert_eq!(
            gate.decide("/login", Some(&session(&["User"]))),
            Decision::RedirectHome
        );
        assert_eq!(
            gate.decide("/login/", Some(&session(&[]))),
            Decision::RedirectHome
        );
        assert_eq!(gate.decide("/login?callbackUrl=%2F", None), Decision::Allow);
    }

    #[test]
    fn test_role_any_of() {
        let gate = gate();
        assert_eq!(
            gate.decide("/request", Some(&session(&["Ordertaker", "User"]))),
            Decision::Allow
        );
        assert_eq!(
            gate.decide("/approve", Some(&session(&["Manager"]))),
            Decision::Allow
        );
        assert_eq!(
            gate.decide("/approve", Some(&session(&["User", "Ordertaker"]))),
            Decision::RedirectAccessDenied
        );
        assert_eq!(
            gate.decide("/approve", Some(&session(&[]))),
            Decision::RedirectAccessDenied
        );
    }

    #[test]
    fn test_admin_casing_reaches_lowercase_route() {
        let gate = gate();
        for held in ["Admin", "admin", "ADMIN", "moderator"] {
            assert_eq!(
                gate.decide("/setting/users", Some(&session(&[held]))),
                Decision::Allow,
                "{held}"
            );
        }
    }

    #[test]
    fn test_unknown_session_roles_dropped() {
        let gate = gate();
        assert_eq!(
            gate.decide("/setting/users", Some(&session(&["root", "superuser"]))),
            Decision::RedirectAccessDenied
        );
    }

    #[test]
    fn test_subpath_not_protected_by_parent() {
        let gate = gate();
        assert_eq!(
            gate.decide("/setting/users/42", Some(&session(&["User"]))),
            Decision::Allow
        );
    }

    #[test]
    fn test_unknown_path_policy() {
        let gate = gate();
        assert_eq!(
            gate.decide("/unlisted", Some(&session(&["User"]))),
            Decision::Allow
        );

        let strict = gate_with(GateSettings {
            unknown_path_policy: UnknownPathPolicy::Deny,
            ..GateSettings::default()
        });
        assert_eq!(
            strict.decide("/unlisted", Some(&session(&["Admin"]))),
            Decision::RedirectAccessDenied
        );
        assert_eq!(strict.decide("/access-denied", None), Decision::Public);
    }

    #[test]
    fn test_locations() {
        let gate = gate();
        assert_eq!(gate.location(&Decision::Allow), None);
        assert_eq!(
            gate.location(&Decision::RedirectHome).as_deref(),
            Some("/")
        );
        assert_eq!(
            gate.location(&Decision::RedirectAccessDenied).as_deref(),
            Some("/access-denied")
        );
        assert_eq!(
            gate.location(&Decision::RedirectLogin {
                callback_url: "/setting/users".to_string()
            })
            .as_deref(),
            Some("/login?callbackUrl=%2Fsetting%2Fusers")
        );
    }

    #[test]
    fn test_post_login_target() {
        let gate = gate();
        assert_eq!(gate.post_login_target(Some("/approve")), "/approve");
        assert_eq!(
            gate.post_login_target(Some("/report?month=3")),
            "/report?month=3"
        );
        assert_eq!(gate.post_login_target(None), "/");
        assert_eq!(gate.post_login_target(Some("https://evil.example")), "/");
        assert_eq!(gate.post_login_target(Some("//evil.example")), "/");
        assert_eq!(gate.post_login_target(Some("/\\evil.example")), "/");
        assert_eq!(gate.post_login_target(Some("/login?callbackUrl=%2F")), "/");
        assert_eq!(gate.post_login_target(Some("/Login//")), "/");
        assert_eq!(gate.post_login_target(Some("/../approve")), "/");
    }

    #[test]
    fn test_navigation_filtered_by_role() {
        let gate = gate();

        let titles = |roles: &[&str]| -> Vec<String> {
            gate.navigation(&session(roles))
                .into_iter()
                .filter_map(|e| e.nav_title.clone())
                .collect()
        };

        assert_eq!(titles(&["User"]), vec!["Meal request"]);
        assert_eq!(
            titles(&["admin", "approver"]),
            vec!["Meal request", "Approvals", "Users"]
        );
        assert!(titles(&[]).is_empty());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let table = RouteTable::default();

        let login_public = GateSettings {
            public_paths: vec!["/login".to_string()],
            ..GateSettings::default()
        };
        assert!(matches!(
            RouteGate::new(login_public, table.clone(), RoleAliases::new()),
            Err(RouteTableError::Gate(_))
        ));

        let relative = GateSettings {
            home_path: "home".to_string(),
            ..GateSettings::default()
        };
        assert!(matches!(
            RouteGate::new(relative, table.clone(), RoleAliases::new()),
            Err(RouteTableError::InvalidPath(_))
        ));

        let protected_denied = RouteTable::from_specs(
            vec![route("/access-denied", &["Admin"], None)],
            &RoleAliases::new(),
        )
        .unwrap();
        assert!(matches!(
            RouteGate::new(GateSettings::default(), protected_denied, RoleAliases::new()),
            Err(RouteTableError::Gate(_))
        ));
    }
}

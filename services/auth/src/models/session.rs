//! Session claims and their public projection

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::user::SessionUser;
use crate::roles::{RoleAliases, RoleSet};

/// Claims signed into the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// User ID
    pub sub: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Role names as issued; normalise with [`Session::role_set`]
    pub roles: Vec<String>,
    /// Issued at (UTC Unix timestamp)
    pub iat: i64,
    /// Expiration (UTC Unix timestamp)
    pub exp: i64,
    /// Token identifier, logged for audit
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl Session {
    /// The identity this session was issued for
    pub fn user(&self) -> SessionUser {
        SessionUser {
            id: self.sub.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            title: self.title.clone(),
            roles: self.roles.clone(),
            api_token: self.api_token.clone(),
        }
    }

    /// Roles normalised into the canonical vocabulary
    pub fn role_set(&self, aliases: &RoleAliases) -> RoleSet {
        RoleSet::normalize(&self.roles, aliases)
    }

    /// A session is live strictly before its expiry
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Projection exposed to page components; never includes the backend token
    pub fn view(&self, aliases: &RoleAliases) -> SessionView {
        SessionView {
            id: self.sub.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            title: self.title.clone(),
            roles: self.role_set(aliases),
            expires_at: self.expires_at(),
        }
    }
}

/// Session data safe to hand to the browser
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub title: Option<String>,
    pub roles: RoleSet,
    pub expires_at: Option<DateTime<Utc>>,
}

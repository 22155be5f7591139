//! Credential verification against the REST backend
//!
//! The console never stores passwords. Login forms are forwarded to the
//! backend, which answers with the user profile and, optionally, a bearer
//! token for its own API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::AuthError;
use crate::models::{LoginCredentials, SessionUser};

/// Verifies login credentials and resolves the principal
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<SessionUser, AuthError>;
}

/// User identifiers arrive as numbers or strings depending on the backend table
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BackendId {
    Number(i64),
    Text(String),
}

impl From<BackendId> for String {
    fn from(id: BackendId) -> Self {
        match id {
            BackendId::Number(n) => n.to_string(),
            BackendId::Text(s) => s,
        }
    }
}

/// Backend login response
#[derive(Debug, Deserialize)]
struct BackendLoginResponse {
    id: BackendId,
    name: String,
    username: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    token: Option<String>,
}

impl From<BackendLoginResponse> for SessionUser {
    fn from(r: BackendLoginResponse) -> Self {
        SessionUser {
            id: r.id.into(),
            name: r.name,
            username: r.username,
            title: r.title,
            roles: r.roles,
            api_token: r.token,
        }
    }
}

#[derive(Serialize)]
struct BackendLoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Authenticator backed by the REST backend's login endpoint
#[derive(Debug, Clone)]
pub struct BackendAuthenticator {
    client: reqwest::Client,
    login_url: String,
}

impl BackendAuthenticator {
    /// Create an authenticator for the backend at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let login_url = format!("{}/auth/login", base_url.trim_end_matches('/'));
        info!("Backend authenticator using {}", login_url);

        Ok(Self { client, login_url })
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait]
impl Authenticator for BackendAuthenticator {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<SessionUser, AuthError> {
        let response = self
            .client
            .post(&self.login_url)
            .json(&BackendLoginRequest {
                username: credentials.username.trim(),
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(|e| {
                error!("Backend login request failed: {}", e);
                AuthError::from(e)
            })?;

        match response.status() {
            status if status.is_success() => {
                let body: BackendLoginResponse = response.json().await?;
                Ok(body.into())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("Backend rejected credentials for {}", credentials.username);
                Err(AuthError::InvalidCredentials)
            }
            status => {
                error!("Backend login answered {}", status);
                Err(AuthError::Backend(format!("unexpected status {status}")))
            }
        }
    }
}

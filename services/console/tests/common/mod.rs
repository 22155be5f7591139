#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use auth::{
    AuthError, Authenticator, LoginCredentials, Role, RoleAliases, SessionCodec, SessionConfig,
    SessionUser,
    rate_limiter::{RateLimiter, RateLimiterConfig},
};
use axum::body::Body;
use axum::http::{Request, Response, Uri, header};
use axum::Router;
use chrono::{DateTime, Utc};
use console::{AppState, GateSettings, RouteGate, RouteSpec, RouteTable, routes};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-long-enough";
pub const GOOD_PASSWORD: &str = "correct horse";

/// Authenticator answering from a fixed user list
///
/// The username `backend-down` simulates an unreachable backend.
#[derive(Default)]
pub struct StubAuthenticator {
    users: HashMap<String, SessionUser>,
    pub calls: AtomicUsize,
}

impl StubAuthenticator {
    pub fn with_users(users: Vec<SessionUser>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.username.clone(), u)).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Authenticator for StubAuthenticator {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<SessionUser, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if credentials.username == "backend-down" {
            return Err(AuthError::Backend("connection refused".to_string()));
        }

        match self.users.get(&credentials.username) {
            Some(user) if credentials.password == GOOD_PASSWORD => Ok(user.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

pub fn user(username: &str, roles: &[&str]) -> SessionUser {
    SessionUser {
        id: format!("id-{username}"),
        name: format!("{username} name"),
        username: username.to_string(),
        title: Some("Staff".to_string()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        api_token: Some(format!("backend-token-{username}")),
    }
}

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

pub fn test_codec() -> SessionCodec {
    SessionCodec::new(SessionConfig::new(TEST_SECRET)).expect("codec should build")
}

pub struct TestApp {
    pub router: Router,
    pub codec: SessionCodec,
    pub authenticator: Arc<StubAuthenticator>,
}

/// Build the full router with a stub page service behind the gate
pub fn build_test_app() -> TestApp {
    build_test_app_with(RateLimiterConfig::default())
}

pub fn build_test_app_with(limits: RateLimiterConfig) -> TestApp {
    let aliases = RoleAliases::new()
        .with("requester", Role::User)
        .with("approver", Role::Manager)
        .with("moderator", Role::Admin);

    let table = RouteTable::from_specs(
        vec![
            route("/", &["Admin", "User", "Ordertaker", "Manager"], Some("Dashboard")),
            route("/meal-request", &["Admin", "User"], Some("New request")),
            route("/approval", &["Admin", "Manager"], Some("Approvals")),
            route("/setting/users", &["admin", "moderator"], Some("Users")),
        ],
        &aliases,
    )
    .expect("route table should build");
    let gate = RouteGate::new(GateSettings::default(), table, aliases).expect("gate should build");

    let codec = test_codec();
    let authenticator = Arc::new(StubAuthenticator::with_users(vec![
        user("admin1", &["Admin"]),
        user("clerk", &["requester"]),
        user("boss", &["Manager", "Ordertaker"]),
    ]));

    let state = AppState {
        codec: codec.clone(),
        gate: Arc::new(gate),
        authenticator: authenticator.clone(),
        login_limiter: RateLimiter::new(limits),
    };

    let pages = Router::new().fallback(|uri: Uri| async move { format!("page {}", uri.path()) });

    TestApp {
        router: routes::build_router(state, pages),
        codec,
        authenticator,
    }
}

pub fn token_for(codec: &SessionCodec, roles: &[&str]) -> String {
    codec
        .encrypt(&user("tester", roles))
        .expect("encrypt should succeed")
}

pub fn token_issued_at(codec: &SessionCodec, roles: &[&str], issued: DateTime<Utc>) -> String {
    codec
        .encrypt_at(&user("tester", roles), issued)
        .expect("encrypt should succeed")
}

pub async fn get(app: &Router, path: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session={token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(
    app: &Router,
    path: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session={token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Extract the session token from a `Set-Cookie: session=...` header
pub fn session_from_set_cookie(response: &Response<Body>) -> Option<String> {
    set_cookies(response).into_iter().find_map(|c| {
        c.strip_prefix("session=")
            .and_then(|rest| rest.split(';').next())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// The `callbackUrl` query parameter of a login redirect
pub fn callback_of(location: &str) -> Option<String> {
    let url = reqwest::Url::parse(&format!("http://console.test{location}")).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "callbackUrl")
        .map(|(_, v)| v.into_owned())
}

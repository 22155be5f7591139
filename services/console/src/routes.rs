//! Console routes

use std::net::SocketAddr;
use std::path::Path;

use auth::{
    LoginCredentials, SessionView,
    session::{create_session, delete_session, get_session},
    validation::validate_credentials,
};
use axum::{
    Json, Router,
    extract::{ConnectInfo, State},
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    error::{ApiError, ApiResult},
    middleware::gate_middleware,
    route_table::RouteEntry,
    state::AppState,
};

/// Request for user login
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// Response for user login
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub redirect_to: String,
    pub user: SessionView,
}

/// Create the console router serving the single-page application from `static_dir`
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let index = static_dir.join("index.html");
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(index));

    build_router(state, Router::new().fallback_service(spa))
}

/// Mount the API next to `pages` and put the gate in front of both
pub fn build_router(state: AppState, pages: Router) -> Router {
    Router::new()
        .nest("/api", api_router())
        .with_state(state.clone())
        .merge(pages)
        .layer(middleware::from_fn_with_state(state, gate_middleware))
        .layer(TraceLayer::new_for_http())
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/session", get(current_session))
        .route("/navigation", get(navigation))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "console"
    }))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let credentials = LoginCredentials {
        username: payload.username.trim().to_string(),
        password: payload.password,
    };
    validate_credentials(&credentials)?;

    let client = peer
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let limiter_key = format!("{}:{}", client, credentials.username.to_lowercase());

    if !state.login_limiter.is_allowed(&limiter_key).await {
        warn!("Login rate limited for {}", limiter_key);
        return Err(ApiError::TooManyRequests);
    }

    info!("Login attempt for user: {}", credentials.username);
    let user = state.authenticator.authenticate(&credentials).await?;
    state.login_limiter.clear(&limiter_key).await;

    let jar = create_session(jar, &state.codec, &user).map_err(|e| {
        error!("Failed to create session: {}", e);
        ApiError::InternalServerError
    })?;

    // Read back what was signed so the response mirrors the cookie.
    let session = jar
        .get(auth::session::SESSION_COOKIE_NAME)
        .and_then(|cookie| state.codec.decrypt(cookie.value()))
        .ok_or(ApiError::InternalServerError)?;

    let response = LoginResponse {
        redirect_to: state.gate.post_login_target(payload.callback_url.as_deref()),
        user: session.view(state.gate.aliases()),
    };

    Ok((jar, Json(response)))
}

/// Logout endpoint: clears the cookie and sends the browser to the login page
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    match get_session(&jar, &state.codec) {
        Some(session) => info!(sub = %session.sub, jti = %session.jti, "Logout"),
        None => info!("Logout without a valid session"),
    }

    (
        delete_session(jar),
        Redirect::to(&state.gate.settings().login_path),
    )
}

/// Current session, for page components that display the signed-in user
pub async fn current_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<SessionView>> {
    let session = get_session(&jar, &state.codec).ok_or(ApiError::Unauthorized)?;
    Ok(Json(session.view(state.gate.aliases())))
}

/// Navigation entries the current session may open
pub async fn navigation(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<Vec<RouteEntry>>> {
    let session = get_session(&jar, &state.codec).ok_or(ApiError::Unauthorized)?;
    let entries = state
        .gate
        .navigation(&session)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(entries))
}

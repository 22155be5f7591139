//! Gate middleware for page requests

use auth::session::{get_session_at, refresh_session};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::{error::ApiError, gate::Decision, state::AppState};

/// Run the access gate in front of every request
///
/// Redirect decisions short-circuit with `307 Temporary Redirect` and paths
/// without a canonical form with `400 Bad Request`. Allowed requests reach the
/// inner service; if their session is close to expiry the cookie is re-issued
/// on the way out.
pub async fn gate_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request<Body>,
    next: Next,
) -> Response {
    let now = Utc::now();
    let path = req
        .uri()
        .path_and_query()
        .map_or(req.uri().path(), |pq| pq.as_str())
        .to_string();
    let session = get_session_at(&jar, &state.codec, now);
    let decision = state.gate.decide(&path, session.as_ref());

    if decision == Decision::Reject {
        warn!(path = %path, "Gate rejected malformed path");
        return ApiError::BadRequest("Malformed request path".to_string()).into_response();
    }

    if let Some(location) = state.gate.location(&decision) {
        info!(
            path = %path,
            decision = decision.as_str(),
            sub = session.as_ref().map(|s| s.sub.as_str()).unwrap_or("-"),
            "Gate redirect"
        );
        return Redirect::temporary(&location).into_response();
    }

    debug!(
        path = %path,
        decision = decision.as_str(),
        sub = session.as_ref().map(|s| s.sub.as_str()).unwrap_or("-"),
        "Gate allow"
    );

    let response = next.run(req).await;

    // Only gated page navigations renew the session; API calls such as
    // logout manage the cookie themselves.
    let Some(session) = session.filter(|_| decision == Decision::Allow) else {
        return response;
    };

    match refresh_session(jar, &state.codec, &session, now) {
        Ok(Some(jar)) => (jar, response).into_response(),
        Ok(None) => response,
        Err(e) => {
            error!(sub = %session.sub, "Failed to refresh session: {}", e);
            response
        }
    }
}

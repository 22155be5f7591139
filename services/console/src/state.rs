//! Application state shared across handlers

use std::sync::Arc;

use auth::{Authenticator, SessionCodec, rate_limiter::RateLimiter};

use crate::gate::RouteGate;

/// Application state shared across handlers
///
/// Everything here is read-only after startup except the login rate limiter,
/// which guards its own entries.
#[derive(Clone)]
pub struct AppState {
    pub codec: SessionCodec,
    pub gate: Arc<RouteGate>,
    pub authenticator: Arc<dyn Authenticator>,
    pub login_limiter: RateLimiter,
}

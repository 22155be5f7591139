use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use auth::{
    BackendAuthenticator, SessionCodec, SessionConfig,
    rate_limiter::RateLimiter,
};
use console::{AppState, RouteGate, RouteTable, config::ConsoleConfig, routes};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    common::telemetry::init("info,tower_http=info");

    info!("Starting meal console");

    let config = ConsoleConfig::from_env().context("Failed to load console configuration")?;

    // A missing secret is fatal here, never a per-request failure.
    let session_config = SessionConfig::from_env().context("Failed to load session configuration")?;
    let codec = SessionCodec::new(session_config)?;

    let table = RouteTable::from_specs(config.routes.clone(), &config.role_aliases)?;
    info!("Loaded {} protected routes", table.len());
    let gate = RouteGate::new(config.gate.clone(), table, config.role_aliases.clone())?;

    let authenticator = BackendAuthenticator::new(
        &config.backend_url,
        Duration::from_secs(config.backend_timeout_secs),
    )?;

    let login_limiter = RateLimiter::new(config.login_rate_limit.clone());
    spawn_limiter_pruning(login_limiter.clone());

    let app_state = AppState {
        codec,
        gate: Arc::new(gate),
        authenticator: Arc::new(authenticator),
        login_limiter,
    };

    // Start the web server
    let app = routes::create_router(app_state, &config.static_dir);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Meal console listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically forget login attempts whose window has lapsed
fn spawn_limiter_pruning(limiter: RateLimiter) {
    let period = Duration::from_secs(limiter.config().window_seconds.max(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            limiter.prune().await;
        }
    });
}

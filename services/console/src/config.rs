//! Console configuration
//!
//! Loaded once at startup from `console.toml` layered with `CONSOLE__*`
//! environment overrides. The session secret is deliberately not part of the
//! file; see [`auth::SessionConfig::from_env`].

use std::path::PathBuf;

use auth::RoleAliases;
use auth::rate_limiter::RateLimiterConfig;
use common::ConfigResult;
use serde::Deserialize;

use crate::gate::GateSettings;
use crate::route_table::RouteSpec;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "CONSOLE_CONFIG";

/// Configuration file used when `CONSOLE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/console.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CONSOLE";

/// Console server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Socket address to listen on
    pub bind_addr: String,
    /// Directory holding the built single-page application
    pub static_dir: PathBuf,
    /// Base URL of the REST backend
    pub backend_url: String,
    /// Timeout for backend calls, in seconds
    pub backend_timeout_secs: u64,
    pub gate: GateSettings,
    /// Legacy role names mapped onto canonical roles
    pub role_aliases: RoleAliases,
    pub routes: Vec<RouteSpec>,
    pub login_rate_limit: RateLimiterConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            static_dir: PathBuf::from("dist"),
            backend_url: "http://localhost:8080".to_string(),
            backend_timeout_secs: 10,
            gate: GateSettings::default(),
            role_aliases: RoleAliases::default(),
            routes: Vec::new(),
            login_rate_limit: RateLimiterConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load from the file named by `CONSOLE_CONFIG` (or the default path)
    pub fn from_env() -> ConfigResult<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        common::settings::load(path, ENV_PREFIX)
    }

    /// Parse a TOML document, without environment overrides
    pub fn from_toml(source: &str) -> ConfigResult<Self> {
        common::settings::from_toml_str(source)
    }
}

//! Layered configuration loading
//!
//! Settings are read from an optional TOML file and then overridden by
//! prefixed environment variables, e.g. `CONSOLE__BIND_ADDR` overrides the
//! `bind_addr` key of a file loaded with the `CONSOLE` prefix.

use std::path::Path;
use std::str::FromStr;

use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};

/// Separator between the prefix and nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";

/// Load a settings struct from `path` (if it exists) layered with environment
/// variables starting with `{prefix}__`.
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>, prefix: &str) -> ConfigResult<T> {
    let path = path.as_ref();
    if path.exists() {
        info!("Loading configuration from {}", path.display());
    } else {
        debug!(
            "Configuration file {} not found, using defaults and environment",
            path.display()
        );
    }

    let settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(prefix)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Load settings from an in-memory TOML document, without environment overrides
pub fn from_toml_str<T: DeserializeOwned>(source: &str) -> ConfigResult<T> {
    let settings = Config::builder()
        .add_source(File::from_str(source, FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Read a required, non-empty environment variable
pub fn require_env(name: &'static str) -> ConfigResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}

/// Read an optional environment variable, parsing it when present
///
/// Unlike a silent `unwrap_or`, a present-but-malformed value is an error.
pub fn env_or<T>(name: &'static str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

//! Custom error types for the common library
//!
//! Configuration problems are fatal at process start, so every loader in the
//! workspace reports them through [`ConfigError`].

use thiserror::Error;

/// Error raised while assembling process configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is absent or empty
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    /// An environment variable holds a value that cannot be parsed
    #[error("Invalid value for {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },

    /// The layered configuration sources could not be read or deserialised
    #[error("Configuration source error: {0}")]
    Source(#[from] config::ConfigError),

    /// The configuration parsed but violates a semantic rule
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for Result with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;

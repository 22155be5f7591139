//! Common library for the meal console
//!
//! This crate provides shared functionality used by the console services,
//! including layered configuration loading, configuration error handling,
//! and tracing initialisation.

pub mod error;
pub mod settings;
pub mod telemetry;

pub use error::{ConfigError, ConfigResult};

//! Error types for the authentication library

use thiserror::Error;

/// Errors raised while issuing sessions
#[derive(Error, Debug)]
pub enum SessionError {
    /// The signing secret is empty
    #[error("Session secret must not be empty")]
    EmptySecret,

    /// Token lifetimes are inconsistent
    #[error("Invalid session lifetime: {0}")]
    InvalidLifetime(String),

    /// Token encoding failed
    #[error("Failed to sign session: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Errors raised while verifying login credentials
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed login input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backend rejected the credentials
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Too many failed attempts
    #[error("Too many login attempts")]
    RateLimited,

    /// The backend could not be reached or answered unexpectedly
    #[error("Authentication backend error: {0}")]
    Backend(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Backend(e.to_string())
    }
}

/// Type alias for session results
pub type SessionResult<T> = Result<T, SessionError>;

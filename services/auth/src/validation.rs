//! Login input validation

use regex::Regex;
use std::sync::OnceLock;

use crate::error::AuthError;
use crate::models::LoginCredentials;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() > 64 {
        return Err("Username must be at most 64 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._@-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, dots, dashes, underscores and @"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate password
///
/// Only presence and length are checked at login; strength rules belong to
/// whoever sets the password.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a login form before it reaches the backend
pub fn validate_credentials(credentials: &LoginCredentials) -> Result<(), AuthError> {
    validate_username(credentials.username.trim()).map_err(AuthError::InvalidInput)?;
    validate_password(&credentials.password).map_err(AuthError::InvalidInput)?;
    Ok(())
}

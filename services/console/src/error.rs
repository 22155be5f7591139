//! Custom error types for the console API

use auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the console API
#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid session
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Wrong username or password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Login attempts exhausted
    #[error("Too many login attempts")]
    TooManyRequests,

    /// The REST backend failed
    #[error("Backend unavailable")]
    BadGateway,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidInput(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::RateLimited => ApiError::TooManyRequests,
            AuthError::Backend(_) => ApiError::BadGateway,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadGateway => StatusCode::BAD_GATEWAY,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

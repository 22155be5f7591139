//! Session and role handling for the meal console
//!
//! This crate issues and verifies the signed session cookie, normalises role
//! names into the canonical [`Role`] vocabulary, and verifies login
//! credentials against the REST backend.

pub mod authenticator;
pub mod error;
pub mod jwt;
pub mod models;
pub mod rate_limiter;
pub mod roles;
pub mod session;
pub mod validation;

pub use authenticator::{Authenticator, BackendAuthenticator};
pub use error::{AuthError, SessionError};
pub use jwt::{SessionCodec, SessionConfig};
pub use models::{LoginCredentials, Session, SessionUser, SessionView};
pub use roles::{Role, RoleAliases, RoleSet, UnknownRole};

//! Session models

pub mod session;
pub mod user;

// Re-export for convenience
pub use session::{Session, SessionView};
pub use user::{LoginCredentials, SessionUser};

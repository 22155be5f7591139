//! Session codec for signed, time-limited session tokens
//!
//! This module turns a [`SessionUser`] into a tamper-evident token suitable for
//! a cookie and reverses that transformation. Tokens are HS256-signed JWTs
//! carrying the identity, roles, issue time and expiry. Verification never
//! raises: a forged, malformed, foreign-algorithm or expired token simply
//! decodes to no session.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use common::settings::{env_or, require_env};
use common::{ConfigError, ConfigResult};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::models::{Session, SessionUser};

/// Default session lifetime: 7 days
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Longest accepted session lifetime: 10 years
pub const MAX_SESSION_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Session configuration
#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC secret used to sign and verify sessions
    pub secret: String,
    /// Session lifetime in seconds
    pub ttl_secs: i64,
    /// Re-issue the session once less than this many seconds remain
    pub refresh_threshold_secs: i64,
    /// Set the `Secure` attribute on the session cookie
    pub cookie_secure: bool,
}

impl SessionConfig {
    /// Configuration with default lifetimes for the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            refresh_threshold_secs: DEFAULT_SESSION_TTL_SECS / 2,
            cookie_secure: true,
        }
    }

    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_SECRET`: signing secret (required)
    /// - `SESSION_TTL_SECS`: session lifetime (default: 604800)
    /// - `SESSION_REFRESH_THRESHOLD_SECS`: refresh window (default: half the lifetime)
    /// - `SESSION_COOKIE_SECURE`: `Secure` cookie attribute (default: true)
    pub fn from_env() -> ConfigResult<Self> {
        let secret = require_env("SESSION_SECRET")?;
        let ttl_secs = env_or("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        let refresh_threshold_secs = env_or("SESSION_REFRESH_THRESHOLD_SECS", ttl_secs / 2)?;
        let cookie_secure = env_or("SESSION_COOKIE_SECURE", true)?;

        let config = Self {
            secret,
            ttl_secs,
            refresh_threshold_secs,
            cookie_secure,
        };
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(config)
    }

    fn validate(&self) -> SessionResult<()> {
        if self.secret.is_empty() {
            return Err(SessionError::EmptySecret);
        }
        if !(1..=MAX_SESSION_TTL_SECS).contains(&self.ttl_secs) {
            return Err(SessionError::InvalidLifetime(format!(
                "lifetime must lie within [1, {}] seconds, got {}",
                MAX_SESSION_TTL_SECS, self.ttl_secs
            )));
        }
        if !(0..self.ttl_secs).contains(&self.refresh_threshold_secs) {
            return Err(SessionError::InvalidLifetime(format!(
                "refresh threshold {} must lie within [0, {})",
                self.refresh_threshold_secs, self.ttl_secs
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .field("refresh_threshold_secs", &self.refresh_threshold_secs)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: SessionConfig,
}

impl SessionCodec {
    /// Initialize a new session codec
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is compared against the caller's clock in `decrypt_at`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(SessionCodec {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Sign a session for `user`, valid for the configured lifetime
    pub fn encrypt(&self, user: &SessionUser) -> SessionResult<String> {
        self.encrypt_at(user, Utc::now())
    }

    /// Sign a session for `user` as if issued at `now`
    pub fn encrypt_at(&self, user: &SessionUser, now: DateTime<Utc>) -> SessionResult<String> {
        let iat = now.timestamp();
        let claims = Session {
            sub: user.id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            title: user.title.clone(),
            roles: user.roles.clone(),
            iat,
            exp: iat + self.config.ttl_secs,
            jti: Uuid::new_v4().to_string(),
            api_token: user.api_token.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token against the current time
    pub fn decrypt(&self, token: &str) -> Option<Session> {
        self.decrypt_at(token, Utc::now())
    }

    /// Verify signature, algorithm and expiry of a token at `now`
    pub fn decrypt_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let session = match decode::<Session>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Rejected session token: {}", e);
                return None;
            }
        };

        if session.is_expired_at(now) {
            debug!(sub = %session.sub, jti = %session.jti, "Rejected expired session");
            return None;
        }

        Some(session)
    }

    /// Whether a live session should be re-issued with a fresh expiry
    pub fn needs_refresh(&self, session: &Session, now: DateTime<Utc>) -> bool {
        session.exp - now.timestamp() < self.config.refresh_threshold_secs
    }

    /// Re-sign the identity of `session` with a fresh lifetime starting at `now`
    pub fn refresh_at(&self, session: &Session, now: DateTime<Utc>) -> SessionResult<String> {
        self.encrypt_at(&session.user(), now)
    }

    /// Get the session lifetime
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.config.ttl_secs)
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.cookie_secure
    }
}

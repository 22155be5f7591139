//! Session management using an HTTP-only cookie
//!
//! The signed token is stored client-side only. Reading, writing and clearing
//! the `session` cookie is the only side effect of this module.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::SessionResult;
use crate::jwt::SessionCodec;
use crate::models::{Session, SessionUser};

/// Name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "session";

/// Path the session cookie is scoped to
pub const SESSION_COOKIE_PATH: &str = "/";

/// Build the session cookie for `token`, expiring with the session
pub fn session_cookie(token: String, codec: &SessionCodec) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path(SESSION_COOKIE_PATH)
        .http_only(true)
        .secure(codec.cookie_secure())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(codec.ttl().num_seconds()))
        .build()
}

/// Sign a session for `user` and store it in the cookie jar
pub fn create_session(
    jar: CookieJar,
    codec: &SessionCodec,
    user: &SessionUser,
) -> SessionResult<CookieJar> {
    info!("Creating session for user: {}", user.id);

    let token = codec.encrypt(user)?;
    Ok(jar.add(session_cookie(token, codec)))
}

/// Read and verify the session cookie
///
/// An absent cookie and an invalid or expired one both yield `None`.
pub fn get_session(jar: &CookieJar, codec: &SessionCodec) -> Option<Session> {
    get_session_at(jar, codec, Utc::now())
}

/// Read and verify the session cookie at `now`
pub fn get_session_at(jar: &CookieJar, codec: &SessionCodec, now: DateTime<Utc>) -> Option<Session> {
    let cookie = jar.get(SESSION_COOKIE_NAME)?;
    codec.decrypt_at(cookie.value(), now)
}

/// Re-issue the cookie with a fresh expiry if the session is close to expiring
///
/// Returns `None` when no refresh was needed.
pub fn refresh_session(
    jar: CookieJar,
    codec: &SessionCodec,
    session: &Session,
    now: DateTime<Utc>,
) -> SessionResult<Option<CookieJar>> {
    if !codec.needs_refresh(session, now) {
        return Ok(None);
    }

    debug!(sub = %session.sub, jti = %session.jti, "Refreshing session");
    let token = codec.refresh_at(session, now)?;
    Ok(Some(jar.add(session_cookie(token, codec))))
}

/// Clear the session cookie
pub fn delete_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE_NAME).path(SESSION_COOKIE_PATH))
}

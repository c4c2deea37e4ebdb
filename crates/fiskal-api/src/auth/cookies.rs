//! Session cookie management
//!
//! Sets and clears the `auth-token` cookie with the security attributes the
//! browser needs: httpOnly always, Secure outside development,
//! SameSite=Strict for the current token scheme (Lax on the legacy
//! compatibility path), max-age matching the token lifetime.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Cookie name carrying the session token.
pub const AUTH_COOKIE: &str = "auth-token";

/// Build the session cookie for a freshly issued token.
pub fn session_cookie(token: &str, ttl_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(Duration::seconds(ttl_secs as i64))
        .build()
}

/// Session cookie variant for clients still on the legacy token flow.
///
/// SameSite=Lax because the legacy frontend performs top-level navigations
/// that Strict would break. Goes away with the rest of the legacy path.
pub fn legacy_session_cookie(token: &str, ttl_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::seconds(ttl_secs as i64))
        .build()
}

/// Build an expired cookie that clears the session.
///
/// Idempotent: sending this when no cookie is present is harmless.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok", 3600, true);
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));
    }

    #[test]
    fn test_legacy_cookie_is_lax() {
        let cookie = legacy_session_cookie("tok", 3600, false);
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(false);
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}

//! Authentication gate and role guard
//!
//! The gate extracts a token from the `Authorization: Bearer` header or the
//! session cookie (header wins when both are present), verifies it, and
//! attaches the resolved [`Identity`] to the request extensions. Downstream
//! middleware and handlers only ever read that value.
//!
//! Route access is decided by a static classification table mapping path
//! prefixes to public / authenticated / admin-only; the gate skips public
//! paths entirely and unlisted paths default to authenticated.

use super::cookies::AUTH_COOKIE;
use super::token::TokenError;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use fiskal_core::{Identity, Role};
use std::sync::Arc;
use thiserror::Error;

/// Access requirement for a group of routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Authenticated,
    AdminOnly,
}

/// Static route classification, consulted by the gate and the role guard.
/// First matching prefix wins; unlisted paths require authentication.
const ROUTE_TABLE: &[(&str, RouteAccess)] = &[
    ("/health", RouteAccess::Public),
    ("/api/v1/auth/login", RouteAccess::Public),
    ("/api/v1/auth/logout", RouteAccess::Public),
    ("/api/v1/admin", RouteAccess::AdminOnly),
];

/// Look up the access requirement for a path.
pub fn classify_route(path: &str) -> RouteAccess {
    ROUTE_TABLE
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map(|(_, access)| *access)
        .unwrap_or(RouteAccess::Authenticated)
}

/// Marker extension recording that the request authenticated through the
/// legacy token format. Read by the profile handler to rotate the session
/// onto the current scheme; deleted together with the legacy decode path.
#[derive(Debug, Clone, Copy)]
pub struct LegacySession;

/// Gate and guard rejections
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token presented")]
    NoToken,

    #[error("Token rejected: {0}")]
    InvalidToken(#[from] TokenError),

    /// The role guard ran without a resolved identity. That is a routing
    /// bug, and it fails closed.
    #[error("No identity resolved before role check")]
    MissingIdentity,

    #[error("Insufficient role")]
    InsufficientRole,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Token failure detail stays server-side; clients see a generic body.
        let (status, error) = match self {
            AuthError::NoToken | AuthError::InvalidToken(_) | AuthError::MissingIdentity => {
                (StatusCode::UNAUTHORIZED, ApiError::unauthorized())
            }
            AuthError::InsufficientRole => (StatusCode::FORBIDDEN, ApiError::forbidden()),
        };

        (status, Json(error)).into_response()
    }
}

/// Pull the token out of the request: Authorization header first, session
/// cookie second.
fn extract_token(request: &Request<Body>) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(value) = auth_header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    CookieJar::from_headers(request.headers())
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Authentication gate middleware.
///
/// Attaches the resolved [`Identity`] to request extensions, or rejects
/// with a 401-class response. Also enforces the admin-only classification
/// from the route table; finer-grained role requirements layer
/// [`require_role`] on individual route groups.
pub async fn auth_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let access = classify_route(request.uri().path());
    if access == RouteAccess::Public {
        return Ok(next.run(request).await);
    }

    let ip_address = extract_ip_address(request.headers());
    let user_agent = extract_user_agent(request.headers());

    let token = extract_token(&request).ok_or(AuthError::NoToken)?;

    let verified = match state.tokens.verify_any(&token) {
        Ok(v) => v,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: e.to_string(),
                ip_address,
                user_agent,
            });
            return Err(AuthError::InvalidToken(e));
        }
    };

    let identity = verified.identity();

    if verified.is_legacy() {
        audit_log(&AuditEvent::LegacyTokenAccepted {
            user_id: identity.id.clone(),
            ip_address: ip_address.clone(),
        });
        request.extensions_mut().insert(LegacySession);
    }

    if access == RouteAccess::AdminOnly && !identity.is_admin() {
        audit_log(&AuditEvent::AccessDenied {
            user_id: Some(identity.id.clone()),
            path: request.uri().path().to_string(),
            required_roles: Role::Admin.to_string(),
            actual_role: Some(identity.role.to_string()),
            ip_address,
        });
        return Err(AuthError::InsufficientRole);
    }

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

type RoleGuardFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Role guard factory.
///
/// Layers after the gate; allows the request through when the resolved
/// identity's role is in `roles`. Admins always pass. Running without a
/// resolved identity rejects rather than defaulting open.
pub fn require_role(
    roles: &'static [Role],
) -> impl Fn(Request<Body>, Next) -> RoleGuardFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let ip_address = extract_ip_address(request.headers());

            let identity = request
                .extensions()
                .get::<Identity>()
                .ok_or(AuthError::MissingIdentity)?
                .clone();

            if identity.is_admin() || roles.contains(&identity.role) {
                return Ok(next.run(request).await);
            }

            audit_log(&AuditEvent::AccessDenied {
                user_id: Some(identity.id.clone()),
                path: request.uri().path().to_string(),
                required_roles: roles
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                actual_role: Some(identity.role.to_string()),
                ip_address,
            });

            Err(AuthError::InsufficientRole)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_classification() {
        assert_eq!(classify_route("/health"), RouteAccess::Public);
        assert_eq!(classify_route("/api/v1/auth/login"), RouteAccess::Public);
        assert_eq!(classify_route("/api/v1/auth/logout"), RouteAccess::Public);
        assert_eq!(
            classify_route("/api/v1/admin/users"),
            RouteAccess::AdminOnly
        );
        assert_eq!(
            classify_route("/api/v1/auth/me"),
            RouteAccess::Authenticated
        );
        // Unlisted paths fail closed to authenticated.
        assert_eq!(
            classify_route("/api/v1/anything-else"),
            RouteAccess::Authenticated
        );
    }

    #[test]
    fn test_header_takes_precedence_over_cookie() {
        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::AUTHORIZATION, "Bearer header-token")
            .header(header::COOKIE, format!("{AUTH_COOKIE}=cookie-token"))
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_token(&request), Some("header-token".to_string()));
    }

    #[test]
    fn test_cookie_used_when_no_header() {
        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::COOKIE, format!("{AUTH_COOKIE}=cookie-token"))
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_token(&request), Some("cookie-token".to_string()));
    }

    #[test]
    fn test_no_token_anywhere() {
        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_token(&request), None);
    }

    #[test]
    fn test_malformed_authorization_header_falls_back_to_cookie() {
        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .header(header::COOKIE, format!("{AUTH_COOKIE}=cookie-token"))
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_token(&request), Some("cookie-token".to_string()));
    }
}

//! Authentication API handlers
//!
//! Login and logout are the only places the session cookie is set or
//! cleared. `/auth/me` and password change are the sensitive endpoints
//! that re-read the user directory instead of trusting the token alone.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{
    clear_session_cookie, legacy_session_cookie, session_cookie, ChangePasswordRequest,
    LegacySession, LoginRequest, UserInfo,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use fiskal_core::Identity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Login response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Logout response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Password change response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordResponse {
    pub message: String,
}

/// Login with email and password
///
/// On success the session cookie is set and the token is also returned in
/// the body for header-based clients. Failures are generic: the response
/// never distinguishes an unknown account from a wrong password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 429, description = "Too many attempts", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let (identity, token) = state.auth.login(request, ip_address, user_agent).await?;

    let cookie = session_cookie(
        &token,
        state.tokens.ttl_secs(),
        state.config.auth.cookie_secure,
    );

    let user = state.auth.current_user(&identity.id).await?;
    let response = LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.ttl_secs(),
        user: UserInfo::from(&user),
    };

    Ok((jar.add(cookie), Json(response)))
}

/// Clear the session cookie
///
/// Idempotent: logging out without a session succeeds the same way.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session cleared", body = LogoutResponse),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    identity: Option<Extension<Identity>>,
    jar: CookieJar,
) -> impl IntoResponse {
    audit_log(&AuditEvent::Logout {
        user_id: identity.map(|Extension(i)| i.id),
        ip_address: extract_ip_address(&headers),
    });

    let cleared = clear_session_cookie(state.config.auth.cookie_secure);
    (
        jar.add(cleared),
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Fetch the authenticated profile
///
/// Re-reads the user directory (verify-and-refresh) so that accounts
/// deactivated after token issuance are rejected here even though the
/// token itself still verifies. Sessions still riding a legacy token are
/// rotated onto the current scheme.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated profile", body = UserInfo),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    legacy: Option<Extension<LegacySession>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.current_user(&identity.id).await?;
    let info = UserInfo::from(&user);

    let jar = if legacy.is_some() {
        let fresh = state.auth.reissue(&identity)?;
        // Lax, not Strict: the legacy frontend depends on top-level
        // navigation carrying the cookie.
        jar.add(legacy_session_cookie(
            &fresh,
            state.tokens.ttl_secs(),
            state.config.auth.cookie_secure,
        ))
    } else {
        jar
    };

    Ok((jar, Json(info)))
}

/// Change the authenticated user's password
#[utoipa::path(
    post,
    path = "/api/v1/auth/password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ChangePasswordResponse),
        (status = 400, description = "Policy violation or wrong current password", body = crate::error::ApiError),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);

    state
        .auth
        .change_password(&identity.id, request, ip_address)
        .await?;

    Ok(Json(ChangePasswordResponse {
        message: "Password changed".to_string(),
    }))
}

/// Look up any user by identifier (administrators only)
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    responses(
        (status = 200, description = "User record", body = UserInfo),
        (status = 403, description = "Not an administrator", body = crate::error::ApiError),
        (status = 404, description = "No such user", body = crate::error::ApiError),
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.directory.find_by_id(&id).await?;
    Ok(Json(UserInfo::from(&user)))
}

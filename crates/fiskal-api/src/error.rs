//! API error handling
//!
//! Maps the internal failure taxonomy onto the HTTP status contract:
//! 401 for token failures (generic body, detail in server logs only),
//! 403 for role/tenant violations (generic body), 429 with Retry-After
//! for throttled requests, 400 with actionable detail for credential
//! policy failures, 500 for unexpected internal faults.

use crate::auth::directory::DirectoryError;
use crate::auth::password::PolicyViolation;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Violated password rules, for policy failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<PolicyViolation>>,
    /// Seconds until the client may retry, for throttled requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            violations: None,
            retry_after_secs: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Authentication required")
    }

    pub fn forbidden() -> Self {
        Self::new("FORBIDDEN", "Forbidden")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Missing, invalid, or expired credentials. The client body is always
    /// generic; the reason lives in the audit log.
    Unauthorized,
    /// Role or tenant violation. Never names the required role set.
    Forbidden,
    /// New password failed the complexity policy.
    WeakPassword(Vec<PolicyViolation>),
    /// Presented password does not match the stored credential.
    PasswordMismatch,
    /// New password equals the current one.
    SamePasswordReused,
    /// Request volume exceeded the route's window.
    RateLimited { retry_after_secs: u64 },
    NotFound(String),
    /// External directory could not be reached.
    DirectoryUnavailable(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, ApiError::unauthorized()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, ApiError::forbidden()),
            AppError::WeakPassword(violations) => {
                let mut error =
                    ApiError::new("WEAK_PASSWORD", "Password does not meet the policy");
                error.violations = Some(violations);
                (StatusCode::BAD_REQUEST, error)
            }
            AppError::PasswordMismatch => (
                StatusCode::BAD_REQUEST,
                ApiError::new("PASSWORD_MISMATCH", "Current password is incorrect"),
            ),
            AppError::SamePasswordReused => (
                StatusCode::BAD_REQUEST,
                ApiError::new(
                    "SAME_PASSWORD_REUSED",
                    "New password must differ from the current one",
                ),
            ),
            AppError::RateLimited { retry_after_secs } => {
                let mut error = ApiError::new("RATE_LIMITED", "Too many requests");
                error.retry_after_secs = Some(retry_after_secs);
                let mut response =
                    (StatusCode::TOO_MANY_REQUESTS, Json(error)).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return response;
            }
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ApiError::new("NOT_FOUND", format!("{resource} not found")),
            ),
            AppError::DirectoryUnavailable(msg) => {
                tracing::error!(error = %msg, "user directory unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("INTERNAL_ERROR", "Internal server error"),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("INTERNAL_ERROR", "Internal server error"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound => AppError::NotFound("User".to_string()),
            DirectoryError::Unavailable(msg) => AppError::DirectoryUnavailable(msg),
        }
    }
}

//! Security audit logging for authentication events
//!
//! Structured audit events for logins, logouts, token rejections, access
//! control failures, and throttling. Events are logged at INFO level with
//! the "audit" target so security teams can route them separately from
//! application logs. Client-visible error bodies stay generic; the detailed
//! reasons live here.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful user login
    LoginSuccess {
        user_id: String,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt. The reason is never surfaced to the client;
    /// unknown-account and wrong-password failures look identical there.
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// User logout
    Logout {
        user_id: Option<String>,
        ip_address: Option<String>,
    },

    /// Password change
    PasswordChanged {
        user_id: String,
        email: String,
        ip_address: Option<String>,
    },

    /// Invalid, expired, or malformed token presented
    InvalidToken {
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Request authenticated via the legacy token format. Tracked so the
    /// compatibility path can be measured and eventually deleted.
    LegacyTokenAccepted {
        user_id: String,
        ip_address: Option<String>,
    },

    /// Access denied due to insufficient role
    AccessDenied {
        user_id: Option<String>,
        path: String,
        required_roles: String,
        actual_role: Option<String>,
        ip_address: Option<String>,
    },

    /// Request throttled by the rate limiter
    RateLimited {
        route_class: String,
        retry_after_secs: u64,
        ip_address: Option<String>,
    },
}

/// Log a security audit event with structured fields.
///
/// The event is also serialized to JSON for log aggregators.
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::Logout {
            user_id,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = ?user_id,
                ip_address = ?ip_address,
                "User logout"
            );
        }
        AuditEvent::PasswordChanged {
            user_id,
            email,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "Password changed"
            );
        }
        AuditEvent::InvalidToken {
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                reason = %reason,
                ip_address = ?ip_address,
                "Invalid token"
            );
        }
        AuditEvent::LegacyTokenAccepted {
            user_id,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                ip_address = ?ip_address,
                "Legacy token accepted"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            path,
            required_roles,
            actual_role,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = ?user_id,
                path = %path,
                required_roles = %required_roles,
                actual_role = ?actual_role,
                ip_address = ?ip_address,
                "Access denied"
            );
        }
        AuditEvent::RateLimited {
            route_class,
            retry_after_secs,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                route_class = %route_class,
                retry_after_secs = %retry_after_secs,
                ip_address = ?ip_address,
                "Request throttled"
            );
        }
    }
}

/// Extract the client IP address from request headers.
///
/// Checks X-Forwarded-For, then X-Real-IP. Used only as a rate-limit key
/// and audit metadata, never for identity.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // First IP in the chain is the client.
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Extract the user agent from request headers.
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: "u1".to_string(),
            email: "test@example.com".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("login_success"));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::LoginFailure {
            email: "test@example.com".to_string(),
            reason: "wrong password".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: None,
        });

        audit_log(&AuditEvent::RateLimited {
            route_class: "auth".to_string(),
            retry_after_secs: 30,
            ip_address: None,
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        let ip = extract_ip_address(&headers);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        let ip = extract_ip_address(&headers);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();

        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}

//! Fiskal Core - Domain models, tenant scoping, and shared types
//!
//! This crate defines the core abstractions used throughout the Fiskal system:
//! - Roles and resolved identities
//! - Multi-tenant data-visibility scoping
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{AppConfig, AuthConfig, ConfigError, Environment, ServerConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Fiskal operations
#[derive(Error, Debug)]
pub enum FiskalError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Directory error: {0}")]
    DirectoryError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FiskalError>;

// ============================================================================
// Roles and Identity
// ============================================================================

/// Flat role taxonomy
///
/// - `Admin`: full access, sees records of all tenants
/// - `User`: can create and manage their own records
/// - `Viewer`: read-only access to their own records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = FiskalError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "viewer" => Ok(Self::Viewer),
            other => Err(FiskalError::ValidationError(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

/// Resolved, request-scoped principal
///
/// Produced by token verification; lives for exactly one request and is
/// never persisted. Attached to the request by the auth gate and read-only
/// downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user identifier (subject of the token)
    pub id: String,
    /// Email address
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Role within the flat taxonomy
    pub role: Role,
    /// Whether the account is active
    pub active: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ============================================================================
// Tenant Scoping
// ============================================================================

/// Per-request data-visibility restriction derived from an [`Identity`].
///
/// Administrators see every record; everyone else only sees records whose
/// owner identifier equals their own. Derived fresh per request, never
/// cached across requests or users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    /// No restriction (administrators)
    Unrestricted,
    /// Restricted to records owned by this identifier
    OwnedBy(String),
}

impl TenantScope {
    /// Derive the scope for an identity.
    pub fn for_identity(identity: &Identity) -> Self {
        match identity.role {
            Role::Admin => Self::Unrestricted,
            Role::User | Role::Viewer => Self::OwnedBy(identity.id.clone()),
        }
    }

    /// Whether a record owned by `owner_id` is visible under this scope.
    pub fn permits(&self, owner_id: &str) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::OwnedBy(id) => id == owner_id,
        }
    }
}

/// A query restriction composed of a tenant boundary and an optional
/// business filter.
///
/// The tenant restriction is combined with the business filter using
/// logical AND, never OR, so a crafted filter can never widen visibility
/// past the tenant boundary.
pub struct RecordFilter<'a, T> {
    scope: &'a TenantScope,
    predicate: Option<Box<dyn Fn(&T) -> bool + Send + Sync + 'a>>,
}

impl<'a, T: 'a> RecordFilter<'a, T> {
    /// Start a filter from a tenant scope alone.
    pub fn scoped(scope: &'a TenantScope) -> Self {
        Self {
            scope,
            predicate: None,
        }
    }

    /// AND an additional business predicate onto the filter.
    pub fn and<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'a,
    {
        self.predicate = match self.predicate.take() {
            None => Some(Box::new(predicate)),
            Some(prev) => Some(Box::new(move |record| prev(record) && predicate(record))),
        };
        self
    }

    /// Evaluate the filter against a record and its owner identifier.
    pub fn matches(&self, record: &T, owner_id: &str) -> bool {
        self.scope.permits(owner_id)
            && self.predicate.as_ref().map_or(true, |p| p(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str, role: Role) -> Identity {
        Identity {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            display_name: id.to_string(),
            role,
            active: true,
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::User, Role::Viewer] {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, Role::Viewer);
    }

    #[test]
    fn test_admin_scope_is_unrestricted() {
        let scope = TenantScope::for_identity(&identity("a1", Role::Admin));
        assert_eq!(scope, TenantScope::Unrestricted);
        assert!(scope.permits("anyone"));
    }

    #[test]
    fn test_user_scope_restricted_to_owner() {
        let scope = TenantScope::for_identity(&identity("u1", Role::User));
        assert!(scope.permits("u1"));
        assert!(!scope.permits("u2"));
    }

    #[test]
    fn test_viewer_scope_restricted_to_owner() {
        let scope = TenantScope::for_identity(&identity("v1", Role::Viewer));
        assert!(scope.permits("v1"));
        assert!(!scope.permits("u1"));
    }

    #[test]
    fn test_record_filter_ands_business_predicate() {
        struct Rec {
            total: i64,
        }

        let scope = TenantScope::OwnedBy("u1".to_string());
        let filter = RecordFilter::scoped(&scope).and(|r: &Rec| r.total > 100);

        // Owned and matching the business filter
        assert!(filter.matches(&Rec { total: 200 }, "u1"));
        // Owned but failing the business filter
        assert!(!filter.matches(&Rec { total: 50 }, "u1"));
        // Matching the business filter cannot widen past the tenant boundary
        assert!(!filter.matches(&Rec { total: 200 }, "u2"));
    }

    #[test]
    fn test_record_filter_chains_multiple_predicates() {
        struct Rec {
            total: i64,
            paid: bool,
        }

        let scope = TenantScope::OwnedBy("u1".to_string());
        let filter = RecordFilter::scoped(&scope)
            .and(|r: &Rec| r.total > 100)
            .and(|r: &Rec| r.paid);

        assert!(filter.matches(&Rec { total: 200, paid: true }, "u1"));
        assert!(!filter.matches(&Rec { total: 200, paid: false }, "u1"));
        assert!(!filter.matches(&Rec { total: 50, paid: true }, "u1"));
    }

    #[test]
    fn test_record_filter_without_predicate() {
        let scope = TenantScope::Unrestricted;
        let filter = RecordFilter::<()>::scoped(&scope);
        assert!(filter.matches(&(), "u1"));
    }
}

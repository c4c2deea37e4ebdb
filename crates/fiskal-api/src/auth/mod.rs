//! Authentication and authorization module
//!
//! Components:
//! - Token issuance and verification (signed, time-bounded claims)
//! - Password hashing and complexity policy
//! - Authentication gate and role guard middleware
//! - Session cookie management
//! - The user-directory collaborator contract
//! - The authentication service tying them together

pub mod cookies;
pub mod directory;
pub mod middleware;
pub mod password;
pub mod service;
pub mod token;

pub use cookies::{clear_session_cookie, legacy_session_cookie, session_cookie, AUTH_COOKIE};
pub use directory::{DirectoryError, InMemoryDirectory, UserDirectory, UserRecord};
pub use middleware::{auth_gate, classify_route, require_role, AuthError, LegacySession, RouteAccess};
pub use password::{
    hash_password, hash_password_with_config, validate_complexity, verify_password,
    PasswordConfig, PolicyViolation,
};
pub use service::{AuthService, ChangePasswordRequest, LoginRequest, UserInfo};
pub use token::{
    encode_legacy_token, Claims, LegacyClaims, TokenError, TokenService, VerifiedToken,
};

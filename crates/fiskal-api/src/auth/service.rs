//! Authentication service layer
//!
//! Business logic for login, profile resolution, and password change,
//! working against the external user directory. Argon2 work runs on the
//! blocking pool so it never stalls unrelated concurrent requests.
//!
//! Login failures are deliberately indistinguishable to the client:
//! unknown accounts, deactivated accounts, and wrong passwords all produce
//! the same generic 401, with the real reason only in the audit log. A
//! dummy hash verification runs on the unknown-account path so response
//! timing does not reveal whether the account exists.

use super::directory::{DirectoryError, UserDirectory, UserRecord};
use super::password::{hash_password, validate_complexity, verify_password};
use super::token::TokenService;
use crate::audit::{audit_log, AuditEvent};
use crate::error::AppError;
use fiskal_core::Identity;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use utoipa::ToSchema;

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password change request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// User information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: fiskal_core::Role,
    pub active: bool,
}

impl From<&UserRecord> for UserInfo {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            active: user.active,
        }
    }
}

fn identity_of(user: &UserRecord) -> Identity {
    Identity {
        id: user.id.clone(),
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        role: user.role,
        active: user.active,
    }
}

/// Hash verified against on the unknown-account path, so that path costs
/// the same as a real verification. Computed once, lazily; callers must
/// be on the blocking pool since the first call runs a full-cost hash.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password("fiskal-dummy-credential").unwrap_or_else(|_| String::new())
    })
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(directory: Arc<dyn UserDirectory>, tokens: TokenService) -> Self {
        Self { directory, tokens }
    }

    /// Authenticate credentials and issue a session token.
    ///
    /// Returns the resolved identity and the encoded token; the handler
    /// turns the latter into the session cookie.
    pub async fn login(
        &self,
        request: LoginRequest,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(Identity, String), AppError> {
        let user = match self.directory.find_by_email(&request.email).await {
            Ok(user) => user,
            Err(DirectoryError::NotFound) => {
                // Burn the same hashing cost as a real verification. The
                // dummy hash is first materialized here, so the whole call
                // stays on the blocking pool.
                let _ = tokio::task::spawn_blocking(move || {
                    verify_password(&request.password, dummy_hash())
                })
                .await;
                audit_log(&AuditEvent::LoginFailure {
                    email: request.email,
                    reason: "unknown account".to_string(),
                    ip_address,
                    user_agent,
                });
                return Err(AppError::Unauthorized);
            }
            Err(DirectoryError::Unavailable(msg)) => {
                return Err(AppError::DirectoryUnavailable(msg));
            }
        };

        if !user.active {
            audit_log(&AuditEvent::LoginFailure {
                email: request.email,
                reason: "account deactivated".to_string(),
                ip_address,
                user_agent,
            });
            return Err(AppError::Unauthorized);
        }

        let password_valid =
            verify_blocking(request.password, user.password_hash.clone()).await?;

        if !password_valid {
            audit_log(&AuditEvent::LoginFailure {
                email: request.email,
                reason: "wrong password".to_string(),
                ip_address,
                user_agent,
            });
            return Err(AppError::Unauthorized);
        }

        let identity = identity_of(&user);
        let (_, encoded) = self
            .tokens
            .issue(&identity)
            .map_err(|e| AppError::Internal(format!("failed to issue token: {e}")))?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email,
            ip_address,
            user_agent,
        });

        Ok((identity, encoded))
    }

    /// Re-read the directory for the authenticated subject.
    ///
    /// The strict variant of verification: a token alone keeps working
    /// until it expires, so sensitive endpoints re-check the directory to
    /// catch accounts deactivated after issuance.
    pub async fn current_user(&self, user_id: &str) -> Result<UserRecord, AppError> {
        let user = match self.directory.find_by_id(user_id).await {
            Ok(user) => user,
            Err(DirectoryError::NotFound) => return Err(AppError::Unauthorized),
            Err(DirectoryError::Unavailable(msg)) => {
                return Err(AppError::DirectoryUnavailable(msg));
            }
        };

        if !user.active {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Issue a fresh current-format token for an already-verified identity.
    ///
    /// Used to rotate legacy sessions onto the current scheme.
    pub fn reissue(&self, identity: &Identity) -> Result<String, AppError> {
        let (_, encoded) = self
            .tokens
            .issue(identity)
            .map_err(|e| AppError::Internal(format!("failed to issue token: {e}")))?;
        Ok(encoded)
    }

    /// Change the subject's password.
    ///
    /// The current password must verify, the new one must pass the
    /// complexity policy, and reusing the current password is rejected.
    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
        ip_address: Option<String>,
    ) -> Result<(), AppError> {
        let user = self.current_user(user_id).await?;

        let current_valid =
            verify_blocking(request.current_password, user.password_hash.clone()).await?;
        if !current_valid {
            return Err(AppError::PasswordMismatch);
        }

        let violations = validate_complexity(&request.new_password);
        if !violations.is_empty() {
            return Err(AppError::WeakPassword(violations));
        }

        let reused =
            verify_blocking(request.new_password.clone(), user.password_hash.clone()).await?;
        if reused {
            return Err(AppError::SamePasswordReused);
        }

        let new_hash = tokio::task::spawn_blocking(move || hash_password(&request.new_password))
            .await
            .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))?;

        self.directory
            .update_password_hash(&user.id, &new_hash)
            .await
            .map_err(|e| match e {
                DirectoryError::NotFound => AppError::Unauthorized,
                DirectoryError::Unavailable(msg) => AppError::DirectoryUnavailable(msg),
            })?;

        audit_log(&AuditEvent::PasswordChanged {
            user_id: user.id,
            email: user.email,
            ip_address,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::directory::InMemoryDirectory;
    use crate::auth::password::{hash_password_with_config, PasswordConfig};
    use fiskal_core::{AuthConfig, Role};

    fn light_hash(password: &str) -> String {
        let config = PasswordConfig {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        };
        hash_password_with_config(password, &config).unwrap()
    }

    async fn service_with_user(password: &str, active: bool) -> AuthService {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .insert(UserRecord {
                id: "u1".to_string(),
                email: "u1@example.com".to_string(),
                display_name: "User One".to_string(),
                role: Role::User,
                active,
                password_hash: light_hash(password),
            })
            .await;
        AuthService::new(directory, TokenService::new(AuthConfig::default()))
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let service = service_with_user("Correct1!", true).await;

        let (identity, encoded) = service
            .login(login_request("u1@example.com", "Correct1!"), None, None)
            .await
            .expect("login failed");

        assert_eq!(identity.id, "u1");

        let tokens = TokenService::new(AuthConfig::default());
        let claims = tokens.verify(&encoded).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let service = service_with_user("Correct1!", true).await;

        let wrong = service
            .login(login_request("u1@example.com", "Wrong1!"), None, None)
            .await;
        let unknown = service
            .login(login_request("ghost@example.com", "Correct1!"), None, None)
            .await;

        assert!(matches!(wrong, Err(AppError::Unauthorized)));
        assert!(matches!(unknown, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_deactivated_account_rejected_generically() {
        let service = service_with_user("Correct1!", false).await;

        let result = service
            .login(login_request("u1@example.com", "Correct1!"), None, None)
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_current_user_catches_deactivation() {
        let service = service_with_user("Correct1!", false).await;
        let result = service.current_user("u1").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_change_password_happy_path() {
        let service = service_with_user("Correct1!", true).await;

        service
            .change_password(
                "u1",
                ChangePasswordRequest {
                    current_password: "Correct1!".to_string(),
                    new_password: "Fresh2@pass".to_string(),
                },
                None,
            )
            .await
            .expect("change failed");

        // Old password no longer works; new one does.
        assert!(matches!(
            service
                .login(login_request("u1@example.com", "Correct1!"), None, None)
                .await,
            Err(AppError::Unauthorized)
        ));
        assert!(service
            .login(login_request("u1@example.com", "Fresh2@pass"), None, None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let service = service_with_user("Correct1!", true).await;

        let result = service
            .change_password(
                "u1",
                ChangePasswordRequest {
                    current_password: "Wrong1!".to_string(),
                    new_password: "Fresh2@pass".to_string(),
                },
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::PasswordMismatch)));
    }

    #[tokio::test]
    async fn test_change_password_weak_new_password() {
        let service = service_with_user("Correct1!", true).await;

        let result = service
            .change_password(
                "u1",
                ChangePasswordRequest {
                    current_password: "Correct1!".to_string(),
                    new_password: "weak".to_string(),
                },
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_change_password_rejects_reuse() {
        let service = service_with_user("Correct1!", true).await;

        let result = service
            .change_password(
                "u1",
                ChangePasswordRequest {
                    current_password: "Correct1!".to_string(),
                    new_password: "Correct1!".to_string(),
                },
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::SamePasswordReused)));
    }
}

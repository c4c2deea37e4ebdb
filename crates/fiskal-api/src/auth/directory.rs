//! User directory collaborator contract
//!
//! The directory holding persistent user and credential records is an
//! external system; this module owns only the trait the auth core needs
//! from it, plus an in-memory implementation for tests and local
//! development.

use async_trait::async_trait;
use fiskal_core::Role;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// A user record as the directory returns it.
///
/// The password hash is opaque to the core; it only ever flows into
/// password verification.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    pub password_hash: String,
}

/// Directory lookup errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("User not found")]
    NotFound,

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// The three operations the auth core needs from the external directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<UserRecord, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<UserRecord, DirectoryError>;

    async fn update_password_hash(
        &self,
        id: &str,
        new_hash: &str,
    ) -> Result<(), DirectoryError>;
}

/// In-memory directory for tests and local development.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_id(&self, id: &str) -> Result<UserRecord, DirectoryError> {
        self.users
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<UserRecord, DirectoryError> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn update_password_hash(
        &self,
        id: &str,
        new_hash: &str,
    ) -> Result<(), DirectoryError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or(DirectoryError::NotFound)?;
        user.password_hash = new_hash.to_string();
        Ok(())
    }
}

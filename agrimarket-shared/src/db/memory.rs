/// In-memory identity store
///
/// Used for local development when no database is configured, and by tests.
/// Contents are lost on restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::auth::identity::{IdentityStore, StoreError};
use crate::models::user::{NewUser, User};

/// Identity store keeping users in a map keyed by username
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<String, User>>,
    next_id: AtomicI64,
}

impl MemoryIdentityStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn lookup_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(subject).cloned())
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        if let Some(user) = users.get(identifier) {
            return Ok(Some(user.clone()));
        }
        Ok(users.values().find(|u| u.email == identifier).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.contains_key(&new_user.username) {
            return Err(StoreError::UsernameTaken);
        }
        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::EmailTaken);
        }

        let user = User {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            name: new_user.name,
            email: new_user.email,
            username: new_user.username,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: Utc::now(),
        };
        users.insert(user.username.clone(), user.clone());

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

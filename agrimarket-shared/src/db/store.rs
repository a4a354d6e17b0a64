/// PostgreSQL-backed identity store

use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::identity::{IdentityStore, StoreError};
use crate::models::user::{NewUser, User};

/// Identity store reading the `users` table
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Creates a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique-constraint violations on `users` to store conflicts
fn map_create_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.constraint() {
            Some(c) if c.contains("username") => return StoreError::UsernameTaken,
            Some(c) if c.contains("email") => return StoreError::EmailTaken,
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn lookup_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_username(&self.pool, subject).await?)
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_login(&self.pool, identifier).await?)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        User::create(&self.pool, new_user).await.map_err(map_create_error)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(User::list(&self.pool).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(super::pool::health_check(&self.pool).await?)
    }
}

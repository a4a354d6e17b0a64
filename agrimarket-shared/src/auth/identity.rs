/// Identity resolution
///
/// Maps verified [`Claims`] to a [`User`] record through an [`IdentityStore`].
/// Resolution is a single read: no caching, no writes. The read is bounded by
/// a timeout and is safe to cancel at any await point.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use agrimarket_shared::auth::identity::IdentityResolver;
/// use agrimarket_shared::auth::token::Claims;
/// use agrimarket_shared::db::memory::MemoryIdentityStore;
///
/// # async fn example() -> Result<(), agrimarket_shared::auth::AuthError> {
/// let resolver = IdentityResolver::new(
///     Arc::new(MemoryIdentityStore::new()),
///     Duration::from_secs(2),
/// );
/// let user = resolver.resolve(&Claims::new("alice")).await?;
/// println!("resolved {}", user.username);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::error::AuthError;
use super::token::Claims;
use crate::models::user::{NewUser, User};

/// Default bound on a single identity store read
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Error type for identity store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Username already registered
    #[error("Username already taken")]
    UsernameTaken,

    /// Email already registered
    #[error("Email already in use")]
    EmailTaken,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// External store of user identities
///
/// Implementations must not hold locks across the returned futures' await
/// points beyond their own internal critical sections.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Looks up the user a token subject names
    async fn lookup_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError>;

    /// Looks up a user by username or email, for login
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    /// Persists a new user
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UsernameTaken` or `StoreError::EmailTaken` on
    /// duplicates.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Lists every user, ordered by id
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Checks store connectivity
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Resolves token claims to user records
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    lookup_timeout: Duration,
}

impl IdentityResolver {
    /// Creates a resolver over `store` with a per-lookup timeout
    pub fn new(store: Arc<dyn IdentityStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            lookup_timeout,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Resolves `claims.sub` to a user
    ///
    /// # Errors
    ///
    /// - `AuthError::UnknownSubject` if no record matches
    /// - `AuthError::StoreUnavailable` if the store fails or the lookup
    ///   exceeds the timeout
    pub async fn resolve(&self, claims: &Claims) -> Result<User, AuthError> {
        let lookup = self.store.lookup_by_subject(&claims.sub);

        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(Some(user))) => Ok(user),
            Ok(Ok(None)) => {
                tracing::debug!("Token subject has no identity record");
                Err(AuthError::UnknownSubject)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Identity lookup failed");
                Err(AuthError::StoreUnavailable)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Identity lookup timed out"
                );
                Err(AuthError::StoreUnavailable)
            }
        }
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}

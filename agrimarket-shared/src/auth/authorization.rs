/// Role guards
///
/// Guards are plain predicates over a resolved [`User`]. An endpoint states
/// the role it requires and the guard runs after identity resolution and
/// before any handler logic.
///
/// # Example
///
/// ```
/// use agrimarket_shared::auth::authorization::{require_any_role, require_role};
/// use agrimarket_shared::auth::AuthError;
/// use agrimarket_shared::models::user::{Role, User};
///
/// fn check(user: &User) -> Result<(), AuthError> {
///     require_any_role(user, &[Role::Seller, Role::Admin])?;
///     require_role(user, Role::Seller)
/// }
/// ```

use super::error::AuthError;
use crate::models::user::{Role, User};

/// Requires the user to hold exactly `role`
///
/// # Errors
///
/// Returns `AuthError::Forbidden` if the user's role differs.
pub fn require_role(user: &User, role: Role) -> Result<(), AuthError> {
    if !user.has_role(role) {
        tracing::debug!(
            user_id = user.id,
            required = %role,
            actual = %user.role,
            "Role guard rejected request"
        );
        return Err(AuthError::Forbidden);
    }

    Ok(())
}

/// Requires the user to hold any one of `roles`
///
/// An empty `roles` slice admits nobody.
pub fn require_any_role(user: &User, roles: &[Role]) -> Result<(), AuthError> {
    if !roles.contains(&user.role) {
        tracing::debug!(
            user_id = user.id,
            actual = %user.role,
            "Role guard rejected request"
        );
        return Err(AuthError::Forbidden);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with(role: Role) -> User {
        User {
            id: 1,
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            username: "test".to_string(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_role() {
        assert_eq!(
            require_role(&user_with(Role::User), Role::Admin),
            Err(AuthError::Forbidden)
        );
        assert!(require_role(&user_with(Role::Admin), Role::Admin).is_ok());
    }

    #[test]
    fn test_require_role_is_exact() {
        // Admins do not implicitly pass seller guards
        assert_eq!(
            require_role(&user_with(Role::Admin), Role::Seller),
            Err(AuthError::Forbidden)
        );
        assert!(require_role(&user_with(Role::Seller), Role::Seller).is_ok());
    }

    #[test]
    fn test_require_any_role() {
        let allowed = [Role::Seller, Role::Admin];

        assert!(require_any_role(&user_with(Role::Seller), &allowed).is_ok());
        assert!(require_any_role(&user_with(Role::Admin), &allowed).is_ok());
        assert_eq!(
            require_any_role(&user_with(Role::User), &allowed),
            Err(AuthError::Forbidden)
        );
        assert_eq!(
            require_any_role(&user_with(Role::Admin), &[]),
            Err(AuthError::Forbidden)
        );
    }
}

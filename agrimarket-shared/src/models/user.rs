/// User model and database operations
///
/// Users carry exactly one [`Role`]. The role is stored as text and parsed
/// into the closed enum when a row is read, so no call site ever compares
/// role strings.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     username VARCHAR(50) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role VARCHAR(20) NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use agrimarket_shared::models::user::{NewUser, Role, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create(
///     &pool,
///     NewUser {
///         name: "Alice".to_string(),
///         email: "alice@example.com".to_string(),
///         username: "alice".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         role: Role::Seller,
///     },
/// )
/// .await?;
///
/// let found = User::find_by_username(&pool, "alice").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Marketplace role attached to every user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standard buyer account
    #[default]
    User,

    /// Seller account; stored as `farmer` by older deployments
    #[serde(alias = "farmer")]
    Seller,

    /// Administrator
    Admin,
}

impl Role {
    /// Converts role to its stored name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored or submitted role name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "seller" | "farmer" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// User model representing a marketplace account
///
/// The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Display name
    pub name: String,

    /// Email address, unique across all users
    pub email: String,

    /// Username, unique across all users; the `sub` claim of issued tokens
    pub username: String,

    /// Stored credential digest (Argon2id PHC string or legacy hex SHA-256)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Account role
    pub role: Role,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name
    pub name: String,

    /// Email address
    pub email: String,

    /// Username
    pub username: String,

    /// Credential digest (NOT the plaintext password)
    pub password_hash: String,

    /// Account role
    pub role: Role,
}

/// Raw `users` row before role validation
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    username: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Username or email already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: NewUser) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, username, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, username, password_hash, role, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.username)
        .bind(data.password_hash)
        .bind(data.role.as_str())
        .fetch_one(pool)
        .await?;

        row.try_into()
    }

    /// Finds a user by username
    ///
    /// This is the lookup performed for the `sub` claim of every
    /// authenticated request.
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, username, password_hash, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Finds a user by username or email
    ///
    /// Login accepts either identifier.
    pub async fn find_by_login(pool: &PgPool, identifier: &str) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, username, password_hash, role, created_at
            FROM users
            WHERE username = $1 OR email = $1
            ORDER BY (username = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Lists all users, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, username, password_hash, role, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Checks whether the user holds `role`
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: Role) -> User {
        User {
            id: 1,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Seller.as_str(), "seller");
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Seller.to_string(), "seller");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("seller".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!("farmer".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Admin".parse::<Role>(), Err(UnknownRole("Admin".to_string())));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"seller\"");
        assert_eq!(serde_json::from_str::<Role>("\"farmer\"").unwrap(), Role::Seller);
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_row_with_unknown_role_is_rejected() {
        let row = UserRow {
            id: 7,
            name: "Mallory".to_string(),
            email: "m@example.com".to_string(),
            username: "mallory".to_string(),
            password_hash: "x".to_string(),
            role: "superuser".to_string(),
            created_at: Utc::now(),
        };

        assert!(User::try_from(row).is_err());
    }

    #[test]
    fn test_row_with_legacy_role_is_normalised() {
        let row = UserRow {
            id: 8,
            name: "Farmer Joe".to_string(),
            email: "joe@example.com".to_string(),
            username: "joe".to_string(),
            password_hash: "x".to_string(),
            role: "farmer".to_string(),
            created_at: Utc::now(),
        };

        assert_eq!(User::try_from(row).unwrap().role, Role::Seller);
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let json = serde_json::to_value(sample_user(Role::User)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_has_role() {
        let user = sample_user(Role::Seller);
        assert!(user.has_role(Role::Seller));
        assert!(!user.has_role(Role::Admin));
    }
}

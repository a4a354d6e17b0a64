/// User endpoints
///
/// # Endpoints
///
/// - `POST /users/register` - Register a new account
/// - `POST /users/login` - Exchange credentials for an access token
/// - `GET /users` - All users (admin)
/// - `GET /users/me` - Own profile (authenticated)
/// - `GET /users/:username` - Any profile (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use agrimarket_shared::{
    auth::{
        identity::StoreError,
        middleware::CurrentUser,
        password::{self, PasswordScheme},
        token::Claims,
    },
    models::user::{NewUser, Role, User},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Username; becomes the subject of issued tokens
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Requested role (defaults to `user`)
    #[serde(default)]
    pub status: Option<Role>,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Confirmation message
    pub msg: String,

    /// New user ID
    pub id: i64,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email address
    #[serde(alias = "username", alias = "email")]
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: i64,

    /// User role
    pub user_status: Role,

    /// Signed access token
    pub access_token: String,

    /// Always `bearer`
    pub token_type: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /users/register
/// Content-Type: application/json
///
/// {
///   "name": "Alice",
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "SecureP@ss123",
///   "status": "seller"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Requested the admin role
/// - `409 Conflict`: Username or email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let role = req.status.unwrap_or_default();
    if role == Role::Admin {
        return Err(ApiError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let scheme = state.config.auth.password_scheme;
    let plain = req.password;
    let password_hash = match scheme {
        PasswordScheme::Argon2id => {
            tokio::task::spawn_blocking(move || password::hash_password(&plain, scheme)).await??
        }
        PasswordScheme::Sha256 => password::hash_password(&plain, scheme)?,
    };

    let user = state
        .store
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            username: req.username,
            password_hash,
            role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok(Json(RegisterResponse {
        msg: "User registered successfully".to_string(),
        id: user.id,
    }))
}

/// Login endpoint
///
/// Accepts a username or email as the identifier.
///
/// # Endpoint
///
/// ```text
/// POST /users/login
/// Content-Type: application/json
///
/// {
///   "identifier": "alice",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user_id": 1,
///   "user_status": "seller",
///   "access_token": "eyJ...",
///   "token_type": "bearer"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown identifier or wrong password
/// - `503 Service Unavailable`: Identity store unreachable
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = bounded(&state, state.store.find_by_login(&req.identifier)).await?;

    // Unknown identifiers are verified against a dummy digest
    let stored = user.as_ref().map(|u| u.password_hash.as_str());
    let digest = password::login_digest(stored, state.config.auth.password_scheme).to_owned();
    let plain = req.password;
    let valid = match PasswordScheme::detect(&digest) {
        Some(PasswordScheme::Argon2id) => {
            tokio::task::spawn_blocking(move || password::verify_password(&plain, &digest)).await?
        }
        _ => password::verify_password(&plain, &digest),
    };

    let user = match user {
        Some(user) if valid => user,
        Some(user) => {
            tracing::debug!(user_id = user.id, "Login with wrong password");
            return Err(ApiError::invalid_credentials());
        }
        None => {
            tracing::debug!("Login for unknown identifier");
            return Err(ApiError::invalid_credentials());
        }
    };

    let access_token = state
        .codec
        .encode(&Claims::new(user.username.clone()), state.config.auth.access_token_ttl)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id,
        user_status: user.role,
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// Returns the authenticated user's profile
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// Lists every user (admin only)
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let users = bounded(&state, state.store.list_users()).await?;
    Ok(Json(users))
}

/// Returns any user's profile (admin only)
///
/// # Errors
///
/// - `404 Not Found`: No user with that username
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    let user = bounded(&state, state.store.lookup_by_subject(&username))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Runs a store call under the configured lookup timeout
async fn bounded<T, F>(state: &AppState, call: F) -> ApiResult<T>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(state.config.auth.lookup_timeout, call).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!("Identity store call timed out");
            Err(ApiError::ServiceUnavailable("Identity store unavailable".to_string()))
        }
    }
}

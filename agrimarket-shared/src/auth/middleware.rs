/// Authentication middleware for Axum
///
/// The guard chain for a protected route is two middleware functions:
///
/// 1. [`jwt_auth_middleware`]: reads `Authorization: Bearer <token>`, decodes
///    the token and resolves its subject, then inserts [`CurrentUser`] into
///    request extensions.
/// 2. [`require_role_middleware`]: checks the resolved user's role.
///
/// Either step short-circuits with an [`AuthError`] response before the
/// handler runs.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use agrimarket_shared::auth::middleware::{
///     jwt_auth_middleware, require_role_middleware, AuthState, CurrentUser,
/// };
/// use agrimarket_shared::models::user::Role;
///
/// async fn handler(CurrentUser(user): CurrentUser) -> String {
///     format!("Hello, {}!", user.username)
/// }
///
/// fn router(auth: AuthState) -> Router {
///     Router::new()
///         .route("/admin", get(handler))
///         .route_layer(middleware::from_fn_with_state(Role::Admin, require_role_middleware))
///         .route_layer(middleware::from_fn_with_state(auth, jwt_auth_middleware))
/// }
/// ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::authorization::require_role;
use super::error::AuthError;
use super::identity::IdentityResolver;
use super::token::TokenVerifier;
use crate::models::user::{Role, User};

/// Everything the authentication middleware needs
#[derive(Debug, Clone)]
pub struct AuthState {
    /// Token verifier holding the process secret
    pub verifier: TokenVerifier,

    /// Identity resolver over the configured store
    pub resolver: IdentityResolver,
}

impl AuthState {
    /// Creates authentication state
    pub fn new(verifier: TokenVerifier, resolver: IdentityResolver) -> Self {
        Self { verifier, resolver }
    }

    /// Runs decode and resolve for a raw bearer token
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.verifier.decode(token)?;
        self.resolver.resolve(&claims).await
    }
}

/// Authenticated user, added to request extensions by [`jwt_auth_middleware`]
///
/// Handlers extract it directly:
///
/// ```
/// use agrimarket_shared::auth::middleware::CurrentUser;
///
/// async fn handler(CurrentUser(user): CurrentUser) -> String {
///     user.username
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            tracing::error!("CurrentUser extracted on a route without authentication middleware");
            AuthError::Internal
        })
    }
}

impl AuthError {
    /// HTTP status for this error at the request boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Extracts the bearer token from request headers
///
/// # Errors
///
/// - `AuthError::MissingToken` if there is no `Authorization` header
/// - `AuthError::MalformedToken` if it is not a `Bearer` credential
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedToken)?;

    // Scheme names are case-insensitive
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            if token.is_empty() {
                Err(AuthError::MalformedToken)
            } else {
                Ok(token)
            }
        }
        _ => Err(AuthError::MalformedToken),
    }
}

/// Token authentication middleware
///
/// Decodes the bearer token, resolves its subject and adds [`CurrentUser`]
/// to the request.
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - Authorization header is missing or not a bearer token
/// - Token is malformed, badly signed or expired
/// - Token subject is unknown
///
/// Returns 503 Service Unavailable if the identity store cannot be reached.
pub async fn jwt_auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Owned so that no borrow of the request is held across the await
    let token = bearer_token(req.headers())?.to_owned();
    let user = auth.authenticate(&token).await.map_err(|e| {
        tracing::debug!(error = e.code(), "Request authentication failed");
        e
    })?;

    tracing::debug!(user_id = user.id, role = %user.role, "Request authenticated");
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Role guard middleware
///
/// Must run after [`jwt_auth_middleware`]; the role comes from the layer's
/// state.
///
/// # Errors
///
/// Returns 403 Forbidden if the user's role differs from the required one.
pub async fn require_role_middleware(
    State(role): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| {
            tracing::error!("Role guard mounted without authentication middleware");
            AuthError::Internal
        })?;

    require_role(&user.0, role)?;

    Ok(next.run(req).await)
}

/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use agrimarket_api::{app::AppState, config::Config};
/// use agrimarket_shared::db::memory::MemoryIdentityStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryIdentityStore::new()), config);
/// let app = agrimarket_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use agrimarket_shared::{
    auth::{
        identity::{IdentityResolver, IdentityStore},
        middleware::{jwt_auth_middleware, require_role_middleware, AuthState},
        token::TokenCodec,
    },
    models::user::Role,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Identity store backing registration, login and resolution
    pub store: Arc<dyn IdentityStore>,

    /// Token minting for login
    pub codec: TokenCodec,

    /// Token verification and identity resolution for protected routes
    pub auth: AuthState,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn IdentityStore>, config: Config) -> Self {
        let codec = TokenCodec::new(config.auth.secret.clone());
        let resolver = IdentityResolver::new(store.clone(), config.auth.lookup_timeout);
        let auth = AuthState::new(codec.verifier(), resolver);

        Self {
            store,
            codec,
            auth,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health              # Health check (public)
/// ├── POST /users/register      # Registration (public)
/// ├── POST /users/login         # Login (public)
/// ├── GET  /users               # All users (admin)
/// ├── GET  /users/me            # Own profile (any role)
/// ├── GET  /users/:username     # Any profile (admin)
/// └── GET  /sellers/me          # Seller profile (seller)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Response compression
/// 4. Logging (tower-http TraceLayer)
/// 5. Token authentication, then role guard (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Registration and login (public)
    let public_user_routes = Router::new()
        .route("/users/register", post(routes::users::register))
        .route("/users/login", post(routes::users::login));

    let admin_routes = Router::new()
        .route("/users", get(routes::users::list_users))
        .route("/users/:username", get(routes::users::get_user))
        .route_layer(from_fn_with_state(Role::Admin, require_role_middleware));

    let seller_routes = Router::new()
        .route("/sellers/me", get(routes::sellers::me))
        .route_layer(from_fn_with_state(Role::Seller, require_role_middleware));

    // Token authentication wraps every route above it, including role guards
    let protected_routes = Router::new()
        .route("/users/me", get(routes::users::me))
        .merge(admin_routes)
        .merge(seller_routes)
        .route_layer(from_fn_with_state(state.auth.clone(), jwt_auth_middleware));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .merge(public_user_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

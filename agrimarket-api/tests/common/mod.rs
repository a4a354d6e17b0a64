/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - App built over an in-memory identity store
/// - Direct user seeding (for roles that cannot self-register)
/// - Request helpers returning status and JSON body

use agrimarket_api::app::{build_router, AppState};
use agrimarket_api::config::Config;
use agrimarket_shared::auth::identity::IdentityStore;
use agrimarket_shared::auth::password::{hash_password, PasswordScheme};
use agrimarket_shared::db::memory::MemoryIdentityStore;
use agrimarket_shared::models::user::{NewUser, Role, User};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

/// Password used for every seeded user
pub const TEST_PASSWORD: &str = "Harvest#2024";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryIdentityStore>,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a new test context with the fast legacy password scheme
    pub fn new() -> Self {
        Self::with_vars(&[("PASSWORD_SCHEME", "sha256")])
    }

    /// Creates a test context from explicit configuration variables
    pub fn with_vars(vars: &[(&str, &str)]) -> Self {
        let mut env: HashMap<String, String> = HashMap::from([
            ("SECRET_KEY".to_string(), "k".to_string()),
        ]);
        env.extend(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();
        let store = Arc::new(MemoryIdentityStore::new());
        let app = build_router(AppState::new(store.clone(), config.clone()));

        Self { store, app, config }
    }

    /// Inserts a user straight into the store
    pub async fn seed_user(&self, username: &str, role: Role) -> User {
        self.store
            .create_user(NewUser {
                name: username.to_string(),
                email: format!("{}@example.com", username),
                username: username.to_string(),
                password_hash: hash_password(TEST_PASSWORD, PasswordScheme::Sha256).unwrap(),
                role,
            })
            .await
            .unwrap()
    }

    /// Logs in and returns the access token
    pub async fn login(&self, identifier: &str) -> String {
        let (status, body) = self
            .post_json(
                "/users/login",
                serde_json::json!({ "identifier": identifier, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Sends a JSON POST request
    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Sends a GET request with an optional bearer token
    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };

        (status, json)
    }
}

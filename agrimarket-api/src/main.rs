//! # AgriMarket API Server
//!
//! Registration, login and role-guarded profile endpoints for the AgriMarket
//! marketplace.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p agrimarket-api
//! ```
//!
//! Without `DATABASE_URL` (outside production) users are kept in memory and
//! lost on restart.

use agrimarket_api::{app, config::Config};
use agrimarket_shared::{
    auth::identity::IdentityStore,
    db::{
        memory::MemoryIdentityStore,
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
        store::PgIdentityStore,
    },
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agrimarket_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "AgriMarket API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let store: Arc<dyn IdentityStore> = match &config.database {
        Some(database) => {
            let pool = create_pool(DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await?;
            run_migrations(&pool).await?;
            Arc::new(PgIdentityStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory identity store");
            Arc::new(MemoryIdentityStore::new())
        }
    };

    let bind_address = config.bind_address();
    let router = app::build_router(app::AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}

/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `APP_ENV`: `development` or `production` (default: development)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string (required in production)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `SECRET_KEY`: Token signing secret (required in production)
/// - `ACCESS_TOKEN_EXPIRE_MINUTES`: Access token lifetime, at most one year (default: 30)
/// - `PASSWORD_SCHEME`: `argon2id` or `sha256` (default: argon2id)
/// - `IDENTITY_LOOKUP_TIMEOUT_MS`: Bound on identity lookups (default: 2000)
/// - `RUST_LOG`: Log filter (default: agrimarket_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use agrimarket_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use agrimarket_shared::auth::password::PasswordScheme;
use agrimarket_shared::auth::token::TokenSecret;
use std::env;
use std::time::Duration;

/// Signing secret used when `SECRET_KEY` is unset outside production
pub const DEVELOPMENT_SECRET_KEY: &str = "agrimarket-development-secret-do-not-deploy";

/// Minimum secret length accepted in production
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Longest accepted access token lifetime (one year)
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 365 * 24 * 60;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration; `None` selects the in-memory identity store
    pub database: Option<DatabaseConfig>,

    /// Authentication configuration
    pub auth: AuthConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,

    /// Whether running in production
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token signing secret
    pub secret: TokenSecret,

    /// Lifetime of access tokens issued at login
    pub access_token_ttl: chrono::Duration,

    /// Scheme for newly stored password digests
    pub password_scheme: PasswordScheme,

    /// Bound on a single identity store lookup
    pub lookup_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let app_env = get("APP_ENV", "development");
        let production = match app_env.as_str() {
            "production" => true,
            "development" | "test" => false,
            other => anyhow::bail!("APP_ENV must be 'development' or 'production', got '{}'", other),
        };

        let api_host = get("API_HOST", "0.0.0.0");
        let api_port = get("API_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let cors_origins = get("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_connections = get("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

        let database = match lookup("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections,
            }),
            None if production => {
                anyhow::bail!("DATABASE_URL environment variable is required in production")
            }
            None => None,
        };

        let secret = match lookup("SECRET_KEY") {
            Some(secret) => {
                if production && secret.len() < MIN_PRODUCTION_SECRET_LEN {
                    anyhow::bail!(
                        "SECRET_KEY must be at least {} characters long in production",
                        MIN_PRODUCTION_SECRET_LEN
                    );
                }
                if secret.is_empty() {
                    anyhow::bail!("SECRET_KEY must not be empty");
                }
                TokenSecret::from(secret)
            }
            None if production => {
                anyhow::bail!("SECRET_KEY environment variable is required in production")
            }
            None => {
                tracing::warn!("SECRET_KEY not set, using the development default");
                TokenSecret::from(DEVELOPMENT_SECRET_KEY)
            }
        };

        let expire_minutes = get("ACCESS_TOKEN_EXPIRE_MINUTES", "30")
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("ACCESS_TOKEN_EXPIRE_MINUTES is invalid: {}", e))?;
        if expire_minutes <= 0 {
            anyhow::bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be positive");
        }
        if expire_minutes > MAX_ACCESS_TOKEN_EXPIRE_MINUTES {
            anyhow::bail!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be at most {}",
                MAX_ACCESS_TOKEN_EXPIRE_MINUTES
            );
        }
        let access_token_ttl = chrono::Duration::try_minutes(expire_minutes)
            .ok_or_else(|| anyhow::anyhow!("ACCESS_TOKEN_EXPIRE_MINUTES is out of range"))?;

        let password_scheme = get("PASSWORD_SCHEME", "argon2id")
            .parse::<PasswordScheme>()
            .map_err(|e| anyhow::anyhow!("PASSWORD_SCHEME is invalid: {}", e))?;

        let lookup_timeout_ms = get("IDENTITY_LOOKUP_TIMEOUT_MS", "2000")
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("IDENTITY_LOOKUP_TIMEOUT_MS is invalid: {}", e))?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database,
            auth: AuthConfig {
                secret,
                access_token_ttl,
                password_scheme,
                lookup_timeout: Duration::from_millis(lookup_timeout_ms),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

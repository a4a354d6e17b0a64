//! # AgriMarket Shared Library
//!
//! Authentication core and identity persistence shared by the AgriMarket
//! API server.
//!
//! ## Module Organization
//!
//! - `auth`: passwords, signed tokens, identity resolution, role guards, middleware
//! - `models`: user accounts and roles
//! - `db`: connection pool, migrations and identity store implementations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the AgriMarket shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

/// Middleware modules for the API server
///
/// Authentication and role guards live in `agrimarket_shared::auth::middleware`.
///
/// - `security`: security response headers

pub mod security;

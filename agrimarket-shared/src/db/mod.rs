/// Persistence for identities
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool
/// - `migrations`: embedded schema migrations
/// - `store`: [`store::PgIdentityStore`], the production identity store
/// - `memory`: [`memory::MemoryIdentityStore`], for development and tests

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod store;

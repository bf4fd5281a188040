/// Persistence for owners and their targets
///
/// The engine only sees the [`TargetStore`] and [`OwnerStore`] traits;
/// [`DatabaseImpl`] backs them with a pooled libsql database.
pub mod migrations;
pub mod models;
pub mod repository;

pub use models::Owner;
pub use repository::{DatabaseImpl, OwnerStore, TargetStore};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}

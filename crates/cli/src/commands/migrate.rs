//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! skn-cli migrate
//! ```
//!
//! Migrations live in `crates/api/migrations/` and are embedded in the
//! binary, so the command works from any directory.

use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    let migrator = &skinior_api::db::MIGRATOR;
    tracing::info!(available = migrator.iter().count(), "Running migrations...");
    migrator.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

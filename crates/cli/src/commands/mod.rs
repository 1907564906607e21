//! Subcommand implementations.
//!
//! Every command reads `SKINIOR_DATABASE_URL` (or `DATABASE_URL`) after
//! loading `.env`.

pub mod admin;
pub mod agent;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Environment variables checked for the connection string, in order.
const DATABASE_URL_VARS: [&str; 2] = ["SKINIOR_DATABASE_URL", "DATABASE_URL"];

/// Errors that can occur while connecting to the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Neither database URL variable is set.
    #[error("Missing environment variable: SKINIOR_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

fn database_url() -> Option<SecretString> {
    DATABASE_URL_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .filter(|url| !url.trim().is_empty())
        .map(SecretString::from)
}

/// Load `.env` and open a connection pool.
///
/// # Errors
///
/// Returns `ConnectError::MissingDatabaseUrl` if no URL is configured.
/// Returns `ConnectError::Database` if the connection fails.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();
    let url = database_url().ok_or(ConnectError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    Ok(skinior_api::db::create_pool(&url).await?)
}

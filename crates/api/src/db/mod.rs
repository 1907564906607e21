//! Database operations for the Skinior `PostgreSQL` database.
//!
//! ## Tables (schema `skinior`)
//!
//! - `user` - Customers, staff and agent system accounts
//! - `category`, `brand`, `product`, `product_image`, `product_review` - Catalog
//! - `cart`, `cart_item` - Session and user carts
//! - `discount_code`, `customer_order`, `order_item` - Checkout
//! - `import_log` - Spreadsheet import history
//! - `analysis_session`, `analysis_data`, `product_recommendation` - Skin analysis records
//! - `treatment`, `treatment_milestone` - Treatment plans
//! - `livekit_room`, `room_video` - Video consultations
//! - `blog_post`, `newsletter_subscriber`, `waitlist_entry` - Content
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p skinior-cli -- migrate
//! ```

pub mod analysis;
pub mod analytics;
pub mod carts;
pub mod catalog;
pub mod consultations;
pub mod content;
pub mod imports;
pub mod orders;
pub mod recommendations;
pub mod rooms;
pub mod treatments;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use analysis::AnalysisRepository;
pub use analytics::AnalyticsRepository;
pub use carts::CartRepository;
pub use catalog::{BrandRepository, CategoryRepository, ProductRepository};
pub use consultations::ConsultationRepository;
pub use content::{BlogRepository, NewsletterRepository};
pub use imports::ImportLogRepository;
pub use orders::OrderRepository;
pub use recommendations::RecommendationRepository;
pub use rooms::RoomRepository;
pub use treatments::TreatmentRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// `ILIKE` pattern matching `term` anywhere, with `%`, `_` and `\\` escaped.
///
/// Returns `None` for blank input so optional search filters can be bound directly.
pub(crate) fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term?.trim();
    if term.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

/// Embedded schema migrations, applied by `skn-cli migrate`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern(Some("serum")).as_deref(), Some("%serum%"));
        assert_eq!(like_pattern(Some(" 50%_off ")).as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }
}

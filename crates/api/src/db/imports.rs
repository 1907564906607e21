//! Import run history.

use sqlx::PgPool;

use skinior_core::{ImportLogId, UserId};

use super::RepositoryError;
use crate::models::import::{ImportLog, RowIssue};

const LOG_COLUMNS: &str = "id, file_name, imported_by, status, total_rows, success_count, \
     failure_count, skipped_count, errors, created_at, completed_at";

/// Repository for `import_log` rows.
pub struct ImportLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ImportLogRepository<'a> {
    /// Create a new import log repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record the start of an import.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn start(
        &self,
        file_name: &str,
        imported_by: UserId,
        total_rows: i32,
    ) -> Result<ImportLogId, RepositoryError> {
        Ok(sqlx::query_scalar(
            "INSERT INTO skinior.import_log (file_name, imported_by, total_rows)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(file_name)
        .bind(imported_by)
        .bind(total_rows)
        .fetch_one(self.pool)
        .await?)
    }

    /// Record the outcome of an import.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the errors cannot be serialized.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn finish(
        &self,
        id: ImportLogId,
        status: &str,
        success_count: i32,
        failure_count: i32,
        skipped_count: i32,
        errors: &[RowIssue],
    ) -> Result<(), RepositoryError> {
        let errors = serde_json::to_value(errors)
            .map_err(|e| RepositoryError::DataCorruption(format!("import errors: {e}")))?;

        sqlx::query(
            "UPDATE skinior.import_log SET
                status = $2, success_count = $3, failure_count = $4, skipped_count = $5,
                errors = $6, completed_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(success_count)
        .bind(failure_count)
        .bind(skipped_count)
        .bind(errors)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Most recent imports first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ImportLog>, RepositoryError> {
        Ok(sqlx::query_as::<_, ImportLog>(&format!(
            "SELECT {LOG_COLUMNS} FROM skinior.import_log ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }
}

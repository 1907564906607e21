//! Read-only queries behind the consultation history.

use sqlx::PgPool;

use skinior_core::{AnalysisSessionId, UserId};

use super::RepositoryError;
use super::analysis::{DATA_COLUMNS, SESSION_COLUMNS};
use super::recommendations::RECOMMENDATION_COLUMNS;
use crate::models::analysis::{AnalysisData, AnalysisSession, Recommendation};
use crate::models::consultation::ConsultationFilter;

pub struct ConsultationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ConsultationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of a user's sessions, newest first, below `filter.cursor`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sessions(
        &self,
        user_id: UserId,
        filter: &ConsultationFilter,
    ) -> Result<Vec<AnalysisSession>, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM skinior.analysis_session
             WHERE user_id = $1
               AND ($2::skinior.analysis_status IS NULL OR status = $2)
               AND ($3::timestamptz IS NULL OR created_at >= $3)
               AND ($4::timestamptz IS NULL OR created_at <= $4)
               AND ($5::int IS NULL OR id < $5)
             ORDER BY id DESC
             LIMIT $6"
        ))
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.cursor)
        .bind(filter.limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Sessions matching the filter, ignoring the cursor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId, filter: &ConsultationFilter) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM skinior.analysis_session
             WHERE user_id = $1
               AND ($2::skinior.analysis_status IS NULL OR status = $2)
               AND ($3::timestamptz IS NULL OR created_at >= $3)
               AND ($4::timestamptz IS NULL OR created_at <= $4)",
        )
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn session(
        &self,
        id: AnalysisSessionId,
        user_id: UserId,
    ) -> Result<Option<AnalysisSession>, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM skinior.analysis_session WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// The most recent data point of each session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_data(
        &self,
        session_ids: &[AnalysisSessionId],
    ) -> Result<Vec<AnalysisData>, RepositoryError> {
        let ids: Vec<i32> = session_ids.iter().map(AnalysisSessionId::as_i32).collect();
        Ok(sqlx::query_as::<_, AnalysisData>(&format!(
            "SELECT DISTINCT ON (analysis_id) {DATA_COLUMNS} FROM skinior.analysis_data
             WHERE analysis_id = ANY($1)
             ORDER BY analysis_id, recorded_at DESC, id DESC"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?)
    }

    /// Recommendations of each session, highest priority first, at most
    /// `per_session` each when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recommendations(
        &self,
        session_ids: &[AnalysisSessionId],
        per_session: Option<i64>,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        let ids: Vec<i32> = session_ids.iter().map(AnalysisSessionId::as_i32).collect();
        Ok(sqlx::query_as::<_, Recommendation>(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM (
                 SELECT *, ROW_NUMBER() OVER (
                     PARTITION BY analysis_id ORDER BY priority DESC, created_at DESC, id DESC
                 ) AS rank
                 FROM skinior.product_recommendation
                 WHERE analysis_id = ANY($1)
             ) ranked
             WHERE $2::bigint IS NULL OR rank <= $2
             ORDER BY analysis_id, rank"
        ))
        .bind(ids)
        .bind(per_session)
        .fetch_all(self.pool)
        .await?)
    }
}

//! Skin-analysis sessions and data points.

use sqlx::PgPool;
use tracing::instrument;

use skinior_core::{AnalysisDataId, AnalysisSessionId, UserId};

use super::RepositoryError;
use super::recommendations::RecommendationRepository;
use crate::models::analysis::{
    AnalysisData, AnalysisSession, AnalysisSessionDetail, AnalysisTypeCount,
    CreateAnalysisDataRequest, CreateSessionRequest, SessionStats, UpdateSessionRequest,
};

pub(crate) const SESSION_COLUMNS: &str =
    "id, user_id, session_id, language, status, metadata, created_at, updated_at, completed_at";

pub(crate) const DATA_COLUMNS: &str = "id, user_id, analysis_id, analysis_type, data, recorded_at";

/// Analysis type whose data drives the progress summary.
pub const SKIN_ANALYSIS_TYPE: &str = "skin_analysis";

/// Repository for analysis sessions and data.
pub struct AnalysisRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalysisRepository<'a> {
    /// Create a new analysis repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Create a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the session id already exists.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<AnalysisSession, RepositoryError> {
        sqlx::query_as::<_, AnalysisSession>(&format!(
            "INSERT INTO skinior.analysis_session (user_id, session_id, language, metadata)
             VALUES ($1, $2, COALESCE($3, 'english'), COALESCE($4, '{{}}'::jsonb))
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(request.user_id)
        .bind(&request.session_id)
        .bind(request.language.as_deref())
        .bind(request.metadata.as_ref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::conflict_on_unique(e, "analysis session already exists")
        })
    }

    /// Get a session by its external session id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<AnalysisSession>, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM skinior.analysis_session WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Get a session by its database ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_session_by_id(
        &self,
        id: AnalysisSessionId,
    ) -> Result<Option<AnalysisSession>, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM skinior.analysis_session WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// A session with its 5 latest data points and 10 latest recommendations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn session_detail(
        &self,
        session_id: &str,
    ) -> Result<Option<AnalysisSessionDetail>, RepositoryError> {
        let Some(session) = self.get_session(session_id).await? else {
            return Ok(None);
        };

        let analysis_data = sqlx::query_as::<_, AnalysisData>(&format!(
            "SELECT {DATA_COLUMNS} FROM skinior.analysis_data
             WHERE analysis_id = $1 ORDER BY recorded_at DESC, id DESC LIMIT 5"
        ))
        .bind(session.id)
        .fetch_all(self.pool)
        .await?;

        let recommendations = RecommendationRepository::new(self.pool)
            .latest_for_analysis(session.id, 10)
            .await?;

        Ok(Some(AnalysisSessionDetail {
            session,
            analysis_data,
            recommendations,
        }))
    }

    /// A user's sessions, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_sessions(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AnalysisSession>, i64), RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM skinior.analysis_session WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

        let sessions = sqlx::query_as::<_, AnalysisSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM skinior.analysis_session
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok((sessions, total))
    }

    /// Update status, metadata or completion time. Completing without an
    /// explicit `completed_at` stamps the current time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session does not exist.
    pub async fn update_session(
        &self,
        session_id: &str,
        update: &UpdateSessionRequest,
    ) -> Result<AnalysisSession, RepositoryError> {
        sqlx::query_as::<_, AnalysisSession>(&format!(
            "UPDATE skinior.analysis_session SET
                status = COALESCE($2, status),
                metadata = COALESCE($3, metadata),
                completed_at = COALESCE(
                    $4,
                    CASE WHEN $2 = 'completed'::skinior.analysis_status AND completed_at IS NULL
                         THEN NOW() ELSE completed_at END
                ),
                updated_at = NOW()
             WHERE session_id = $1
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session_id)
        .bind(update.status)
        .bind(update.metadata.as_ref())
        .bind(update.completed_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a session with its data and recommendations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session does not exist.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.analysis_session WHERE session_id = $1")
            .bind(session_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Session counts for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn session_stats(&self, user_id: UserId) -> Result<SessionStats, RepositoryError> {
        Ok(sqlx::query_as::<_, SessionStats>(
            "SELECT COUNT(*) AS total_sessions,
                    COUNT(*) FILTER (WHERE status = 'completed') AS completed_sessions,
                    COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress_sessions,
                    COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_sessions,
                    MIN(created_at) AS first_session,
                    MAX(created_at) AS last_session
             FROM skinior.analysis_session WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?)
    }

    // =========================================================================
    // Data points
    // =========================================================================

    /// Record a data point. Ownership is checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_data(
        &self,
        request: &CreateAnalysisDataRequest,
    ) -> Result<AnalysisData, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisData>(&format!(
            "INSERT INTO skinior.analysis_data (user_id, analysis_id, analysis_type, data)
             VALUES ($1, $2, $3, $4)
             RETURNING {DATA_COLUMNS}"
        ))
        .bind(request.user_id)
        .bind(request.analysis_id)
        .bind(request.analysis_type.trim())
        .bind(&request.data)
        .fetch_one(self.pool)
        .await?)
    }

    /// Get a data point.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_data(&self, id: AnalysisDataId) -> Result<Option<AnalysisData>, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisData>(&format!(
            "SELECT {DATA_COLUMNS} FROM skinior.analysis_data WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// A user's data points, newest first, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn user_history(
        &self,
        user_id: UserId,
        analysis_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AnalysisData>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM skinior.analysis_data
             WHERE user_id = $1 AND ($2::text IS NULL OR analysis_type = $2)",
        )
        .bind(user_id)
        .bind(analysis_type)
        .fetch_one(self.pool)
        .await?;

        let data = sqlx::query_as::<_, AnalysisData>(&format!(
            "SELECT {DATA_COLUMNS} FROM skinior.analysis_data
             WHERE user_id = $1 AND ($2::text IS NULL OR analysis_type = $2)
             ORDER BY recorded_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(analysis_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok((data, total))
    }

    /// Data points of a session, newest first, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn session_data(
        &self,
        analysis_id: AnalysisSessionId,
        analysis_type: Option<&str>,
    ) -> Result<Vec<AnalysisData>, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisData>(&format!(
            "SELECT {DATA_COLUMNS} FROM skinior.analysis_data
             WHERE analysis_id = $1 AND ($2::text IS NULL OR analysis_type = $2)
             ORDER BY recorded_at DESC, id DESC"
        ))
        .bind(analysis_id)
        .bind(analysis_type)
        .fetch_all(self.pool)
        .await?)
    }

    /// Number of data points per type, optionally for one user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn type_counts(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<AnalysisTypeCount>, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisTypeCount>(
            "SELECT analysis_type, COUNT(*) AS count FROM skinior.analysis_data
             WHERE ($1::int IS NULL OR user_id = $1)
             GROUP BY analysis_type ORDER BY count DESC, analysis_type",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Delete a data point.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the data point does not exist.
    pub async fn delete_data(&self, id: AnalysisDataId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.analysis_data WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// All skin-analysis data points of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn skin_analyses(&self, user_id: UserId) -> Result<Vec<AnalysisData>, RepositoryError> {
        Ok(sqlx::query_as::<_, AnalysisData>(&format!(
            "SELECT {DATA_COLUMNS} FROM skinior.analysis_data
             WHERE user_id = $1 AND analysis_type = $2
             ORDER BY recorded_at, id"
        ))
        .bind(user_id)
        .bind(SKIN_ANALYSIS_TYPE)
        .fetch_all(self.pool)
        .await?)
    }
}

//! Treatment plans and milestones.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::instrument;

use skinior_core::{MilestoneId, TreatmentId, TreatmentStatus, UserId};

use super::RepositoryError;
use crate::models::treatment::{Milestone, NewMilestone, Treatment, TreatmentSummary};

const TREATMENT_COLUMNS: &str = "t.id, t.user_id, t.name, t.start_date, t.duration_weeks, \
     t.progress_percent, t.status, t.created_at, t.updated_at";

const MILESTONE_COLUMNS: &str =
    "id, treatment_id, title, description, target_week, completed_at IS NOT NULL AS completed, completed_at";

/// Repository for treatment plans. Every query is scoped to the owning user.
pub struct TreatmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TreatmentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn summary_query(filter: &str) -> String {
        format!(
            "SELECT {TREATMENT_COLUMNS},
                    COUNT(m.id) FILTER (WHERE m.completed_at IS NOT NULL) AS milestones_completed,
                    COUNT(m.id) AS total_milestones
             FROM skinior.treatment t
             LEFT JOIN skinior.treatment_milestone m ON m.treatment_id = t.id
             WHERE {filter}
             GROUP BY t.id
             ORDER BY t.created_at DESC, t.id DESC"
        )
    }

    /// A user's treatments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<TreatmentSummary>, RepositoryError> {
        Ok(sqlx::query_as::<_, TreatmentSummary>(&Self::summary_query("t.user_id = $1"))
            .bind(user_id)
            .fetch_all(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: TreatmentId,
        user_id: UserId,
    ) -> Result<Option<TreatmentSummary>, RepositoryError> {
        Ok(
            sqlx::query_as::<_, TreatmentSummary>(&Self::summary_query("t.id = $1 AND t.user_id = $2"))
                .bind(id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?,
        )
    }

    /// Milestones in plan order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn milestones(&self, id: TreatmentId) -> Result<Vec<Milestone>, RepositoryError> {
        Ok(sqlx::query_as::<_, Milestone>(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM skinior.treatment_milestone
             WHERE treatment_id = $1 ORDER BY target_week, id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Create a treatment and its milestones in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    #[instrument(skip(self, name, milestones), fields(milestones = milestones.len()))]
    pub async fn create(
        &self,
        user_id: UserId,
        name: &str,
        start_date: NaiveDate,
        duration_weeks: i32,
        milestones: &[NewMilestone],
    ) -> Result<TreatmentId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: TreatmentId = sqlx::query_scalar(
            "INSERT INTO skinior.treatment (user_id, name, start_date, duration_weeks)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(user_id)
        .bind(name)
        .bind(start_date)
        .bind(duration_weeks)
        .fetch_one(&mut *tx)
        .await?;

        for milestone in milestones {
            sqlx::query(
                "INSERT INTO skinior.treatment_milestone (treatment_id, title, description, target_week)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(&milestone.title)
            .bind(&milestone.description)
            .bind(milestone.target_week)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Mark a milestone of `treatment_id` done. Completing it again keeps the
    /// first completion time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the milestone is not part of the
    /// treatment.
    pub async fn complete_milestone(
        &self,
        treatment_id: TreatmentId,
        milestone_id: MilestoneId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE skinior.treatment_milestone
             SET completed_at = COALESCE(completed_at, NOW())
             WHERE id = $1 AND treatment_id = $2",
        )
        .bind(milestone_id)
        .bind(treatment_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set progress and status. `None` keeps the current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such treatment.
    pub async fn update(
        &self,
        id: TreatmentId,
        user_id: UserId,
        progress_percent: Option<i32>,
        status: Option<TreatmentStatus>,
    ) -> Result<Treatment, RepositoryError> {
        sqlx::query_as::<_, Treatment>(
            "UPDATE skinior.treatment t
             SET progress_percent = COALESCE($3, t.progress_percent),
                 status = COALESCE($4, t.status),
                 updated_at = NOW()
             WHERE t.id = $1 AND t.user_id = $2
             RETURNING t.id, t.user_id, t.name, t.start_date, t.duration_weeks,
                       t.progress_percent, t.status, t.created_at, t.updated_at",
        )
        .bind(id)
        .bind(user_id)
        .bind(progress_percent)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such treatment.
    pub async fn delete(&self, id: TreatmentId, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.treatment WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Product recommendations produced by skin analyses.

use sqlx::PgPool;
use tracing::instrument;

use skinior_core::{AnalysisSessionId, RecommendationId, UserId};

use super::RepositoryError;
use crate::models::PageRequest;
use crate::models::analysis::{Recommendation, RecommendationFilter, RecommendationInput, UpdateRecommendationRequest};
use crate::models::analytics::LabelCount;

pub(crate) const RECOMMENDATION_COLUMNS: &str = "id, user_id, analysis_id, product_id, product_name, brand, \
     category, ingredients, price, currency, rating, review_count, reason, usage_instructions, \
     priority, availability, product_url, status, user_notes, created_at, updated_at";

/// Aggregates over a set of recommendations.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct RecommendationTotals {
    pub total: i64,
    pub distinct_users: i64,
    pub average_rating: Option<f64>,
}

/// Repository for product recommendations.
pub struct RecommendationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RecommendationRepository<'a> {
    /// Create a new recommendation repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of recommendations for one analysis in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is written.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn create_many(
        &self,
        user_id: UserId,
        analysis_id: AnalysisSessionId,
        inputs: &[RecommendationInput],
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());

        for input in inputs {
            let row = sqlx::query_as::<_, Recommendation>(&format!(
                "INSERT INTO skinior.product_recommendation
                    (user_id, analysis_id, product_id, product_name, brand, category,
                     ingredients, price, currency, rating, review_count, reason,
                     usage_instructions, priority, availability, product_url)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 'USD'), $10,
                         COALESCE($11, 0), $12, $13,
                         COALESCE($14, 'medium'::skinior.recommendation_priority),
                         COALESCE($15, TRUE), $16)
                 RETURNING {RECOMMENDATION_COLUMNS}"
            ))
            .bind(user_id)
            .bind(analysis_id)
            .bind(&input.product_id)
            .bind(&input.product_name)
            .bind(input.brand.as_deref())
            .bind(input.category.as_deref())
            .bind(input.ingredients.as_slice())
            .bind(input.price)
            .bind(input.currency.as_deref())
            .bind(input.rating)
            .bind(input.review_count)
            .bind(&input.reason)
            .bind(input.usage_instructions.as_deref())
            .bind(input.priority)
            .bind(input.availability)
            .bind(input.product_url.as_deref())
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Get a recommendation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: RecommendationId) -> Result<Option<Recommendation>, RepositoryError> {
        Ok(sqlx::query_as::<_, Recommendation>(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM skinior.product_recommendation WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// A user's recommendations, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        filter: &RecommendationFilter,
        page: PageRequest,
    ) -> Result<(Vec<Recommendation>, i64), RepositoryError> {
        let predicate = "user_id = $1
             AND ($2::skinior.recommendation_status IS NULL OR status = $2)
             AND ($3::skinior.recommendation_priority IS NULL OR priority = $3)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM skinior.product_recommendation WHERE {predicate}"
        ))
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.priority)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Recommendation>(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM skinior.product_recommendation
             WHERE {predicate}
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.priority)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Recommendations of an analysis, high priority first, then newest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_analysis(
        &self,
        analysis_id: AnalysisSessionId,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        self.latest_for_analysis(analysis_id, i64::MAX).await
    }

    pub(crate) async fn latest_for_analysis(
        &self,
        analysis_id: AnalysisSessionId,
        limit: i64,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        Ok(sqlx::query_as::<_, Recommendation>(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM skinior.product_recommendation
             WHERE analysis_id = $1
             ORDER BY priority DESC, created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(analysis_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Update status and notes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the recommendation does not exist.
    pub async fn update(
        &self,
        id: RecommendationId,
        update: &UpdateRecommendationRequest,
    ) -> Result<Recommendation, RepositoryError> {
        sqlx::query_as::<_, Recommendation>(&format!(
            "UPDATE skinior.product_recommendation SET
                status = COALESCE($2, status),
                user_notes = COALESCE($3, user_notes),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {RECOMMENDATION_COLUMNS}"
        ))
        .bind(id)
        .bind(update.status)
        .bind(update.user_notes.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a recommendation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the recommendation does not exist.
    pub async fn delete(&self, id: RecommendationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.product_recommendation WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count per status for a user, or for a product when `product_id` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(
        &self,
        user_id: Option<UserId>,
        product_id: Option<&str>,
    ) -> Result<Vec<LabelCount>, RepositoryError> {
        Ok(sqlx::query_as::<_, LabelCount>(
            "SELECT status::text AS label, COUNT(*) AS count
             FROM skinior.product_recommendation
             WHERE ($1::int IS NULL OR user_id = $1) AND ($2::text IS NULL OR product_id = $2)
             GROUP BY status ORDER BY count DESC, label",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Most recommended categories for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_categories(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<LabelCount>, RepositoryError> {
        Ok(sqlx::query_as::<_, LabelCount>(
            "SELECT category AS label, COUNT(*) AS count
             FROM skinior.product_recommendation
             WHERE user_id = $1 AND category IS NOT NULL
             GROUP BY category ORDER BY count DESC, label LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Most recommended brands for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_brands(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<LabelCount>, RepositoryError> {
        Ok(sqlx::query_as::<_, LabelCount>(
            "SELECT brand AS label, COUNT(*) AS count
             FROM skinior.product_recommendation
             WHERE user_id = $1 AND brand IS NOT NULL
             GROUP BY brand ORDER BY count DESC, label LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Totals for a user, or for a product when `product_id` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(
        &self,
        user_id: Option<UserId>,
        product_id: Option<&str>,
    ) -> Result<RecommendationTotals, RepositoryError> {
        Ok(sqlx::query_as::<_, RecommendationTotals>(
            "SELECT COUNT(*) AS total,
                    COUNT(DISTINCT user_id) AS distinct_users,
                    AVG(rating) AS average_rating
             FROM skinior.product_recommendation
             WHERE ($1::int IS NULL OR user_id = $1) AND ($2::text IS NULL OR product_id = $2)",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?)
    }
}

//! Skin-analysis sessions, data points and product recommendations recorded
//! by the consultation agent.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use skinior_core::{
    AnalysisDataId, AnalysisSessionId, AnalysisStatus, RecommendationId, RecommendationStatus,
    UserId,
};

use crate::db::RepositoryError;
use crate::db::analysis::AnalysisRepository;
use crate::db::recommendations::RecommendationRepository;
use crate::models::PageRequest;
use crate::models::analysis::{
    AnalysisData, AnalysisSession, AnalysisSessionDetail, AnalysisTypeCount,
    CreateAnalysisDataRequest, CreateRecommendationsRequest, CreateSessionRequest, Improvement,
    ProductRecommendationSummary, ProgressSummary, Recommendation, RecommendationAnalytics,
    RecommendationFilter, SessionStats, TimelineEntry, UpdateRecommendationRequest,
    UpdateSessionRequest,
};
use crate::models::analytics::LabelCount;
use crate::models::pagination::Paginated;

/// Confidence must rise by more than this to count as an improvement.
const CONFIDENCE_IMPROVEMENT_THRESHOLD: f64 = 0.1;

const TOP_LABELS: i64 = 10;

/// Errors from analysis operations.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("user does not match the analysis session")]
    UserMismatch,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn not_found(what: &'static str) -> impl Fn(RepositoryError) -> AnalysisError {
    move |e| match e {
        RepositoryError::NotFound => AnalysisError::NotFound(what),
        other => AnalysisError::Repository(other),
    }
}

/// Build a timeline entry from a `skin_analysis` data point.
///
/// Missing fields fall back to no concerns, `unknown` skin type and no score.
#[must_use]
pub fn timeline_entry(date: DateTime<Utc>, data: &serde_json::Value) -> TimelineEntry {
    let concerns = data
        .get("concerns")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    TimelineEntry {
        date,
        concerns,
        skin_type: data
            .get("skin_type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown")
            .to_owned(),
        confidence_score: data.get("confidence_score").and_then(serde_json::Value::as_f64),
    }
}

/// Compare the first and latest analyses on a chronological timeline.
#[must_use]
pub fn improvements(timeline: &[TimelineEntry]) -> Vec<Improvement> {
    let (Some(first), Some(last)) = (timeline.first(), timeline.last()) else {
        return Vec::new();
    };
    if timeline.len() < 2 {
        return Vec::new();
    }

    let span = [first.date, last.date];
    let current: HashSet<&str> = last.concerns.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut found: Vec<Improvement> = first
        .concerns
        .iter()
        .filter(|c| !current.contains(c.as_str()) && seen.insert(c.as_str()))
        .map(|c| Improvement {
            improvement: format!("{c}_reduction"),
            progress: 1.0,
            timeline: span,
        })
        .collect();

    let increase = last.confidence_score.unwrap_or(0.0) - first.confidence_score.unwrap_or(0.0);
    if increase > CONFIDENCE_IMPROVEMENT_THRESHOLD {
        found.push(Improvement {
            improvement: "analysis_confidence".to_owned(),
            progress: increase.min(1.0),
            timeline: span,
        });
    }
    found
}

/// `part / total` rounded to two decimals, 0 for an empty total.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rate(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 100.0).round() / 100.0
}

fn count_for(counts: &[LabelCount], status: RecommendationStatus) -> i64 {
    counts
        .iter()
        .filter(|c| c.label == status.as_str())
        .map(|c| c.count)
        .sum()
}

/// Share of recommendations the user purchased or tried.
#[must_use]
pub fn follow_rate(counts: &[LabelCount]) -> f64 {
    let total = counts.iter().map(|c| c.count).sum();
    let followed = counts
        .iter()
        .filter(|c| {
            c.label
                .parse::<RecommendationStatus>()
                .is_ok_and(RecommendationStatus::is_followed)
        })
        .map(|c| c.count)
        .sum();
    rate(followed, total)
}

/// Analysis sessions, data and recommendations.
pub struct AnalysisService<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalysisService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn sessions(&self) -> AnalysisRepository<'a> {
        AnalysisRepository::new(self.pool)
    }

    fn recommendations(&self) -> RecommendationRepository<'a> {
        RecommendationRepository::new(self.pool)
    }

    /// Resolve a session and check it belongs to `user_id`.
    async fn owned_session(
        &self,
        id: AnalysisSessionId,
        user_id: UserId,
    ) -> Result<AnalysisSession, AnalysisError> {
        let session = self
            .sessions()
            .get_session_by_id(id)
            .await?
            .ok_or(AnalysisError::NotFound("analysis session"))?;
        if session.user_id != user_id {
            return Err(AnalysisError::UserMismatch);
        }
        Ok(session)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// # Errors
    ///
    /// Returns `AnalysisError::Invalid` for a blank session id and
    /// `AnalysisError::Repository` with `Conflict` for a duplicate one.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<AnalysisSession, AnalysisError> {
        if request.session_id.trim().is_empty() {
            return Err(AnalysisError::Invalid("session_id is required".to_owned()));
        }
        let session = self
            .sessions()
            .create_session(request)
            .await
            .map_err(not_found("user"))?;
        info!(session_id = %session.session_id, "Analysis session created");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` for an unknown session id.
    pub async fn session(&self, session_id: &str) -> Result<AnalysisSessionDetail, AnalysisError> {
        self.sessions()
            .session_detail(session_id)
            .await?
            .ok_or(AnalysisError::NotFound("analysis session"))
    }

    /// A user's sessions, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if the query fails.
    pub async fn user_sessions(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AnalysisSession>, i64), AnalysisError> {
        Ok(self.sessions().list_sessions(user_id, limit, offset).await?)
    }

    /// Completing a session without an explicit `completed_at` stamps now.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` for an unknown session id.
    #[instrument(skip(self, update))]
    pub async fn update_session(
        &self,
        session_id: &str,
        update: &UpdateSessionRequest,
    ) -> Result<AnalysisSession, AnalysisError> {
        let mut update = update.clone();
        if update.status == Some(AnalysisStatus::Completed) && update.completed_at.is_none() {
            update.completed_at = Some(Utc::now());
        }
        self.sessions()
            .update_session(session_id, &update)
            .await
            .map_err(not_found("analysis session"))
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` for an unknown session id.
    #[instrument(skip(self))]
    pub async fn delete_session(&self, session_id: &str) -> Result<(), AnalysisError> {
        self.sessions()
            .delete_session(session_id)
            .await
            .map_err(not_found("analysis session"))?;
        info!("Analysis session deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if the query fails.
    pub async fn session_stats(&self, user_id: UserId) -> Result<SessionStats, AnalysisError> {
        Ok(self.sessions().session_stats(user_id).await?)
    }

    // =========================================================================
    // Analysis data
    // =========================================================================

    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` for an unknown session and
    /// `AnalysisError::UserMismatch` when the user does not own it.
    #[instrument(skip(self, request), fields(analysis_id = %request.analysis_id, analysis_type = %request.analysis_type))]
    pub async fn create_data(
        &self,
        request: &CreateAnalysisDataRequest,
    ) -> Result<AnalysisData, AnalysisError> {
        if request.analysis_type.trim().is_empty() {
            return Err(AnalysisError::Invalid("analysis_type is required".to_owned()));
        }
        self.owned_session(request.analysis_id, request.user_id).await?;
        Ok(self.sessions().create_data(request).await?)
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` if the data point does not exist.
    pub async fn data(&self, id: AnalysisDataId) -> Result<AnalysisData, AnalysisError> {
        self.sessions()
            .get_data(id)
            .await?
            .ok_or(AnalysisError::NotFound("analysis data"))
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if the query fails.
    pub async fn history(
        &self,
        user_id: UserId,
        analysis_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AnalysisData>, i64), AnalysisError> {
        Ok(self
            .sessions()
            .user_history(user_id, analysis_type, limit, offset)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if the query fails.
    pub async fn session_data(
        &self,
        analysis_id: AnalysisSessionId,
        analysis_type: Option<&str>,
    ) -> Result<Vec<AnalysisData>, AnalysisError> {
        Ok(self.sessions().session_data(analysis_id, analysis_type).await?)
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if the query fails.
    pub async fn type_counts(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<AnalysisTypeCount>, AnalysisError> {
        Ok(self.sessions().type_counts(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` if the data point does not exist.
    #[instrument(skip(self))]
    pub async fn delete_data(&self, id: AnalysisDataId) -> Result<(), AnalysisError> {
        self.sessions()
            .delete_data(id)
            .await
            .map_err(not_found("analysis data"))
    }

    /// Timeline of skin analyses, improvements between the first and latest,
    /// and how often recommendations were followed.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if a query fails.
    #[instrument(skip(self))]
    pub async fn progress(&self, user_id: UserId) -> Result<ProgressSummary, AnalysisError> {
        let repo = self.sessions();
        let total_analyses = repo
            .type_counts(Some(user_id))
            .await?
            .iter()
            .map(|t| t.count)
            .sum::<i64>();

        let timeline: Vec<TimelineEntry> = repo
            .skin_analyses(user_id)
            .await?
            .iter()
            .map(|d| timeline_entry(d.recorded_at, &d.data))
            .collect();

        let counts = self.recommendations().status_counts(Some(user_id), None).await?;

        Ok(ProgressSummary {
            total_analyses: usize::try_from(total_analyses).unwrap_or_default(),
            improvements: improvements(&timeline),
            timeline,
            recommendation_follow_rate: follow_rate(&counts),
        })
    }

    // =========================================================================
    // Recommendations
    // =========================================================================

    /// Store a batch of recommendations for one session.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` for an unknown session and
    /// `AnalysisError::UserMismatch` when the user does not own it.
    #[instrument(skip(self, request), fields(analysis_id = %request.analysis_id, count = request.recommendations.len()))]
    pub async fn create_recommendations(
        &self,
        request: &CreateRecommendationsRequest,
    ) -> Result<Vec<Recommendation>, AnalysisError> {
        if request.recommendations.is_empty() {
            return Err(AnalysisError::Invalid("at least one recommendation is required".to_owned()));
        }
        self.owned_session(request.analysis_id, request.user_id).await?;
        let created = self
            .recommendations()
            .create_many(request.user_id, request.analysis_id, &request.recommendations)
            .await?;
        info!(count = created.len(), "Recommendations stored");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` if the recommendation does not exist.
    pub async fn recommendation(&self, id: RecommendationId) -> Result<Recommendation, AnalysisError> {
        self.recommendations()
            .get(id)
            .await?
            .ok_or(AnalysisError::NotFound("recommendation"))
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if the query fails.
    pub async fn user_recommendations(
        &self,
        user_id: UserId,
        filter: &RecommendationFilter,
    ) -> Result<Paginated<Recommendation>, AnalysisError> {
        let page = PageRequest::new(filter.page, filter.limit);
        let (data, total) = self.recommendations().list_for_user(user_id, filter, page).await?;
        Ok(Paginated::new(data, page, total))
    }

    /// Recommendations for a session, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if the query fails.
    pub async fn analysis_recommendations(
        &self,
        analysis_id: AnalysisSessionId,
    ) -> Result<Vec<Recommendation>, AnalysisError> {
        Ok(self.recommendations().list_for_analysis(analysis_id).await?)
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` if the recommendation does not exist.
    #[instrument(skip(self, update))]
    pub async fn update_recommendation(
        &self,
        id: RecommendationId,
        update: &UpdateRecommendationRequest,
    ) -> Result<Recommendation, AnalysisError> {
        self.recommendations()
            .update(id, update)
            .await
            .map_err(not_found("recommendation"))
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::NotFound` if the recommendation does not exist.
    #[instrument(skip(self))]
    pub async fn delete_recommendation(&self, id: RecommendationId) -> Result<(), AnalysisError> {
        self.recommendations()
            .delete(id)
            .await
            .map_err(not_found("recommendation"))
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if a query fails.
    pub async fn recommendation_analytics(
        &self,
        user_id: UserId,
    ) -> Result<RecommendationAnalytics, AnalysisError> {
        let repo = self.recommendations();
        let totals = repo.totals(Some(user_id), None).await?;
        let by_status = repo.status_counts(Some(user_id), None).await?;
        let purchased = count_for(&by_status, RecommendationStatus::Purchased);
        let tried = count_for(&by_status, RecommendationStatus::Tried);

        Ok(RecommendationAnalytics {
            total_recommendations: totals.total,
            purchase_rate: rate(purchased, totals.total),
            trial_rate: rate(tried, totals.total),
            by_status,
            top_categories: repo.top_categories(user_id, TOP_LABELS).await?,
            top_brands: repo.top_brands(user_id, TOP_LABELS).await?,
            average_rating: totals.average_rating,
        })
    }

    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if a query fails.
    pub async fn product_summary(
        &self,
        product_id: &str,
    ) -> Result<ProductRecommendationSummary, AnalysisError> {
        let repo = self.recommendations();
        let totals = repo.totals(None, Some(product_id)).await?;
        Ok(ProductRecommendationSummary {
            product_id: product_id.to_owned(),
            total_recommendations: totals.total,
            unique_users: totals.distinct_users,
            average_rating: totals.average_rating,
            by_status: repo.status_counts(None, Some(product_id)).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn entry(day: u32, concerns: &[&str], confidence: Option<f64>) -> TimelineEntry {
        TimelineEntry {
            date: Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).single().unwrap_or_default(),
            concerns: concerns.iter().map(|c| (*c).to_owned()).collect(),
            skin_type: "oily".to_owned(),
            confidence_score: confidence,
        }
    }

    fn label(label: &str, count: i64) -> LabelCount {
        LabelCount {
            label: label.to_owned(),
            count,
        }
    }

    #[test]
    fn test_timeline_entry_defaults() {
        let entry = timeline_entry(Utc::now(), &json!({}));
        assert!(entry.concerns.is_empty());
        assert_eq!(entry.skin_type, "unknown");
        assert_eq!(entry.confidence_score, None);

        let entry = timeline_entry(
            Utc::now(),
            &json!({"concerns": ["acne", 3, "redness"], "skin_type": "dry", "confidence_score": 0.8}),
        );
        assert_eq!(entry.concerns, ["acne", "redness"]);
        assert_eq!(entry.skin_type, "dry");
        assert_eq!(entry.confidence_score, Some(0.8));
    }

    #[test]
    fn test_improvements_need_two_analyses() {
        assert!(improvements(&[]).is_empty());
        assert!(improvements(&[entry(1, &["acne"], Some(0.2))]).is_empty());
    }

    #[test]
    fn test_concern_reduction() {
        let timeline = [
            entry(1, &["acne", "redness", "acne"], None),
            entry(8, &["redness"], None),
            entry(15, &["dryness"], None),
        ];
        let found = improvements(&timeline);
        let names: Vec<_> = found.iter().map(|i| i.improvement.as_str()).collect();
        assert_eq!(names, ["acne_reduction", "redness_reduction"]);
        assert!(found.iter().all(|i| i.timeline == [timeline[0].date, timeline[2].date]));
        assert!(found.iter().all(|i| (i.progress - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_confidence_improvement() {
        let found = improvements(&[entry(1, &[], Some(0.5)), entry(9, &[], Some(0.75))]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].improvement, "analysis_confidence");
        assert!((found[0].progress - 0.25).abs() < 1e-9);

        // Exactly at the threshold is not an improvement.
        assert!(improvements(&[entry(1, &[], Some(0.5)), entry(9, &[], Some(0.6))]).is_empty());

        let capped = improvements(&[entry(1, &[], None), entry(9, &[], Some(1.5))]);
        assert!((capped[0].progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rate_rounding() {
        assert!((rate(1, 3) - 0.33).abs() < f64::EPSILON);
        assert!((rate(2, 3) - 0.67).abs() < f64::EPSILON);
        assert!(rate(5, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_follow_rate() {
        let counts = [
            label("purchased", 2),
            label("tried", 1),
            label("recommended", 3),
            label("not_interested", 2),
        ];
        assert!((follow_rate(&counts) - 0.38).abs() < f64::EPSILON);
        assert!(follow_rate(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_count_for() {
        let counts = [label("purchased", 4), label("tried", 1)];
        assert_eq!(count_for(&counts, RecommendationStatus::Purchased), 4);
        assert_eq!(count_for(&counts, RecommendationStatus::Wishlist), 0);
    }
}

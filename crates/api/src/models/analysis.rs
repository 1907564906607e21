//! Skin-analysis records written by the AI consultation agent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use skinior_core::{
    AnalysisDataId, AnalysisSessionId, AnalysisStatus, RecommendationId, RecommendationPriority,
    RecommendationStatus, UserId,
};

use super::analytics::LabelCount;

/// An analysis session, identified externally by `session_id`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnalysisSession {
    pub id: AnalysisSessionId,
    pub user_id: UserId,
    pub session_id: String,
    pub language: String,
    pub status: AnalysisStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A session with its most recent data points and recommendations.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSessionDetail {
    #[serde(flatten)]
    pub session: AnalysisSession,
    pub analysis_data: Vec<AnalysisData>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: UserId,
    pub session_id: String,
    pub language: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSessionRequest {
    pub status: Option<AnalysisStatus>,
    pub metadata: Option<serde_json::Value>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-user session counts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionStats {
    pub total_sessions: i64,
    pub completed_sessions: i64,
    pub in_progress_sessions: i64,
    pub cancelled_sessions: i64,
    pub first_session: Option<DateTime<Utc>>,
    pub last_session: Option<DateTime<Utc>>,
}

/// One analysis result (skin scan, questionnaire answer, ...).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnalysisData {
    pub id: AnalysisDataId,
    pub user_id: UserId,
    pub analysis_id: AnalysisSessionId,
    pub analysis_type: String,
    pub data: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnalysisDataRequest {
    pub user_id: UserId,
    pub analysis_id: AnalysisSessionId,
    pub analysis_type: String,
    pub data: serde_json::Value,
}

/// Number of data points of one type.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnalysisTypeCount {
    pub analysis_type: String,
    pub count: i64,
}

/// One point of a user's skin-analysis history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineEntry {
    pub date: DateTime<Utc>,
    pub concerns: Vec<String>,
    pub skin_type: String,
    pub confidence_score: Option<f64>,
}

/// A measurable improvement between the first and latest analysis.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Improvement {
    pub improvement: String,
    pub progress: f64,
    /// Dates of the first and latest analysis compared.
    pub timeline: [DateTime<Utc>; 2],
}

/// Progress summary across all of a user's analyses.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub total_analyses: usize,
    pub timeline: Vec<TimelineEntry>,
    pub improvements: Vec<Improvement>,
    /// Share of recommendations the user purchased or tried.
    pub recommendation_follow_rate: f64,
}

/// A product recommendation. `product_id` is the agent's product reference,
/// which may or may not be a catalog id.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub user_id: UserId,
    pub analysis_id: AnalysisSessionId,
    pub product_id: String,
    pub product_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub ingredients: Vec<String>,
    pub price: Option<Decimal>,
    pub currency: String,
    pub rating: Option<f64>,
    pub review_count: i32,
    pub reason: String,
    pub usage_instructions: Option<String>,
    pub priority: RecommendationPriority,
    pub availability: bool,
    pub product_url: Option<String>,
    pub status: RecommendationStatus,
    pub user_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One recommendation in a bulk create.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationInput {
    pub product_id: String,
    pub product_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub reason: String,
    pub usage_instructions: Option<String>,
    pub priority: Option<RecommendationPriority>,
    pub availability: Option<bool>,
    pub product_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecommendationsRequest {
    pub user_id: UserId,
    pub analysis_id: AnalysisSessionId,
    pub recommendations: Vec<RecommendationInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecommendationRequest {
    pub status: Option<RecommendationStatus>,
    pub user_notes: Option<String>,
}

/// `?status=&priority=&page=&limit=` for a user's recommendations.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RecommendationFilter {
    pub status: Option<RecommendationStatus>,
    pub priority: Option<RecommendationPriority>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Recommendation engagement for one user.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationAnalytics {
    pub total_recommendations: i64,
    pub by_status: Vec<LabelCount>,
    /// Share of recommendations purchased, 2 dp.
    pub purchase_rate: f64,
    /// Share of recommendations tried, 2 dp.
    pub trial_rate: f64,
    pub top_categories: Vec<LabelCount>,
    pub top_brands: Vec<LabelCount>,
    pub average_rating: Option<f64>,
}

/// How a single product fares across recommendations.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRecommendationSummary {
    pub product_id: String,
    pub total_recommendations: i64,
    pub unique_users: i64,
    pub average_rating: Option<f64>,
    pub by_status: Vec<LabelCount>,
}

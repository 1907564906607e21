//! A customer's consultation history, presented from their analysis sessions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use skinior_core::{AnalysisSessionId, AnalysisStatus, RecommendationId, RecommendationPriority};

/// `GET /api/consultations` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsultationQuery {
    pub limit: Option<i64>,
    /// Id of the last consultation on the previous page.
    pub cursor: Option<AnalysisSessionId>,
    /// A session status, or `all`.
    pub status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Validated list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsultationFilter {
    pub status: Option<AnalysisStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub cursor: Option<AnalysisSessionId>,
    pub limit: i64,
}

/// Skin scores on a 0-100 scale. Unmeasured scores read 50.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkinScores {
    pub hydration: f64,
    pub oiliness: f64,
    pub elasticity: f64,
    pub pigmentation: f64,
    pub texture: f64,
    pub pores: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationRecommendation {
    pub id: RecommendationId,
    pub title: String,
    pub description: String,
    pub priority: RecommendationPriority,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationProduct {
    pub id: RecommendationId,
    pub name: String,
    pub brand: String,
    pub price: Decimal,
    pub priority: RecommendationPriority,
    pub reason: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationSummary {
    pub id: AnalysisSessionId,
    pub session_id: String,
    pub analysis_type: &'static str,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Minutes.
    pub duration: i32,
    pub concerns: Vec<String>,
    /// Up to five, highest priority first.
    pub recommendations: Vec<ConsultationRecommendation>,
    pub skin_analysis: SkinScores,
    pub improvement_score: i32,
    pub advisor_name: &'static str,
    pub notes: String,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationDetail {
    #[serde(flatten)]
    pub summary: ConsultationSummary,
    /// Latest analysis data point, `{}` if there is none.
    pub analysis_data: serde_json::Value,
    pub product_recommendations: Vec<ConsultationProduct>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CursorPagination {
    pub total: i64,
    pub limit: i64,
    pub cursor: Option<AnalysisSessionId>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationPage {
    pub consultations: Vec<ConsultationSummary>,
    pub pagination: CursorPagination,
}

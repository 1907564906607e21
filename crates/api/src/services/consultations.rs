//! Consultation history. Each analysis session the user went through is
//! shown as one consultation with its concerns, skin scores and advice.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use skinior_core::{AnalysisSessionId, AnalysisStatus, UserId};

use crate::db::RepositoryError;
use crate::db::consultations::ConsultationRepository;
use crate::models::analysis::{AnalysisSession, Recommendation};
use crate::models::consultation::{
    ConsultationDetail, ConsultationFilter, ConsultationPage, ConsultationProduct,
    ConsultationQuery, ConsultationRecommendation, ConsultationSummary, CursorPagination,
    SkinScores,
};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

const SUMMARY_RECOMMENDATIONS: i64 = 5;
const ANALYSIS_TYPE: &str = "AI Skin Analysis";
const ADVISOR_NAME: &str = "AI Beauty Advisor";
const DURATION_MINUTES: i32 = 30;
const NEUTRAL_SCORE: f64 = 50.0;

/// A skin score above this flags the matching concern.
const CONCERN_THRESHOLD: f64 = 60.0;

const SCORE_CONCERNS: [(&str, &str); 5] = [
    ("acne", "Acne"),
    ("dryness", "Dry Skin"),
    ("oiliness", "Oily Skin"),
    ("aging", "Aging Signs"),
    ("sensitivity", "Sensitive Skin"),
];

#[derive(Debug, Error)]
pub enum ConsultationError {
    #[error("consultation not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Check and normalize a list query.
///
/// # Errors
///
/// Returns `ConsultationError::Invalid` for a limit outside 1 to 100, an
/// unknown status or `from` after `to`.
pub fn filter(query: &ConsultationQuery) -> Result<ConsultationFilter, ConsultationError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ConsultationError::Invalid(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("" | "all") => None,
        Some(s) => Some(s.parse::<AnalysisStatus>().map_err(ConsultationError::Invalid)?),
    };
    if let (Some(from), Some(to)) = (query.from, query.to)
        && from > to
    {
        return Err(ConsultationError::Invalid("from must not be after to".to_owned()));
    }
    Ok(ConsultationFilter {
        status,
        from: query.from,
        to: query.to,
        cursor: query.cursor,
        limit,
    })
}

fn strings(value: Option<&Value>) -> impl Iterator<Item = &str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Concerns named in the data (`skin_issues`, `concerns`) followed by those
/// implied by high `skin_scores`, without duplicates.
#[must_use]
pub fn extract_concerns(data: &Value) -> Vec<String> {
    let scores = data.get("skin_scores");
    let from_scores = SCORE_CONCERNS.iter().filter_map(|(key, concern)| {
        scores
            .and_then(|s| s.get(key))
            .and_then(Value::as_f64)
            .filter(|score| *score > CONCERN_THRESHOLD)
            .map(|_| *concern)
    });

    let mut seen = HashSet::new();
    strings(data.get("skin_issues"))
        .chain(strings(data.get("concerns")))
        .chain(from_scores)
        .filter(|c| seen.insert(*c))
        .map(str::to_owned)
        .collect()
}

/// Skin scores from `skin_scores`, each read from its first present key.
#[must_use]
pub fn skin_scores(data: &Value) -> SkinScores {
    let scores = data.get("skin_scores");
    let score = |keys: [&str; 2]| {
        keys.iter()
            .find_map(|key| scores.and_then(|s| s.get(key)).and_then(Value::as_f64))
            .unwrap_or(NEUTRAL_SCORE)
    };
    SkinScores {
        hydration: score(["hydration", "moisture"]),
        oiliness: score(["oiliness", "sebum"]),
        elasticity: score(["elasticity", "firmness"]),
        pigmentation: score(["pigmentation", "dark_spots"]),
        texture: score(["texture", "smoothness"]),
        pores: score(["pores", "pore_size"]),
    }
}

/// 0-100 score from the session outcome plus two points per day since it
/// started, the day bonus capped at 40.
#[must_use]
pub fn improvement_score(status: AnalysisStatus, created_at: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    let base = match status {
        AnalysisStatus::Completed => 30,
        AnalysisStatus::InProgress => 15,
        AnalysisStatus::Cancelled => 0,
    };
    let days = (now - created_at).num_days().max(0);
    let bonus = i32::try_from((days * 2).min(40)).unwrap_or(40);
    (base + bonus).min(100)
}

fn metadata_text(session: &AnalysisSession, key: &str) -> Option<String> {
    session
        .metadata
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}

fn summary(
    session: &AnalysisSession,
    data: &Value,
    recommendations: &[&Recommendation],
    now: DateTime<Utc>,
) -> ConsultationSummary {
    ConsultationSummary {
        id: session.id,
        session_id: session.session_id.clone(),
        analysis_type: ANALYSIS_TYPE,
        status: session.status,
        created_at: session.created_at,
        updated_at: session.updated_at,
        duration: DURATION_MINUTES,
        concerns: extract_concerns(data),
        recommendations: recommendations
            .iter()
            .take(usize::try_from(SUMMARY_RECOMMENDATIONS).unwrap_or(5))
            .map(|r| ConsultationRecommendation {
                id: r.id,
                title: r.product_name.clone(),
                description: r.reason.clone(),
                priority: r.priority,
                category: r.category.clone().unwrap_or_else(|| "product".to_owned()),
            })
            .collect(),
        skin_analysis: skin_scores(data),
        improvement_score: improvement_score(session.status, session.created_at, now),
        advisor_name: ADVISOR_NAME,
        notes: metadata_text(session, "notes").unwrap_or_default(),
        customer_name: metadata_text(session, "customer_name")
            .unwrap_or_else(|| "Customer".to_owned()),
    }
}

fn product(r: &Recommendation) -> ConsultationProduct {
    ConsultationProduct {
        id: r.id,
        name: r.product_name.clone(),
        brand: r.brand.clone().unwrap_or_else(|| "Various".to_owned()),
        price: r.price.unwrap_or(Decimal::ZERO),
        priority: r.priority,
        reason: r.reason.clone(),
        category: r.category.clone().unwrap_or_else(|| "skincare".to_owned()),
    }
}

pub struct ConsultationService<'a> {
    pool: &'a PgPool,
}

impl<'a> ConsultationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of the user's consultations, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ConsultationError::Invalid` for a bad query.
    pub async fn list(
        &self,
        user_id: UserId,
        query: &ConsultationQuery,
    ) -> Result<ConsultationPage, ConsultationError> {
        let filter = filter(query)?;
        let repo = ConsultationRepository::new(self.pool);

        let sessions = repo.sessions(user_id, &filter).await?;
        let total = repo.count(user_id, &filter).await?;
        let ids: Vec<AnalysisSessionId> = sessions.iter().map(|s| s.id).collect();

        let data: HashMap<AnalysisSessionId, Value> = repo
            .latest_data(&ids)
            .await?
            .into_iter()
            .map(|d| (d.analysis_id, d.data))
            .collect();
        let recommendations = repo
            .recommendations(&ids, Some(SUMMARY_RECOMMENDATIONS))
            .await?;

        let now = Utc::now();
        let empty = Value::Object(serde_json::Map::new());
        let consultations: Vec<ConsultationSummary> = sessions
            .iter()
            .map(|session| {
                let advice: Vec<&Recommendation> = recommendations
                    .iter()
                    .filter(|r| r.analysis_id == session.id)
                    .collect();
                summary(session, data.get(&session.id).unwrap_or(&empty), &advice, now)
            })
            .collect();

        let has_more = i64::try_from(consultations.len()).is_ok_and(|n| n == filter.limit);
        Ok(ConsultationPage {
            pagination: CursorPagination {
                total,
                limit: filter.limit,
                cursor: consultations.last().map(|c| c.id),
                has_more,
            },
            consultations,
        })
    }

    /// One of the user's consultations with its full recommendation list.
    ///
    /// # Errors
    ///
    /// Returns `ConsultationError::NotFound` unless the session belongs to
    /// the user.
    pub async fn get(
        &self,
        id: AnalysisSessionId,
        user_id: UserId,
    ) -> Result<ConsultationDetail, ConsultationError> {
        let repo = ConsultationRepository::new(self.pool);
        let session = repo
            .session(id, user_id)
            .await?
            .ok_or(ConsultationError::NotFound)?;

        let data = repo
            .latest_data(&[id])
            .await?
            .into_iter()
            .next()
            .map_or_else(|| Value::Object(serde_json::Map::new()), |d| d.data);
        let recommendations = repo.recommendations(&[id], None).await?;
        let advice: Vec<&Recommendation> = recommendations.iter().collect();

        Ok(ConsultationDetail {
            summary: summary(&session, &data, &advice, Utc::now()),
            product_recommendations: recommendations.iter().map(product).collect(),
            analysis_data: data,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_filter_defaults() {
        let filter = filter(&ConsultationQuery::default()).unwrap();
        assert_eq!(filter.limit, DEFAULT_LIMIT);
        assert_eq!(filter.status, None);

        let query = ConsultationQuery {
            status: Some("all".to_owned()),
            ..ConsultationQuery::default()
        };
        assert_eq!(super::filter(&query).unwrap().status, None);
    }

    #[test]
    fn test_filter_rejects_bad_queries() {
        for limit in [0, MAX_LIMIT + 1] {
            let query = ConsultationQuery {
                limit: Some(limit),
                ..ConsultationQuery::default()
            };
            assert!(matches!(filter(&query), Err(ConsultationError::Invalid(_))));
        }

        let query = ConsultationQuery {
            status: Some("pending".to_owned()),
            ..ConsultationQuery::default()
        };
        assert!(filter(&query).is_err());

        let now = Utc::now();
        let query = ConsultationQuery {
            from: Some(now),
            to: Some(now - Duration::days(1)),
            ..ConsultationQuery::default()
        };
        assert!(filter(&query).is_err());
    }

    #[test]
    fn test_filter_status() {
        let query = ConsultationQuery {
            status: Some("completed".to_owned()),
            limit: Some(5),
            ..ConsultationQuery::default()
        };
        let filter = filter(&query).unwrap();
        assert_eq!(filter.status, Some(AnalysisStatus::Completed));
        assert_eq!(filter.limit, 5);
    }

    #[test]
    fn test_extract_concerns() {
        let data = json!({
            "skin_issues": ["Acne", "Redness"],
            "concerns": ["Redness", "Dark Circles"],
            "skin_scores": { "acne": 75, "dryness": 60, "aging": 61.5 },
        });
        assert_eq!(
            extract_concerns(&data),
            ["Acne", "Redness", "Dark Circles", "Aging Signs"]
        );
        assert!(extract_concerns(&json!({})).is_empty());
    }

    #[test]
    fn test_skin_scores_fallbacks() {
        let scores = skin_scores(&json!({
            "skin_scores": { "moisture": 72, "oiliness": 0, "pore_size": 35.5 }
        }));
        assert!((scores.hydration - 72.0).abs() < f64::EPSILON);
        assert!(scores.oiliness.abs() < f64::EPSILON);
        assert!((scores.pores - 35.5).abs() < f64::EPSILON);
        assert!((scores.texture - NEUTRAL_SCORE).abs() < f64::EPSILON);

        assert!((skin_scores(&json!(null)).elasticity - NEUTRAL_SCORE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_improvement_score() {
        let now = Utc::now();
        assert_eq!(improvement_score(AnalysisStatus::Completed, now, now), 30);
        assert_eq!(
            improvement_score(AnalysisStatus::InProgress, now - Duration::days(3), now),
            21
        );
        assert_eq!(
            improvement_score(AnalysisStatus::Completed, now - Duration::days(90), now),
            70
        );
        assert_eq!(
            improvement_score(AnalysisStatus::Cancelled, now + Duration::days(1), now),
            0
        );
    }
}

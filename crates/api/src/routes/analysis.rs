//! Skin-analysis sessions, data points and product recommendations.
//!
//! Called by the Agent16 integration with an API key, or by a logged-in
//! user for their own records.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use skinior_core::{AnalysisDataId, AnalysisSessionId, RecommendationId, UserId};

use crate::error::Result;
use crate::middleware::RequireCaller;
use crate::models::analysis::{
    AnalysisData, AnalysisSession, AnalysisSessionDetail, AnalysisTypeCount,
    CreateAnalysisDataRequest, CreateRecommendationsRequest, CreateSessionRequest,
    ProductRecommendationSummary, ProgressSummary, Recommendation, RecommendationAnalytics,
    RecommendationFilter, SessionStats, UpdateRecommendationRequest, UpdateSessionRequest,
};
use crate::models::{OffsetQuery, Paginated};
use crate::services::analysis::AnalysisService;
use crate::state::AppState;

/// `?type=` plus offset pagination.
#[derive(Debug, Default, Deserialize)]
pub struct TypeQuery {
    #[serde(rename = "type")]
    pub analysis_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TypeQuery {
    const fn offsets(&self) -> OffsetQuery {
        OffsetQuery {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TypeCountQuery {
    pub user_id: Option<UserId>,
}

/// A slice of a longer list addressed by limit and offset.
#[derive(Debug, Serialize)]
pub struct OffsetPage<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// =============================================================================
// Sessions
// =============================================================================

/// `POST /api/analysis/sessions`
pub async fn create_session(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<AnalysisSession>)> {
    caller.authorize_for(body.user_id)?;
    let session = AnalysisService::new(state.pool()).create_session(&body).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /api/analysis/sessions/{session_id}`
pub async fn session(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(session_id): Path<String>,
) -> Result<Json<AnalysisSessionDetail>> {
    let detail = AnalysisService::new(state.pool()).session(&session_id).await?;
    caller.authorize_for(detail.session.user_id)?;
    Ok(Json(detail))
}

/// `PUT /api/analysis/sessions/{session_id}`
pub async fn update_session(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(session_id): Path<String>,
    Json(body): Json<UpdateSessionRequest>,
) -> Result<Json<AnalysisSession>> {
    let service = AnalysisService::new(state.pool());
    caller.authorize_for(service.session(&session_id).await?.session.user_id)?;
    Ok(Json(service.update_session(&session_id, &body).await?))
}

/// `DELETE /api/analysis/sessions/{session_id}`
pub async fn delete_session(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(session_id): Path<String>,
) -> Result<StatusCode> {
    let service = AnalysisService::new(state.pool());
    caller.authorize_for(service.session(&session_id).await?.session.user_id)?;
    service.delete_session(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/analysis/sessions/{session_id}/data?type=`
pub async fn session_data(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(session_id): Path<String>,
    Query(query): Query<TypeQuery>,
) -> Result<Json<Vec<AnalysisData>>> {
    let service = AnalysisService::new(state.pool());
    let session = service.session(&session_id).await?.session;
    caller.authorize_for(session.user_id)?;
    Ok(Json(
        service
            .session_data(session.id, query.analysis_type.as_deref())
            .await?,
    ))
}

/// `GET /api/analysis/users/{user_id}/sessions`
pub async fn user_sessions(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(user_id): Path<UserId>,
    Query(query): Query<OffsetQuery>,
) -> Result<Json<OffsetPage<AnalysisSession>>> {
    caller.authorize_for(user_id)?;
    let (limit, offset) = query.resolve();
    let (data, total) = AnalysisService::new(state.pool())
        .user_sessions(user_id, limit, offset)
        .await?;
    Ok(Json(OffsetPage {
        data,
        total,
        limit,
        offset,
    }))
}

/// `GET /api/analysis/users/{user_id}/stats`
pub async fn session_stats(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(user_id): Path<UserId>,
) -> Result<Json<SessionStats>> {
    caller.authorize_for(user_id)?;
    Ok(Json(AnalysisService::new(state.pool()).session_stats(user_id).await?))
}

// =============================================================================
// Analysis data
// =============================================================================

/// `POST /api/analysis/data`
pub async fn create_data(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Json(body): Json<CreateAnalysisDataRequest>,
) -> Result<(StatusCode, Json<AnalysisData>)> {
    caller.authorize_for(body.user_id)?;
    let data = AnalysisService::new(state.pool()).create_data(&body).await?;
    Ok((StatusCode::CREATED, Json(data)))
}

/// `GET /api/analysis/data/{id}`
pub async fn data(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<AnalysisDataId>,
) -> Result<Json<AnalysisData>> {
    let data = AnalysisService::new(state.pool()).data(id).await?;
    caller.authorize_for(data.user_id)?;
    Ok(Json(data))
}

/// `DELETE /api/analysis/data/{id}`
pub async fn delete_data(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<AnalysisDataId>,
) -> Result<StatusCode> {
    let service = AnalysisService::new(state.pool());
    caller.authorize_for(service.data(id).await?.user_id)?;
    service.delete_data(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/analysis/users/{user_id}/history?type=&limit=&offset=`
pub async fn history(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(user_id): Path<UserId>,
    Query(query): Query<TypeQuery>,
) -> Result<Json<OffsetPage<AnalysisData>>> {
    caller.authorize_for(user_id)?;
    let (limit, offset) = query.offsets().resolve();
    let (data, total) = AnalysisService::new(state.pool())
        .history(user_id, query.analysis_type.as_deref(), limit, offset)
        .await?;
    Ok(Json(OffsetPage {
        data,
        total,
        limit,
        offset,
    }))
}

/// `GET /api/analysis/types?user_id=`
pub async fn type_counts(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Query(query): Query<TypeCountQuery>,
) -> Result<Json<Vec<AnalysisTypeCount>>> {
    // Global counts are for agents and admins; users see their own.
    let user_id = match query.user_id {
        Some(id) => {
            caller.authorize_for(id)?;
            Some(id)
        }
        None if caller.is_privileged() => None,
        None => Some(caller.user_id()),
    };
    Ok(Json(AnalysisService::new(state.pool()).type_counts(user_id).await?))
}

/// `GET /api/analysis/users/{user_id}/progress`
pub async fn progress(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(user_id): Path<UserId>,
) -> Result<Json<ProgressSummary>> {
    caller.authorize_for(user_id)?;
    Ok(Json(AnalysisService::new(state.pool()).progress(user_id).await?))
}

// =============================================================================
// Recommendations
// =============================================================================

/// `POST /api/recommendations`
pub async fn create_recommendations(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Json(body): Json<CreateRecommendationsRequest>,
) -> Result<(StatusCode, Json<Vec<Recommendation>>)> {
    caller.authorize_for(body.user_id)?;
    let created = AnalysisService::new(state.pool())
        .create_recommendations(&body)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/recommendations/{id}`
pub async fn recommendation(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<RecommendationId>,
) -> Result<Json<Recommendation>> {
    let recommendation = AnalysisService::new(state.pool()).recommendation(id).await?;
    caller.authorize_for(recommendation.user_id)?;
    Ok(Json(recommendation))
}

/// `PUT /api/recommendations/{id}`
pub async fn update_recommendation(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<RecommendationId>,
    Json(body): Json<UpdateRecommendationRequest>,
) -> Result<Json<Recommendation>> {
    let service = AnalysisService::new(state.pool());
    caller.authorize_for(service.recommendation(id).await?.user_id)?;
    Ok(Json(service.update_recommendation(id, &body).await?))
}

/// `DELETE /api/recommendations/{id}`
pub async fn delete_recommendation(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<RecommendationId>,
) -> Result<StatusCode> {
    let service = AnalysisService::new(state.pool());
    caller.authorize_for(service.recommendation(id).await?.user_id)?;
    service.delete_recommendation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/recommendations/users/{user_id}?status=&priority=&page=&limit=`
pub async fn user_recommendations(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(user_id): Path<UserId>,
    Query(filter): Query<RecommendationFilter>,
) -> Result<Json<Paginated<Recommendation>>> {
    caller.authorize_for(user_id)?;
    Ok(Json(
        AnalysisService::new(state.pool())
            .user_recommendations(user_id, &filter)
            .await?,
    ))
}

/// `GET /api/recommendations/users/{user_id}/analytics`
pub async fn recommendation_analytics(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(user_id): Path<UserId>,
) -> Result<Json<RecommendationAnalytics>> {
    caller.authorize_for(user_id)?;
    Ok(Json(
        AnalysisService::new(state.pool())
            .recommendation_analytics(user_id)
            .await?,
    ))
}

/// `GET /api/recommendations/analysis/{analysis_id}`
pub async fn analysis_recommendations(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(analysis_id): Path<AnalysisSessionId>,
) -> Result<Json<Vec<Recommendation>>> {
    let recommendations = AnalysisService::new(state.pool())
        .analysis_recommendations(analysis_id)
        .await?;
    for recommendation in &recommendations {
        caller.authorize_for(recommendation.user_id)?;
    }
    Ok(Json(recommendations))
}

/// `GET /api/recommendations/products/{product_id}/summary`
pub async fn product_summary(
    State(state): State<AppState>,
    RequireCaller(_caller): RequireCaller,
    Path(product_id): Path<String>,
) -> Result<Json<ProductRecommendationSummary>> {
    Ok(Json(
        AnalysisService::new(state.pool())
            .product_summary(&product_id)
            .await?,
    ))
}

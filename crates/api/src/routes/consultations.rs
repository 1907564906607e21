//! The signed-in user's consultation history.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use skinior_core::AnalysisSessionId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::consultation::{ConsultationDetail, ConsultationPage, ConsultationQuery};
use crate::services::consultations::ConsultationService;
use crate::state::AppState;

/// `GET /api/consultations`
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ConsultationQuery>,
) -> Result<Json<ConsultationPage>> {
    Ok(Json(
        ConsultationService::new(state.pool()).list(user.id, &query).await?,
    ))
}

/// `GET /api/consultations/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AnalysisSessionId>,
) -> Result<Json<ConsultationDetail>> {
    Ok(Json(
        ConsultationService::new(state.pool()).get(id, user.id).await?,
    ))
}

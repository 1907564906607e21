//! The signed-in user's treatment plans.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use skinior_core::TreatmentId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::treatment::{
    CreateTreatmentRequest, Milestone, TreatmentDetail, TreatmentSummary, UpdateTreatmentRequest,
};
use crate::services::treatments::TreatmentService;
use crate::state::AppState;

/// `GET /api/treatments`
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<TreatmentSummary>>> {
    Ok(Json(TreatmentService::new(state.pool()).list(user.id).await?))
}

/// `POST /api/treatments`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateTreatmentRequest>,
) -> Result<(StatusCode, Json<TreatmentDetail>)> {
    let treatment = TreatmentService::new(state.pool()).create(user.id, &body).await?;
    Ok((StatusCode::CREATED, Json(treatment)))
}

/// `GET /api/treatments/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<TreatmentId>,
) -> Result<Json<TreatmentDetail>> {
    Ok(Json(TreatmentService::new(state.pool()).get(id, user.id).await?))
}

/// `PATCH /api/treatments/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<TreatmentId>,
    Json(body): Json<UpdateTreatmentRequest>,
) -> Result<Json<TreatmentDetail>> {
    Ok(Json(
        TreatmentService::new(state.pool()).update(id, user.id, &body).await?,
    ))
}

/// `DELETE /api/treatments/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<TreatmentId>,
) -> Result<StatusCode> {
    TreatmentService::new(state.pool()).delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/treatments/{id}/milestones`
pub async fn milestones(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<TreatmentId>,
) -> Result<Json<Vec<Milestone>>> {
    Ok(Json(
        TreatmentService::new(state.pool()).milestones(id, user.id).await?,
    ))
}

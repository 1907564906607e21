//! Admin user and agent management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use skinior_core::UserId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::Paginated;
use crate::models::user::{
    CreateAgentRequest, IssuedAgentKey, RefreshAgentRequest, User, UserFilter, UserUpdate,
    UserWithStats,
};
use crate::services::admin::AdminService;
use crate::services::auth::AgentService;
use crate::state::AppState;

/// `GET /api/admin/users`
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Paginated<User>>> {
    Ok(Json(AdminService::new(state.pool()).users(&filter).await?))
}

/// `GET /api/admin/users/{id}`
pub async fn user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<UserWithStats>> {
    Ok(Json(AdminService::new(state.pool()).user(id).await?))
}

/// `PUT /api/admin/users/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<User>> {
    Ok(Json(AdminService::new(state.pool()).update_user(id, &body).await?))
}

/// `DELETE /api/admin/users/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    AdminService::new(state.pool()).delete_user(id, admin.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/admin/agents`
pub async fn agents(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<User>>> {
    Ok(Json(AgentService::new(state.pool()).list().await?))
}

/// `POST /api/admin/agents`
///
/// The response is the only place the plaintext key ever appears.
pub async fn create_agent(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<IssuedAgentKey>)> {
    let issued = AgentService::new(state.pool()).create(&body).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// `POST /api/admin/agents/{id}/refresh`
pub async fn refresh_agent(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<RefreshAgentRequest>,
) -> Result<Json<User>> {
    Ok(Json(
        AgentService::new(state.pool())
            .refresh(id, body.expires_at)
            .await?,
    ))
}

/// `DELETE /api/admin/agents/{id}`
pub async fn deactivate_agent(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    AgentService::new(state.pool()).deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

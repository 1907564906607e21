//! Video consultation rooms.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use skinior_core::ConsultationLanguage;

use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireCaller};
use crate::models::room::{
    CreateRoomRequest, Room, RoomAccess, RoomSession, RoomStatus, RoomVideo, SaveVideoRequest,
};
use crate::services::livekit::RoomClosure;
use crate::services::rooms::RoomService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    pub language: Option<ConsultationLanguage>,
}

/// `POST /api/rooms`
///
/// Joining an existing room name returns a fresh token for it.
pub async fn create(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomSession>)> {
    let session = RoomService::new(state.pool(), state.livekit())
        .create(&body, Some(caller.user_id()))
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /api/rooms`
pub async fn list(
    State(state): State<AppState>,
    RequireCaller(_caller): RequireCaller,
) -> Result<Json<Vec<Room>>> {
    Ok(Json(RoomService::new(state.pool(), state.livekit()).list().await?))
}

/// `GET /api/rooms/{name}`
pub async fn status(
    State(state): State<AppState>,
    RequireCaller(_caller): RequireCaller,
    Path(name): Path<String>,
) -> Result<Json<RoomStatus>> {
    Ok(Json(
        RoomService::new(state.pool(), state.livekit())
            .status(&name)
            .await?,
    ))
}

/// `POST /api/rooms/{name}/leave`
pub async fn leave(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(name): Path<String>,
) -> Result<Json<Room>> {
    Ok(Json(
        RoomService::new(state.pool(), state.livekit())
            .leave(&name, Some(caller.user_id()))
            .await?,
    ))
}

/// `POST /api/rooms/{name}/token?language=`
pub async fn refresh_token(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(name): Path<String>,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<RoomAccess>> {
    Ok(Json(
        RoomService::new(state.pool(), state.livekit())
            .refresh_token(&name, Some(caller.user_id()), query.language)
            .await?,
    ))
}

/// `DELETE /api/rooms/{name}`
pub async fn delete(
    State(state): State<AppState>,
    RequireCaller(_caller): RequireCaller,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    RoomService::new(state.pool(), state.livekit())
        .delete(&name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/rooms/{name}/videos`
pub async fn save_video(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(name): Path<String>,
    Json(body): Json<SaveVideoRequest>,
) -> Result<(StatusCode, Json<RoomVideo>)> {
    let video = RoomService::new(state.pool(), state.livekit())
        .save_video(&name, &body, Some(caller.user_id()))
        .await?;
    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/rooms/{name}/videos`
pub async fn videos(
    State(state): State<AppState>,
    RequireCaller(_caller): RequireCaller,
    Path(name): Path<String>,
) -> Result<Json<Vec<RoomVideo>>> {
    Ok(Json(
        RoomService::new(state.pool(), state.livekit())
            .videos(&name)
            .await?,
    ))
}

/// `POST /api/admin/rooms/close-all`
///
/// Removes every participant and deletes every room on the LiveKit server.
pub async fn close_all(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<RoomClosure>>> {
    let closures = RoomService::new(state.pool(), state.livekit())
        .close_all()
        .await?;
    tracing::info!(admin_id = %admin.id, rooms = closures.len(), "Closed all rooms");
    Ok(Json(closures))
}

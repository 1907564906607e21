//! Video consultation rooms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use skinior_core::{ConsultationLanguage, RoomId, VideoId};

/// A LiveKit room record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub metadata: serde_json::Value,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A recording saved against a room.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RoomVideo {
    pub id: VideoId,
    pub room_id: RoomId,
    pub video_url: String,
    pub duration_seconds: Option<i32>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRoomRequest {
    pub room_name: Option<String>,
    pub language: Option<ConsultationLanguage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveVideoRequest {
    pub video_url: String,
    pub duration_seconds: Option<i32>,
}

/// Token and connection details for joining a room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomAccess {
    pub room_name: String,
    pub token: String,
    pub server_url: String,
    pub token_expires_in: i64,
    pub language: ConsultationLanguage,
    pub ai_prompt: Option<String>,
    pub message: String,
}

/// A room together with fresh join details.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSession {
    pub room: Room,
    #[serde(flatten)]
    pub access: RoomAccess,
}

/// Room status with its age.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatus {
    #[serde(flatten)]
    pub room: Room,
    pub status: &'static str,
    pub duration_minutes: i64,
}

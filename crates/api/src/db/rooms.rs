//! Video consultation room records.

use sqlx::PgPool;
use tracing::instrument;

use skinior_core::RoomId;

use super::RepositoryError;
use crate::models::room::{Room, RoomVideo};

const ROOM_COLUMNS: &str = "id, name, metadata, created_by, created_at, updated_at";

const VIDEO_COLUMNS: &str = "id, room_id, video_url, duration_seconds, recorded_by, created_at";

/// Repository for `LiveKit` rooms and their recordings.
pub struct RoomRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoomRepository<'a> {
    /// Create a new room repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a room by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Room>, RepositoryError> {
        Ok(sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM skinior.livekit_room WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Insert a room record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a room with this name exists.
    #[instrument(skip(self, metadata))]
    pub async fn create(
        &self,
        name: &str,
        metadata: &serde_json::Value,
        created_by: &str,
    ) -> Result<Room, RepositoryError> {
        sqlx::query_as::<_, Room>(&format!(
            "INSERT INTO skinior.livekit_room (name, metadata, created_by)
             VALUES ($1, $2, $3)
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(name)
        .bind(metadata)
        .bind(created_by)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "room already exists"))
    }

    /// All rooms, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Room>, RepositoryError> {
        Ok(sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM skinior.livekit_room ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?)
    }

    /// Bump `updated_at`, e.g. when a token is refreshed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the room does not exist.
    pub async fn touch(&self, name: &str) -> Result<Room, RepositoryError> {
        sqlx::query_as::<_, Room>(&format!(
            "UPDATE skinior.livekit_room SET updated_at = NOW() WHERE name = $1
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a room and its recordings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the room does not exist.
    pub async fn delete(&self, name: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.livekit_room WHERE name = $1")
            .bind(name)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Save a recording against a room.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_video(
        &self,
        room_id: RoomId,
        video_url: &str,
        duration_seconds: Option<i32>,
        recorded_by: &str,
    ) -> Result<RoomVideo, RepositoryError> {
        Ok(sqlx::query_as::<_, RoomVideo>(&format!(
            "INSERT INTO skinior.room_video (room_id, video_url, duration_seconds, recorded_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(room_id)
        .bind(video_url)
        .bind(duration_seconds)
        .bind(recorded_by)
        .fetch_one(self.pool)
        .await?)
    }

    /// Recordings of a room, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn videos(&self, room_id: RoomId) -> Result<Vec<RoomVideo>, RepositoryError> {
        Ok(sqlx::query_as::<_, RoomVideo>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM skinior.room_video
             WHERE room_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(room_id)
        .fetch_all(self.pool)
        .await?)
    }
}

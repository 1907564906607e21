//! Video consultation rooms: database records plus LiveKit tokens.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use skinior_core::{ConsultationLanguage, UserId};

use crate::db::RepositoryError;
use crate::db::rooms::RoomRepository;
use crate::models::room::{
    CreateRoomRequest, Room, RoomAccess, RoomSession, RoomStatus, RoomVideo, SaveVideoRequest,
};
use crate::services::livekit::{LiveKitClient, LiveKitError, RoomClosure};

/// Join tokens are valid for two hours.
pub const TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

const PROMPT_EN: &str = "You are a professional beauty advisor specializing in skin analysis and \
    skincare recommendations. Analyze the customer's skin condition, identify concerns, and \
    recommend suitable skincare solutions and products. Be thorough, professional, and \
    personalized in your recommendations.";

const PROMPT_AR: &str = "أنت مستشار تجميل محترف متخصص في تحليل البشرة وتوصيات العناية بالبشرة. \
    قم بتحليل حالة بشرة العميل، وتحديد المشاكل، وتوصية بحلول ومنتجات العناية بالبشرة المناسبة. \
    كن شاملاً ومهنياً وشخصياً في توصياتك.";

const FEATURES: [&str; 4] = [
    "skin_analysis",
    "product_recommendations",
    "personalized_advice",
    "bilingual_support",
];

/// Errors from room operations.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("video consultations are not configured")]
    Unavailable,

    #[error("room not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    LiveKit(#[from] LiveKitError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// `skincare-room-{unix_ms}-{9 random [a-z0-9]}`.
#[must_use]
pub fn generate_room_name(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect();
    format!("skincare-room-{}-{suffix}", now.timestamp_millis())
}

/// Participant identity shown in the room.
#[must_use]
pub fn participant_identity(user: Option<UserId>) -> String {
    user.map_or_else(|| "Guest".to_owned(), |id| format!("User {id}"))
}

/// Metadata stored with a new consultation room.
#[must_use]
pub fn room_metadata(
    created_by: &str,
    language: ConsultationLanguage,
    now: DateTime<Utc>,
) -> serde_json::Value {
    serde_json::json!({
        "type": "skincare_consultation",
        "created_at": now.to_rfc3339(),
        "created_by": created_by,
        "description": "Skincare consultation room with AI beauty advisor",
        "ai_prompt": {
            "english": PROMPT_EN,
            "arabic": PROMPT_AR,
        },
        "language": language,
        "features": FEATURES,
    })
}

/// The advisor prompt stored in `metadata` for `language`.
#[must_use]
pub fn prompt_for(metadata: &serde_json::Value, language: ConsultationLanguage) -> Option<String> {
    metadata
        .get("ai_prompt")?
        .get(language.as_str())?
        .as_str()
        .map(str::to_owned)
}

fn validate_room_name(name: &str) -> Result<(), RoomError> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(RoomError::Invalid(
            "room_name may only contain letters, digits, '-', '_' and '.'".to_owned(),
        ))
    }
}

/// Room operations for a caller.
pub struct RoomService<'a> {
    rooms: RoomRepository<'a>,
    livekit: Option<&'a LiveKitClient>,
}

impl<'a> RoomService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, livekit: Option<&'a LiveKitClient>) -> Self {
        Self {
            rooms: RoomRepository::new(pool),
            livekit,
        }
    }

    fn livekit(&self) -> Result<&'a LiveKitClient, RoomError> {
        self.livekit.ok_or(RoomError::Unavailable)
    }

    fn access(
        &self,
        room: &Room,
        caller: Option<UserId>,
        language: ConsultationLanguage,
        message: &str,
    ) -> Result<RoomAccess, RoomError> {
        let livekit = self.livekit()?;
        let token = livekit.join_token(
            &room.name,
            &participant_identity(caller),
            Duration::seconds(TOKEN_TTL_SECS),
        )?;
        Ok(RoomAccess {
            room_name: room.name.clone(),
            token,
            server_url: livekit.url().to_owned(),
            token_expires_in: TOKEN_TTL_SECS,
            language,
            ai_prompt: prompt_for(&room.metadata, language),
            message: message.to_owned(),
        })
    }

    /// Create a consultation room, or issue a fresh token for an existing one.
    ///
    /// Creating the room on the LiveKit server is best-effort; LiveKit also
    /// creates rooms on first join.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Unavailable` if LiveKit is not configured.
    #[instrument(skip(self, request), fields(caller = ?caller))]
    pub async fn create(
        &self,
        request: &CreateRoomRequest,
        caller: Option<UserId>,
    ) -> Result<RoomSession, RoomError> {
        let livekit = self.livekit()?;
        let language = request.language.unwrap_or_default();
        let now = Utc::now();
        let name = match request.room_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                validate_room_name(name)?;
                name.to_owned()
            }
            _ => generate_room_name(now),
        };

        if let Some(room) = self.rooms.get_by_name(&name).await? {
            let access = self.access(&room, caller, language, "Room already exists, new token generated")?;
            return Ok(RoomSession { room, access });
        }

        let created_by = caller.map_or_else(|| "anonymous".to_owned(), |id| id.to_string());
        let metadata = room_metadata(&created_by, language, now);

        if let Err(e) = livekit.create_room(&name, &metadata.to_string()).await {
            warn!(room = %name, error = %e, "LiveKit room creation failed, continuing");
        }

        let room = match self.rooms.create(&name, &metadata, &created_by).await {
            Ok(room) => room,
            // Lost a race with a concurrent create of the same name.
            Err(RepositoryError::Conflict(_)) => {
                self.rooms.get_by_name(&name).await?.ok_or(RoomError::NotFound)?
            }
            Err(e) => return Err(e.into()),
        };

        info!(room = %room.name, language = %language, "Consultation room created");
        let access = self.access(&room, caller, language, "Skincare consultation room created")?;
        Ok(RoomSession { room, access })
    }

    /// # Errors
    ///
    /// Returns `RoomError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Room>, RoomError> {
        Ok(self.rooms.list().await?)
    }

    /// # Errors
    ///
    /// Returns `RoomError::NotFound` if the room does not exist.
    pub async fn status(&self, name: &str) -> Result<RoomStatus, RoomError> {
        let room = self.rooms.get_by_name(name).await?.ok_or(RoomError::NotFound)?;
        let duration_minutes = (Utc::now() - room.created_at).num_minutes().max(0);
        Ok(RoomStatus {
            room,
            status: "active",
            duration_minutes,
        })
    }

    /// Record that the caller left. The room stays open for others.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::NotFound` if the room does not exist.
    pub async fn leave(&self, name: &str, caller: Option<UserId>) -> Result<Room, RoomError> {
        let room = self.rooms.touch(name).await.map_err(room_not_found)?;
        info!(room = %name, participant = %participant_identity(caller), "Participant left room");
        Ok(room)
    }

    /// A new two-hour token for an existing room.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::NotFound` if the room does not exist.
    pub async fn refresh_token(
        &self,
        name: &str,
        caller: Option<UserId>,
        language: Option<ConsultationLanguage>,
    ) -> Result<RoomAccess, RoomError> {
        self.livekit()?;
        let room = self.rooms.touch(name).await.map_err(room_not_found)?;
        let language = language
            .or_else(|| {
                room.metadata
                    .get("language")
                    .and_then(serde_json::Value::as_str)
                    .and_then(|l| l.parse().ok())
            })
            .unwrap_or_default();
        self.access(&room, caller, language, "Token refreshed")
    }

    /// Delete a room record and, best-effort, the server room.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::NotFound` if the room does not exist.
    pub async fn delete(&self, name: &str) -> Result<(), RoomError> {
        self.rooms.delete(name).await.map_err(room_not_found)?;
        if let Some(livekit) = self.livekit
            && let Err(e) = livekit.delete_room(name).await
        {
            warn!(room = %name, error = %e, "LiveKit room deletion failed");
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RoomError::NotFound` if the room does not exist.
    /// Returns `RoomError::Invalid` for a blank URL or negative duration.
    pub async fn save_video(
        &self,
        name: &str,
        request: &SaveVideoRequest,
        caller: Option<UserId>,
    ) -> Result<RoomVideo, RoomError> {
        let url = request.video_url.trim();
        if url.is_empty() {
            return Err(RoomError::Invalid("video_url is required".to_owned()));
        }
        if request.duration_seconds.is_some_and(|d| d < 0) {
            return Err(RoomError::Invalid("duration_seconds must not be negative".to_owned()));
        }
        let room = self.rooms.get_by_name(name).await?.ok_or(RoomError::NotFound)?;
        let recorded_by = caller.map_or_else(|| "anonymous".to_owned(), |id| id.to_string());
        Ok(self
            .rooms
            .add_video(room.id, url, request.duration_seconds, &recorded_by)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RoomError::NotFound` if the room does not exist.
    pub async fn videos(&self, name: &str) -> Result<Vec<RoomVideo>, RoomError> {
        let room = self.rooms.get_by_name(name).await?.ok_or(RoomError::NotFound)?;
        Ok(self.rooms.videos(room.id).await?)
    }

    /// Close every room on the LiveKit server.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Unavailable` if LiveKit is not configured.
    pub async fn close_all(&self) -> Result<Vec<RoomClosure>, RoomError> {
        Ok(self.livekit()?.close_all().await?)
    }
}

fn room_not_found(e: RepositoryError) -> RoomError {
    match e {
        RepositoryError::NotFound => RoomError::NotFound,
        other => RoomError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_room_name() {
        let now = DateTime::from_timestamp_millis(1_760_000_000_123).unwrap();
        let name = generate_room_name(now);
        let suffix = name.strip_prefix("skincare-room-1760000000123-").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_participant_identity() {
        assert_eq!(participant_identity(Some(UserId::new(12))), "User 12");
        assert_eq!(participant_identity(None), "Guest");
    }

    #[test]
    fn test_metadata_and_prompt() {
        let metadata = room_metadata("12", ConsultationLanguage::English, Utc::now());
        assert_eq!(metadata["type"], "skincare_consultation");
        assert_eq!(metadata["language"], "english");
        assert_eq!(metadata["features"].as_array().unwrap().len(), 4);

        let english = prompt_for(&metadata, ConsultationLanguage::English).unwrap();
        assert!(english.starts_with("You are a professional beauty advisor"));
        let arabic = prompt_for(&metadata, ConsultationLanguage::Arabic).unwrap();
        assert!(arabic.starts_with("أنت مستشار تجميل"));

        assert_eq!(prompt_for(&serde_json::json!({}), ConsultationLanguage::Arabic), None);
    }

    #[test]
    fn test_room_name_validation() {
        assert!(validate_room_name("consult-42_a.b").is_ok());
        assert!(validate_room_name("has space").is_err());
        assert!(validate_room_name(&"x".repeat(129)).is_err());
    }
}

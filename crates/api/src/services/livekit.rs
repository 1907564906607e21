//! LiveKit: access tokens and the Twirp room service API.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::LiveKitConfig;

/// Lifetime of server API tokens.
const SERVER_TOKEN_TTL_SECS: i64 = 600;

/// Errors from LiveKit calls.
#[derive(Debug, Error)]
pub enum LiveKitError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("LiveKit returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// The `video` grant of a LiveKit token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_join: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_create: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_list: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_admin: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// LiveKit JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// A room as reported by the LiveKit server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveRoom {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "numParticipants")]
    pub num_participants: u32,
    #[serde(default)]
    pub metadata: String,
}

/// A participant as reported by the LiveKit server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListRoomsResponse {
    #[serde(default)]
    rooms: Vec<LiveRoom>,
}

#[derive(Debug, Default, Deserialize)]
struct ListParticipantsResponse {
    #[serde(default)]
    participants: Vec<Participant>,
}

/// Outcome of closing one server room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomClosure {
    pub name: String,
    pub sid: String,
    pub participants_removed: usize,
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Convert a `ws://` / `wss://` server URL to its HTTP equivalent.
#[must_use]
pub fn http_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        url.to_owned()
    }
}

/// LiveKit client.
#[derive(Clone)]
pub struct LiveKitClient {
    inner: Arc<LiveKitClientInner>,
}

struct LiveKitClientInner {
    client: reqwest::Client,
    url: String,
    http_url: String,
    api_key: String,
    api_secret: SecretString,
}

impl LiveKitClient {
    #[must_use]
    pub fn new(config: &LiveKitConfig) -> Self {
        Self {
            inner: Arc::new(LiveKitClientInner {
                client: reqwest::Client::new(),
                url: config.url.clone(),
                http_url: http_url(&config.url),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
            }),
        }
    }

    /// The URL clients connect to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Sign claims with the API secret (HS256).
    fn sign(&self, claims: &Claims) -> Result<String, LiveKitError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.inner.api_secret.expose_secret().as_bytes()),
        )?)
    }

    fn claims(&self, identity: &str, ttl: Duration, video: VideoGrant) -> Claims {
        let now = Utc::now();
        Claims {
            iss: self.inner.api_key.clone(),
            sub: identity.to_owned(),
            name: Some(identity.to_owned()),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            video,
        }
    }

    /// A token that lets `identity` join `room` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `LiveKitError::Token` if signing fails.
    pub fn join_token(&self, room: &str, identity: &str, ttl: Duration) -> Result<String, LiveKitError> {
        self.sign(&self.claims(
            identity,
            ttl,
            VideoGrant {
                room: Some(room.to_owned()),
                room_join: true,
                ..VideoGrant::default()
            },
        ))
    }

    fn server_token(&self, room: Option<&str>) -> Result<String, LiveKitError> {
        self.sign(&self.claims(
            &self.inner.api_key,
            Duration::seconds(SERVER_TOKEN_TTL_SECS),
            VideoGrant {
                room: room.map(str::to_owned),
                room_create: true,
                room_list: true,
                room_admin: true,
                ..VideoGrant::default()
            },
        ))
    }

    async fn twirp<T: serde::de::DeserializeOwned + Default>(
        &self,
        method: &str,
        room: Option<&str>,
        body: serde_json::Value,
    ) -> Result<T, LiveKitError> {
        let response = self
            .inner
            .client
            .post(format!(
                "{}/twirp/livekit.RoomService/{method}",
                self.inner.http_url
            ))
            .bearer_auth(self.server_token(room)?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LiveKitError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Create a room with JSON metadata.
    ///
    /// # Errors
    ///
    /// Returns `LiveKitError` if the server rejects the request.
    #[instrument(skip(self, metadata))]
    pub async fn create_room(&self, name: &str, metadata: &str) -> Result<LiveRoom, LiveKitError> {
        self.twirp(
            "CreateRoom",
            Some(name),
            serde_json::json!({
                "name": name,
                "metadata": metadata,
                "empty_timeout": 600,
                "max_participants": 10,
            }),
        )
        .await
    }

    /// Rooms on the server, optionally restricted to `names`.
    ///
    /// # Errors
    ///
    /// Returns `LiveKitError` if the server rejects the request.
    pub async fn list_rooms(&self, names: &[String]) -> Result<Vec<LiveRoom>, LiveKitError> {
        let response: ListRoomsResponse = self
            .twirp("ListRooms", None, serde_json::json!({ "names": names }))
            .await?;
        Ok(response.rooms)
    }

    /// # Errors
    ///
    /// Returns `LiveKitError` if the server rejects the request.
    pub async fn list_participants(&self, room: &str) -> Result<Vec<Participant>, LiveKitError> {
        let response: ListParticipantsResponse = self
            .twirp("ListParticipants", Some(room), serde_json::json!({ "room": room }))
            .await?;
        Ok(response.participants)
    }

    /// # Errors
    ///
    /// Returns `LiveKitError` if the server rejects the request.
    pub async fn remove_participant(&self, room: &str, identity: &str) -> Result<(), LiveKitError> {
        let _: serde_json::Value = self
            .twirp(
                "RemoveParticipant",
                Some(room),
                serde_json::json!({ "room": room, "identity": identity }),
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `LiveKitError` if the server rejects the request.
    pub async fn delete_room(&self, room: &str) -> Result<(), LiveKitError> {
        let _: serde_json::Value = self
            .twirp("DeleteRoom", Some(room), serde_json::json!({ "room": room }))
            .await?;
        Ok(())
    }

    /// Remove every participant from every server room, then delete the rooms.
    ///
    /// # Errors
    ///
    /// Returns `LiveKitError` only if the rooms cannot be listed; per-room
    /// failures are reported in the result.
    #[instrument(skip(self))]
    pub async fn close_all(&self) -> Result<Vec<RoomClosure>, LiveKitError> {
        let rooms = self.list_rooms(&[]).await?;
        let mut closures = Vec::with_capacity(rooms.len());

        for room in rooms {
            let mut removed = 0;
            let result = async {
                for participant in self.list_participants(&room.name).await? {
                    match self.remove_participant(&room.name, &participant.identity).await {
                        Ok(()) => removed += 1,
                        Err(e) => warn!(room = %room.name, identity = %participant.identity, error = %e,
                            "Failed to remove participant"),
                    }
                }
                self.delete_room(&room.name).await
            }
            .await;

            if let Err(e) = &result {
                warn!(room = %room.name, error = %e, "Failed to close room");
            }
            closures.push(RoomClosure {
                name: room.name,
                sid: room.sid,
                participants_removed: removed,
                closed: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            });
        }

        info!(
            closed = closures.iter().filter(|c| c.closed).count(),
            total = closures.len(),
            "Closed LiveKit rooms"
        );
        Ok(closures)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jsonwebtoken::{DecodingKey, Validation};

    use super::*;

    fn client() -> LiveKitClient {
        LiveKitClient::new(&LiveKitConfig {
            url: "wss://skinior.livekit.cloud".to_owned(),
            api_key: "APIkey123".to_owned(),
            api_secret: SecretString::from("a-long-livekit-api-secret-for-tests"),
        })
    }

    fn decode(token: &str) -> Claims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(b"a-long-livekit-api-secret-for-tests"),
            &validation,
        )
        .unwrap()
        .claims
    }

    #[test]
    fn test_http_url() {
        assert_eq!(http_url("wss://host.example/"), "https://host.example");
        assert_eq!(http_url("ws://localhost:7880"), "http://localhost:7880");
        assert_eq!(http_url("https://host.example"), "https://host.example");
    }

    #[test]
    fn test_join_token_claims() {
        let token = client()
            .join_token("skincare-room-1", "User 7", Duration::hours(2))
            .unwrap();
        let claims = decode(&token);

        assert_eq!(claims.iss, "APIkey123");
        assert_eq!(claims.sub, "User 7");
        assert_eq!(claims.exp - claims.nbf, 7200);
        assert_eq!(claims.video.room.as_deref(), Some("skincare-room-1"));
        assert!(claims.video.room_join);
        assert!(!claims.video.room_admin);
    }

    #[test]
    fn test_grant_serializes_camel_case() {
        let json = serde_json::to_value(VideoGrant {
            room: Some("r".to_owned()),
            room_join: true,
            ..VideoGrant::default()
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"room": "r", "roomJoin": true}));
    }

    #[test]
    fn test_server_token_grants() {
        let claims = decode(&client().server_token(None).unwrap());
        assert!(claims.video.room_create);
        assert!(claims.video.room_list);
        assert!(claims.video.room_admin);
        assert!(!claims.video.room_join);
    }

    #[test]
    fn test_list_rooms_response_accepts_both_casings() {
        let parsed: ListRoomsResponse = serde_json::from_str(
            r#"{"rooms":[{"sid":"RM_1","name":"a","num_participants":2},
                         {"sid":"RM_2","name":"b","numParticipants":3}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.rooms[0].num_participants, 2);
        assert_eq!(parsed.rooms[1].num_participants, 3);
    }
}

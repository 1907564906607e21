//! API keys for agent system accounts.
//!
//! Keys look like `sk_{name}_{32 hex}`. Only the SHA-256 hex digest of a key
//! is stored, so a key can be shown exactly once.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, instrument};

use skinior_core::{Email, UserId, UserRole};

use super::AuthError;
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{CreateAgentRequest, IssuedAgentKey, NewUser, User};

/// Key lifetime when none is requested.
pub const DEFAULT_KEY_LIFETIME_DAYS: i64 = 180;

/// Agent account management and key authentication.
pub struct AgentService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AgentService<'a> {
    /// Create a new agent service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Create an agent account and issue its key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidAgentName` if the name has no usable characters.
    /// Returns `AuthError::UserAlreadyExists` if the email is taken.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: &CreateAgentRequest) -> Result<IssuedAgentKey, AuthError> {
        let email = Email::parse(&request.email)?;
        let api_key = generate_api_key(&request.name).ok_or(AuthError::InvalidAgentName)?;
        let expires_at = expiry_or_default(request.expires_at, Utc::now());

        let agent = self
            .users
            .create_agent(
                &NewUser {
                    email,
                    first_name: Some(request.name.trim().to_owned()),
                    last_name: None,
                    phone: None,
                    role: UserRole::Agent,
                    password_hash: None,
                },
                &hash_api_key(&api_key),
                request.description.as_deref(),
                expires_at,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(agent_id = %agent.id, "Agent key issued");
        Ok(IssuedAgentKey {
            agent,
            api_key,
            expires_at,
        })
    }

    /// List agent accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.users.list_agents().await?)
    }

    /// Extend an agent key (and reactivate the agent).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no agent has this ID.
    pub async fn refresh(
        &self,
        id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<User, AuthError> {
        let expires_at = expiry_or_default(expires_at, Utc::now());
        self.users
            .refresh_agent(id, expires_at)
            .await
            .map_err(not_found_as_user_not_found)
    }

    /// Deactivate an agent; its key stops working immediately.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no agent has this ID.
    pub async fn deactivate(&self, id: UserId) -> Result<(), AuthError> {
        self.users
            .deactivate_agent(id)
            .await
            .map_err(not_found_as_user_not_found)
    }

    /// Resolve an API key to its active, unexpired agent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidApiKey` if the key is malformed or unknown.
    pub async fn authenticate(&self, api_key: &str) -> Result<User, AuthError> {
        if !api_key.starts_with("sk_") {
            return Err(AuthError::InvalidApiKey);
        }
        self.users
            .get_agent_by_key_hash(&hash_api_key(api_key))
            .await?
            .ok_or(AuthError::InvalidApiKey)
    }
}

fn not_found_as_user_not_found(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::NotFound => AuthError::UserNotFound,
        other => AuthError::Repository(other),
    }
}

fn expiry_or_default(requested: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    requested.unwrap_or_else(|| now + Duration::days(DEFAULT_KEY_LIFETIME_DAYS))
}

/// Lowercase ASCII letters and digits of an agent name.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Generate `sk_{name}_{32 hex}`, or `None` when the name sanitizes to nothing.
#[must_use]
pub fn generate_api_key(name: &str) -> Option<String> {
    let name = sanitize_name(name);
    if name.is_empty() {
        return None;
    }
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    Some(format!("sk_{name}_{}", hex::encode(bytes)))
}

/// SHA-256 hex digest stored in place of the key.
#[must_use]
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = generate_api_key("Agent 16!").unwrap();
        let suffix = key.strip_prefix("sk_agent16_").unwrap();
        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_keys_are_unique() {
        assert_ne!(generate_api_key("bot"), generate_api_key("bot"));
    }

    #[test]
    fn test_unusable_name() {
        assert_eq!(generate_api_key("   "), None);
        assert_eq!(generate_api_key("وكيل"), None);
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let digest = hash_api_key("sk_bot_00");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_api_key("sk_bot_00"));
        assert_ne!(digest, hash_api_key("sk_bot_01"));
        assert_eq!(
            hash_api_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_default_expiry() {
        let now = Utc::now();
        assert_eq!(expiry_or_default(None, now) - now, Duration::days(180));
        let explicit = now + Duration::days(3);
        assert_eq!(expiry_or_default(Some(explicit), now), explicit);
    }
}

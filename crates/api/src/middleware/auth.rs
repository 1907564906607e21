//! Authentication extractors and session helpers.
//!
//! Browser clients authenticate with the session cookie. Agent integrations
//! send an API key instead, which only [`RequireCaller`] accepts.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use skinior_core::UserId;

use crate::error::AppError;
use crate::models::session::keys;
use crate::models::{CurrentUser, User};
use crate::services::auth::AgentService;
use crate::state::AppState;

/// Header carrying a bare agent API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Scheme for agent keys in the `Authorization` header.
const API_KEY_SCHEME: &str = "ApiKey ";

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Authentication required".to_owned())
}

/// Extractor that requires a logged-in user.
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts).await.map(Self).ok_or_else(unauthorized)
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Extractor that requires a logged-in admin. Other users get 403.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts).await.ok_or_else(unauthorized)?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_owned()));
        }
        Ok(Self(user))
    }
}

/// Who is making a request that accepts either a session or an API key.
#[derive(Debug, Clone)]
pub enum Caller {
    Session(CurrentUser),
    Agent(User),
}

impl Caller {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::Session(user) => user.id,
            Self::Agent(agent) => agent.id,
        }
    }

    #[must_use]
    pub const fn is_agent(&self) -> bool {
        matches!(self, Self::Agent(_))
    }

    /// Agents and admins act for any user.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        match self {
            Self::Agent(_) => true,
            Self::Session(user) => user.is_admin(),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the caller may not act for `user_id`.
    pub fn authorize_for(&self, user_id: UserId) -> Result<(), AppError> {
        if self.is_privileged() || self.user_id() == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("You can only access your own records".to_owned()))
        }
    }
}

/// Extract an agent API key from `Authorization: ApiKey <key>` or `x-api-key`.
#[must_use]
pub fn api_key_from_headers(headers: &axum::http::HeaderMap) -> Option<&str> {
    let from_authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(API_KEY_SCHEME));

    from_authorization
        .or_else(|| headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Extractor that accepts a session user or an active agent's API key.
///
/// An API key, when present, takes precedence and must be valid.
pub struct RequireCaller(pub Caller);

impl FromRequestParts<AppState> for RequireCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(key) = api_key_from_headers(&parts.headers) {
            let agent = AgentService::new(state.pool()).authenticate(key).await?;
            tracing::debug!(agent_id = %agent.id, "Agent authenticated");
            return Ok(Self(Caller::Agent(agent)));
        }

        session_user(parts)
            .await
            .map(|user| Self(Caller::Session(user)))
            .ok_or_else(unauthorized)
    }
}

/// Store the logged-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_USER, user).await
}

/// Remove the logged-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    Ok(())
}

/// The anonymous cart token, if the session has one.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn cart_token(session: &Session) -> Result<Option<Uuid>, tower_sessions::session::Error> {
    session.get::<Uuid>(keys::CART_TOKEN).await
}

/// The anonymous cart token, creating one on first use.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn ensure_cart_token(session: &Session) -> Result<Uuid, tower_sessions::session::Error> {
    if let Some(token) = cart_token(session).await? {
        return Ok(token);
    }
    let token = Uuid::new_v4();
    session.insert(keys::CART_TOKEN, token).await?;
    Ok(token)
}

/// Remove and return the anonymous cart token.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn take_cart_token(
    session: &Session,
) -> Result<Option<Uuid>, tower_sessions::session::Error> {
    session.remove::<Uuid>(keys::CART_TOKEN).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

    use super::*;

    #[test]
    fn test_api_key_from_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("ApiKey sk_agent16_abc"));
        assert_eq!(api_key_from_headers(&headers), Some("sk_agent16_abc"));
    }

    #[test]
    fn test_api_key_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static(" sk_bot_123 "));
        assert_eq!(api_key_from_headers(&headers), Some("sk_bot_123"));
    }

    #[test]
    fn test_bearer_is_not_an_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk_bot_123"));
        assert_eq!(api_key_from_headers(&headers), None);
        assert_eq!(api_key_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_empty_key_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("  "));
        assert_eq!(api_key_from_headers(&headers), None);
    }

    #[test]
    fn test_caller_user_id() {
        let user = CurrentUser {
            id: UserId::new(7),
            email: skinior_core::Email::parse("a@b.co").unwrap(),
            role: skinior_core::UserRole::Customer,
        };
        let caller = Caller::Session(user);
        assert_eq!(caller.user_id(), UserId::new(7));
        assert!(!caller.is_agent());
        assert!(caller.authorize_for(UserId::new(7)).is_ok());
        assert!(matches!(
            caller.authorize_for(UserId::new(8)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_acts_for_anyone() {
        let admin = Caller::Session(CurrentUser {
            id: UserId::new(1),
            email: skinior_core::Email::parse("admin@skinior.com").unwrap(),
            role: skinior_core::UserRole::Admin,
        });
        assert!(admin.authorize_for(UserId::new(99)).is_ok());
    }
}

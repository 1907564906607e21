//! Account registration, login and logout.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, cart_token, clear_current_user, set_current_user, take_cart_token};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::services::cart::CartService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Login and account-claim body.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Start an authenticated session for `user`.
///
/// The session id is cycled to prevent fixation. An anonymous cart in the
/// session is merged into the user's cart; if that fails the token stays so
/// the next login retries it.
async fn log_in(state: &AppState, session: &Session, user: &User) -> Result<()> {
    session.cycle_id().await?;
    set_current_user(
        session,
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        },
    )
    .await?;

    if let Some(token) = cart_token(session).await? {
        match CartService::new(state.pool(), state.currency())
            .migrate(token, user.id)
            .await
        {
            Ok(outcome) => {
                take_cart_token(session).await?;
                info!(user_id = %user.id, ?outcome, "Cart migrated on login");
            }
            Err(e) => warn!(user_id = %user.id, error = %e, "Cart migration failed"),
        }
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register(&body.email, &body.password, body.first_name, body.last_name)
        .await?;
    info!(user_id = %user.id, "User registered");
    log_in(&state, &session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<Credentials>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;
    log_in(&state, &session, &user).await?;
    info!(user_id = %user.id, role = %user.role, "User logged in");
    Ok(Json(user))
}

/// `POST /api/auth/logout`
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<User>> {
    Ok(Json(AuthService::new(state.pool()).get_user(user.id).await?))
}

/// `POST /api/auth/claim-account`
///
/// Sets a password on an account created by guest checkout and logs in.
pub async fn claim_account(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<Credentials>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .claim_account(&body.email, &body.password)
        .await?;
    info!(user_id = %user.id, "Guest account claimed");
    log_in(&state, &session, &user).await?;
    Ok(Json(user))
}

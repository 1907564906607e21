//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! skn-cli admin create -e admin@skinior.com -p 'long-password' -f Lina -l Haddad
//! ```
//!
//! Admins log in through `POST /api/auth/login` like any other user; the role
//! unlocks `/api/admin/*`.

use thiserror::Error;

use skinior_api::db::{RepositoryError, UserRepository};
use skinior_api::models::user::NewUser;
use skinior_api::services::auth::{AuthError, hash_password, validate_password};
use skinior_core::{Email, UserRole};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password rejected or could not be hashed.
    #[error(transparent)]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("A user already exists with email: {0}")]
    UserExists(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a new admin user with a password.
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns an error if the email or password is invalid, the email is taken,
/// or the database is unreachable.
pub async fn create_user(
    email: &str,
    password: &str,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<i32, AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    validate_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if users.get_by_email(&email).await?.is_some() {
        return Err(AdminError::UserExists(email.to_string()));
    }

    let address = email.to_string();
    tracing::info!("Creating admin user: {}", address);

    let user = users
        .create(&NewUser {
            email,
            first_name,
            last_name,
            phone: None,
            role: UserRole::Admin,
            password_hash: Some(hash_password(password)?),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(address),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id.as_i32())
}

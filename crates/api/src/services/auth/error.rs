//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] skinior_core::EmailError),

    /// Invalid credentials (wrong password, unknown or inactive user).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The account already has a password and cannot be claimed.
    #[error("account already has a password")]
    AlreadyClaimed,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Agent name is empty after sanitizing.
    #[error("invalid agent name")]
    InvalidAgentName,

    /// API key missing, unknown, expired or belonging to an inactive agent.
    #[error("invalid api key")]
    InvalidApiKey,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

//! Agent account commands.
//!
//! Agents are system accounts used by the consultation assistant. They call
//! the analysis, recommendation and room endpoints with an API key.
//!
//! # Usage
//!
//! ```bash
//! skn-cli agent create -n consultation-bot -e bot@skinior.com -d "LiveKit agent"
//! ```

use skinior_api::models::user::CreateAgentRequest;
use skinior_api::services::auth::{AgentService, AuthError};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create an agent account and print its API key.
///
/// The key is stored hashed and cannot be recovered; it is printed to stdout
/// exactly once.
///
/// # Errors
///
/// Returns an error if the name or email is invalid, the email is taken, or
/// the database is unreachable.
pub async fn create(name: &str, email: &str, description: Option<String>) -> Result<(), AgentError> {
    let pool = connect().await?;

    let issued = AgentService::new(&pool)
        .create(&CreateAgentRequest {
            name: name.to_owned(),
            email: email.to_owned(),
            description,
            expires_at: None,
        })
        .await?;

    tracing::info!("Agent created successfully!");
    tracing::info!("  ID: {}", issued.agent.id);
    tracing::info!("  Email: {}", issued.agent.email);
    tracing::info!("  Expires: {}", issued.expires_at.to_rfc3339());
    tracing::warn!("Store this key now. It will not be shown again.");

    #[allow(clippy::print_stdout)]
    {
        println!("{}", issued.api_key);
    }

    Ok(())
}

//! Stripe webhook receiver.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /api/webhooks/stripe`
///
/// The raw body is needed for signature verification.
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let client = state
        .stripe()
        .ok_or_else(|| AppError::BadRequest("Stripe webhooks are not configured".to_owned()))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_owned()))?;

    let event = client.construct_event(&body, signature)?;
    CheckoutService::new(state.pool())
        .handle_stripe_event(&event)
        .await?;

    Ok(Json(json!({ "received": true })))
}

//! Stripe: PaymentIntents over the REST API and webhook signature checks.

use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{instrument, warn};

use skinior_core::OrderId;

use crate::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Errors from Stripe calls and webhook verification.
#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe rejected the request (card declined, bad parameters, ...).
    #[error("{message}")]
    Api { code: Option<String>, message: String },

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("webhook timestamp outside tolerance")]
    StaleSignature,

    #[error("invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// The parts of a PaymentIntent the API uses.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

impl PaymentIntent {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    secret_key: SecretString,
    webhook_secret: SecretString,
    api_base: String,
}

impl StripeClient {
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            inner: Arc::new(StripeClientInner {
                client: reqwest::Client::new(),
                secret_key: config.secret_key.clone(),
                webhook_secret: config.webhook_secret.clone(),
                api_base: config.api_base.trim_end_matches('/').to_owned(),
            }),
        }
    }

    /// Create and immediately confirm a PaymentIntent for an order.
    ///
    /// `amount` is in minor units. Stripe has no JOD, so JOD orders are
    /// charged in USD.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` if Stripe declines or rejects the request.
    #[instrument(skip(self, payment_method_id))]
    pub async fn create_and_confirm(
        &self,
        amount: i64,
        currency: &str,
        payment_method_id: &str,
        order_id: OrderId,
        order_number: &str,
    ) -> Result<PaymentIntent, StripeError> {
        let currency = charge_currency(currency);
        let params = [
            ("amount", amount.to_string()),
            ("currency", currency),
            ("payment_method", payment_method_id.to_owned()),
            ("confirmation_method", "manual".to_owned()),
            ("confirm", "true".to_owned()),
            ("metadata[order_id]", order_id.to_string()),
            ("metadata[order_number]", order_number.to_owned()),
        ];

        let response = self
            .inner
            .client
            .post(format!("{}/v1/payment_intents", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.json::<ApiErrorBody>().await.ok();
            warn!(%status, "Stripe rejected PaymentIntent");
            return Err(match body {
                Some(body) => StripeError::Api {
                    code: body.error.code,
                    message: body
                        .error
                        .message
                        .unwrap_or_else(|| "payment failed".to_owned()),
                },
                None => StripeError::Api {
                    code: None,
                    message: format!("payment failed ({status})"),
                },
            });
        }

        Ok(response.json::<PaymentIntent>().await?)
    }

    /// Verify a `Stripe-Signature` header against the raw body and parse the event.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidSignature` or `StripeError::StaleSignature`
    /// if verification fails, and `StripeError::Payload` if the body is not
    /// an event.
    pub fn construct_event(&self, payload: &[u8], header: &str) -> Result<WebhookEvent, StripeError> {
        verify_signature(
            payload,
            header,
            self.inner.webhook_secret.expose_secret(),
            Utc::now().timestamp(),
        )?;
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Lowercase ISO code to charge in.
fn charge_currency(currency: &str) -> String {
    let currency = currency.to_ascii_lowercase();
    if currency == "jod" { "usd".to_owned() } else { currency }
}

/// Check `t=<ts>,v1=<hex>[,v1=<hex>...]` against `HMAC-SHA256(secret, "{t}.{body}")`.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` if no `v1` signature matches and
/// `StripeError::StaleSignature` if the timestamp is too far from `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;
    if signatures.is_empty() || secret.is_empty() {
        return Err(StripeError::InvalidSignature);
    }

    let matched = signatures.iter().any(|signature| {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });
    if !matched {
        return Err(StripeError::InvalidSignature);
    }

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeError::StaleSignature);
    }
    Ok(())
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// `data.object.id`.
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(serde_json::Value::as_str)
    }

    /// Order referenced by `data.object.metadata.order_id`.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        let value = self.data.object.get("metadata")?.get("order_id")?;
        let id = match value {
            serde_json::Value::String(s) => s.trim().parse::<i32>().ok()?,
            serde_json::Value::Number(n) => i32::try_from(n.as_i64()?).ok()?,
            _ => return None,
        };
        Some(OrderId::new(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let header = format!("t=1700000000,v1={}", sign(body, 1_700_000_000, SECRET));
        assert!(verify_signature(body, &header, SECRET, 1_700_000_100).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let body = b"{}";
        let header = format!(
            "t=1700000000,v1={},v1={}",
            "00".repeat(32),
            sign(body, 1_700_000_000, SECRET)
        );
        assert!(verify_signature(body, &header, SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = format!("t=1700000000,v1={}", sign(b"{}", 1_700_000_000, SECRET));
        assert!(matches!(
            verify_signature(b"{ }", &header, SECRET, 1_700_000_000),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = format!("t=1700000000,v1={}", sign(b"{}", 1_700_000_000, "other"));
        assert!(verify_signature(b"{}", &header, SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = format!("t=1700000000,v1={}", sign(b"{}", 1_700_000_000, SECRET));
        assert!(matches!(
            verify_signature(b"{}", &header, SECRET, 1_700_000_301),
            Err(StripeError::StaleSignature)
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature(b"{}", "garbage", SECRET, 0).is_err());
        assert!(verify_signature(b"{}", "t=1,v1=zz", SECRET, 1).is_err());
        assert!(verify_signature(b"{}", "v1=00", SECRET, 0).is_err());
    }

    #[test]
    fn test_event_order_id() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"payment_intent.succeeded",
                "data":{"object":{"id":"pi_1","metadata":{"order_id":"42"}}}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.object_id(), Some("pi_1"));
        assert_eq!(event.order_id(), Some(OrderId::new(42)));

        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_2","type":"charge.dispute.created","data":{"object":{"id":"dp_1"}}}"#,
        )
        .unwrap();
        assert_eq!(event.order_id(), None);
    }

    #[test]
    fn test_charge_currency() {
        assert_eq!(charge_currency("JOD"), "usd");
        assert_eq!(charge_currency("EUR"), "eur");
    }
}

//! Integration tests for the Skinior API.
//!
//! The tests talk to a running server over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! skn-cli migrate && skn-cli seed
//! cargo run -p skinior-api &
//! cargo test -p skinior-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `SKINIOR_API_URL` - Server base URL (default `http://localhost:4008`)
//! - `SKINIOR_AGENT_API_KEY` - Key from `skn-cli agent create`, for agent tests
//! - `SKINIOR_ADMIN_EMAIL` / `SKINIOR_ADMIN_PASSWORD` - Account from
//!   `skn-cli admin create`, for admin tests
//! - `STRIPE_WEBHOOK_SECRET` - The server's webhook secret, for Stripe tests

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the API under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SKINIOR_API_URL").unwrap_or_else(|_| "http://localhost:4008".to_owned())
}

/// Absolute URL for `path`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url().trim_end_matches('/'))
}

/// A client that keeps the session cookie between requests.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// An email address no other test run has used.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@test.skinior.com", Uuid::new_v4().simple())
}

/// Register a new customer on `client`, leaving it logged in.
///
/// Returns the user JSON.
pub async fn register(client: &Client, email: &str, password: &str) -> Value {
    let resp = client
        .post(url("/api/auth/register"))
        .json(&json!({
            "email": email,
            "password": password,
            "first_name": "Test",
            "last_name": "Customer",
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("Invalid user JSON")
}

/// Log `client` in.
pub async fn login(client: &Client, email: &str, password: &str) -> StatusCode {
    client
        .post(url("/api/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in")
        .status()
}

/// The first in-stock product from the public catalog, if any.
pub async fn in_stock_product(client: &Client) -> Option<Value> {
    let page: Value = client
        .get(url("/api/products?in_stock=true&limit=20"))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Invalid product page");
    page["data"]
        .as_array()?
        .iter()
        .find(|p| p["stock_quantity"].as_i64().unwrap_or(0) > 0)
        .cloned()
}

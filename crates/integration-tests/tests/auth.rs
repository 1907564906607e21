//! Registration, login and session tests.
//!
//! Requires a running API server (`cargo run -p skinior-api`) with a migrated
//! database.

use reqwest::StatusCode;
use serde_json::{Value, json};
use skinior_integration_tests::{login, register, session_client, unique_email, url};

const PASSWORD: &str = "correct-horse-battery";

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_health() {
    let resp = reqwest::get(url("/health")).await.expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = reqwest::get(url("/health/ready")).await.expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_register_me_logout() {
    let client = session_client();
    let email = unique_email("register");

    let user = register(&client, &email, PASSWORD).await;
    assert_eq!(user["email"], email);
    assert_eq!(user["role"], "customer");
    assert!(user.get("password_hash").is_none());

    let me: Value = client
        .get(url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current user")
        .json()
        .await
        .expect("Invalid user JSON");
    assert_eq!(me["id"], user["id"]);

    let resp = client
        .post(url("/api/auth/logout"))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current user");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_duplicate_registration_conflicts() {
    let email = unique_email("dup");
    register(&session_client(), &email, PASSWORD).await;

    let resp = session_client()
        .post(url("/api/auth/register"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_login_rejects_wrong_password() {
    let email = unique_email("login");
    register(&session_client(), &email, PASSWORD).await;

    let client = session_client();
    assert_eq!(login(&client, &email, "not-the-password").await, StatusCode::UNAUTHORIZED);
    assert_eq!(login(&client, &email, PASSWORD).await, StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_short_password_rejected() {
    let resp = session_client()
        .post(url("/api/auth/register"))
        .json(&json!({ "email": unique_email("weak"), "password": "short" }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_customer_cannot_reach_admin() {
    let client = session_client();
    register(&client, &unique_email("nosy"), PASSWORD).await;

    let resp = client
        .get(url("/api/admin/analytics/overview"))
        .send()
        .await
        .expect("Failed to call admin route");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

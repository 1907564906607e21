//! Admin API tests.
//!
//! Requires a running API server and an admin account from
//! `skn-cli admin create`, passed as `SKINIOR_ADMIN_EMAIL` and
//! `SKINIOR_ADMIN_PASSWORD`.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use skinior_integration_tests::{login, session_client, url};
use uuid::Uuid;

async fn admin_client() -> Client {
    let email = std::env::var("SKINIOR_ADMIN_EMAIL").expect("SKINIOR_ADMIN_EMAIL not set");
    let password =
        std::env::var("SKINIOR_ADMIN_PASSWORD").expect("SKINIOR_ADMIN_PASSWORD not set");
    let client = session_client();
    assert_eq!(login(&client, &email, &password).await, StatusCode::OK);
    client
}

async fn get_json(client: &Client, path: &str) -> Value {
    let resp = client.get(url(path)).send().await.expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    resp.json().await.expect("Invalid JSON")
}

#[tokio::test]
#[ignore = "Requires running API server and admin credentials"]
async fn test_product_crud() {
    let client = admin_client().await;
    let sku = format!("IT-{}", Uuid::new_v4().simple());

    let resp = client
        .post(url("/api/admin/products"))
        .json(&json!({
            "title": "Integration Test Serum",
            "price": "19.99",
            "sku": sku,
            "stock_quantity": 5,
            "skin_types": ["oily"],
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Value = resp.json().await.expect("Invalid product JSON");
    assert!(
        product["slug"]
            .as_str()
            .is_some_and(|s| s.starts_with("integration-test-serum"))
    );

    // Same SKU again conflicts.
    let resp = client
        .post(url("/api/admin/products"))
        .json(&json!({ "title": "Copy", "price": "1.00", "sku": sku }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let id = &product["id"];
    let detail = get_json(&client, &format!("/api/admin/products/{id}")).await;
    assert_eq!(detail["sku"], sku);

    let resp = client
        .delete(url(&format!("/api/admin/products/{id}")))
        .send()
        .await
        .expect("Failed to delete product");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(url(&format!("/api/admin/products/{id}")))
        .send()
        .await
        .expect("Failed to get product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server and admin credentials"]
async fn test_import_requires_xlsx() {
    let client = admin_client().await;
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"title,price\nA,1\n".to_vec()).file_name("products.csv"),
    );

    let resp = client
        .post(url("/api/admin/products/import"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to upload");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and admin credentials"]
async fn test_dashboards() {
    let client = admin_client().await;

    let overview = get_json(&client, "/api/admin/analytics/overview").await;
    assert!(overview["products"].is_object());

    let revenue = get_json(&client, "/api/admin/analytics/revenue?period=30d").await;
    assert!(revenue.is_object());

    let inventory = get_json(&client, "/api/admin/analytics/inventory").await;
    assert!(inventory.is_object());

    let users = get_json(&client, "/api/admin/users?limit=5").await;
    assert!(users["data"].is_array());
}

#[tokio::test]
#[ignore = "Requires running API server and admin credentials"]
async fn test_agent_key_lifecycle() {
    let client = admin_client().await;

    let resp = client
        .post(url("/api/admin/agents"))
        .json(&json!({
            "name": "it-bot",
            "email": format!("it-bot-{}@test.skinior.com", Uuid::new_v4().simple()),
        }))
        .send()
        .await
        .expect("Failed to create agent");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let issued: Value = resp.json().await.expect("Invalid agent JSON");
    let key = issued["api_key"].as_str().expect("No api_key").to_owned();
    assert!(key.starts_with("sk_itbot_"));

    let resp = Client::new()
        .get(url("/api/rooms"))
        .header("x-api-key", &key)
        .send()
        .await
        .expect("Failed to list rooms");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .delete(url(&format!("/api/admin/agents/{}", issued["agent"]["id"])))
        .send()
        .await
        .expect("Failed to deactivate agent");
    assert!(resp.status().is_success());

    let resp = Client::new()
        .get(url("/api/rooms"))
        .header("x-api-key", &key)
        .send()
        .await
        .expect("Failed to list rooms");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

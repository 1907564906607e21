//! Treatment plan and consultation history tests.
//!
//! Requires a running API server.

use reqwest::StatusCode;
use serde_json::{Value, json};
use skinior_integration_tests::{register, session_client, unique_email, url};

const PASSWORD: &str = "correct-horse-battery";

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_treatment_lifecycle() {
    let client = session_client();
    register(&client, &unique_email("treatment"), PASSWORD).await;

    let resp = client
        .post(url("/api/treatments"))
        .json(&json!({
            "name": "Acne Treatment Plan",
            "start_date": "2026-01-05",
            "duration_weeks": 12,
            "milestones": ["Purge phase", "Clearer skin", "Maintenance"],
        }))
        .send()
        .await
        .expect("Failed to create treatment");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.expect("Invalid treatment JSON");
    assert_eq!(created["status"], "active");
    assert_eq!(created["progress_percent"], 0);
    assert_eq!(created["total_milestones"], 3);
    let weeks: Vec<_> = created["milestones"]
        .as_array()
        .expect("milestones")
        .iter()
        .map(|m| m["target_week"].as_i64())
        .collect();
    assert_eq!(weeks, [Some(4), Some(8), Some(12)]);

    let id = &created["id"];
    let first_milestone = &created["milestones"][0]["id"];
    let resp = client
        .patch(url(&format!("/api/treatments/{id}")))
        .json(&json!({ "complete_milestone_id": first_milestone }))
        .send()
        .await
        .expect("Failed to update treatment");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("Invalid treatment JSON");
    assert_eq!(updated["milestones_completed"], 1);
    assert_eq!(updated["progress_percent"], 33);
    assert_eq!(updated["milestones"][0]["completed"], true);

    let list: Value = client
        .get(url("/api/treatments"))
        .send()
        .await
        .expect("Failed to list treatments")
        .json()
        .await
        .expect("Invalid list JSON");
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    // Another account cannot see the plan.
    let other = session_client();
    register(&other, &unique_email("other"), PASSWORD).await;
    let resp = other
        .get(url(&format!("/api/treatments/{id}/milestones")))
        .send()
        .await
        .expect("Failed to get milestones");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .delete(url(&format!("/api/treatments/{id}")))
        .send()
        .await
        .expect("Failed to delete treatment");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_treatment_validation() {
    let client = session_client();
    register(&client, &unique_email("treatment-bad"), PASSWORD).await;

    let resp = client
        .post(url("/api/treatments"))
        .json(&json!({ "name": "Plan", "start_date": "2026-01-05", "duration_weeks": 0 }))
        .send()
        .await
        .expect("Failed to create treatment");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_new_account_has_no_consultations() {
    let client = session_client();
    register(&client, &unique_email("consult"), PASSWORD).await;

    let page: Value = client
        .get(url("/api/consultations?status=all&limit=10"))
        .send()
        .await
        .expect("Failed to list consultations")
        .json()
        .await
        .expect("Invalid consultation page");
    assert_eq!(page["consultations"].as_array().map(Vec::len), Some(0));
    assert_eq!(page["pagination"]["total"], 0);
    assert_eq!(page["pagination"]["has_more"], false);

    let resp = client
        .get(url("/api/consultations?limit=500"))
        .send()
        .await
        .expect("Failed to list consultations");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

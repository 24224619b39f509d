//! Tests for `POST /api/newsletter/subscribe`.

use std::time::Duration;

use anyhow::Result;
use newsletter_api::{
    model::{MemoryStore, SubscriptionStore},
    subscribe::{ValidEmail, SUBSCRIBE_CHANNEL},
};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::{RecordingPublisher, TestApp};

#[tokio::test]
async fn api_subscribe_created() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .post_subscribe(&json!({ "email": "  User@Example.COM " }))
        .await?;
    assert_eq!(
        res.status(),
        StatusCode::CREATED,
        "Wrong response StatusCode: {}",
        res.status()
    );

    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully subscribed to newsletter");
    assert_eq!(body["data"]["email"], "user@example.com");
    assert!(body["data"]["subscribedAt"].as_str().is_some());

    let email = ValidEmail::parse("user@example.com")?;
    let stored = app.store.find_by_email(&email).await?;
    assert!(stored.is_some_and(|s| s.is_active));

    assert_eq!(
        app.publisher.sent(),
        vec![(
            SUBSCRIBE_CHANNEL.to_string(),
            json!({ "email": "user@example.com" }).to_string()
        )]
    );

    Ok(())
}

#[tokio::test]
async fn api_subscribe_stores_preferences() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .post_subscribe(&json!({
            "email": "prefs@example.com",
            "preferences": { "frequency": "weekly", "topics": ["rust"] }
        }))
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let email = ValidEmail::parse("prefs@example.com")?;
    let stored = app
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("subscriber was not stored"))?;
    assert_eq!(stored.preferences["frequency"], "weekly");
    assert_eq!(stored.preferences["topics"], json!(["rust"]));

    Ok(())
}

#[tokio::test]
async fn api_subscribe_bad_request() -> Result<()> {
    let app = TestApp::spawn().await?;

    let tests = [
        (json!({}), "Email is required", "Empty json"),
        (json!({ "email": "" }), "Email is required", "Empty email"),
        (json!({ "email": "   " }), "Email is required", "Blank email"),
        (json!({ "email": null }), "Email is required", "Null email"),
        (
            json!({ "email": "not-an-email" }),
            "Invalid email format",
            "No at sign",
        ),
        (
            json!({ "email": "user@example" }),
            "Invalid email format",
            "No top level domain",
        ),
        (
            json!({ "email": format!("{}@example.com", "a".repeat(250)) }),
            "Invalid email format",
            "Too long",
        ),
        (
            json!({ "email": 42 }),
            "Invalid request body",
            "Email is not a string",
        ),
    ];

    for (json_request, expected_message, params) in tests {
        let res = app.post_subscribe(&json_request).await?;
        assert_eq!(
            res.status(),
            StatusCode::BAD_REQUEST,
            "Wrong response: ({}), Expected: ({}); for request with: {params}",
            res.status(),
            StatusCode::BAD_REQUEST
        );

        let body: Value = res.json().await?;
        assert_eq!(body["success"], false, "for request with: {params}");
        assert_eq!(body["message"], expected_message, "for request with: {params}");
    }

    assert!(app.store.is_empty().await);
    assert_eq!(app.store.calls(), 0);
    assert!(app.publisher.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn api_subscribe_malformed_body_is_bad_request() -> Result<()> {
    let app = TestApp::spawn().await?;

    let malformed = app
        .http_client
        .post(app.url("/api/newsletter/subscribe"))
        .header("content-type", "application/json")
        .body("{\"email\": ")
        .send()
        .await?;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let not_json = app
        .http_client
        .post(app.url("/api/newsletter/subscribe"))
        .header("content-type", "text/plain")
        .body("email=a@example.com")
        .send()
        .await?;
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);

    let body: Value = not_json.json().await?;
    assert_eq!(body["message"], "Invalid request body");

    Ok(())
}

#[tokio::test]
async fn api_subscribe_accepts_html_form_posts() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .http_client
        .post(app.url("/api/newsletter/subscribe"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("email=Form%40Example.com")
        .send()
        .await?;
    assert_eq!(
        res.status(),
        StatusCode::CREATED,
        "Wrong response StatusCode: {}",
        res.status()
    );

    let body: Value = res.json().await?;
    assert_eq!(body["data"]["email"], "form@example.com");
    assert_eq!(app.store.len().await, 1);

    let missing = app
        .http_client
        .post(app.url("/api/newsletter/subscribe"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=John")
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let body: Value = missing.json().await?;
    assert_eq!(body["message"], "Email is required");

    Ok(())
}

#[tokio::test]
async fn api_subscribe_twice_is_conflict() -> Result<()> {
    let app = TestApp::spawn().await?;

    let first = app.post_subscribe(&json!({ "email": "dup@example.com" })).await?;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .post_subscribe(&json!({ "email": " DUP@example.com" }))
        .await?;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let body: Value = second.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Email is already subscribed to the newsletter"
    );

    assert_eq!(app.store.len().await, 1);
    assert_eq!(app.publisher.sent().len(), 1);

    Ok(())
}

#[tokio::test]
async fn api_subscribe_concurrent_requests_create_one_record() -> Result<()> {
    let app = TestApp::spawn().await?;
    let body = json!({ "email": "race@example.com" });

    let mut set = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let client = app.http_client.clone();
        let url = app.url("/api/newsletter/subscribe");
        let body = body.clone();
        set.spawn(async move { client.post(url).json(&body).send().await });
    }

    let mut responses = Vec::new();
    while let Some(res) = set.join_next().await {
        responses.push(res??.status());
    }

    let created = responses
        .iter()
        .filter(|status| **status == StatusCode::CREATED)
        .count();
    let conflicts = responses
        .iter()
        .filter(|status| **status == StatusCode::CONFLICT)
        .count();

    assert_eq!(created, 1);
    assert_eq!(conflicts, responses.len() - 1);
    assert_eq!(app.store.len().await, 1);
    assert_eq!(app.publisher.sent().len(), 1);

    Ok(())
}

#[tokio::test]
async fn api_subscribe_succeeds_when_publisher_is_down() -> Result<()> {
    let app =
        TestApp::spawn_with(MemoryStore::new(), RecordingPublisher::failing(), false).await?;

    let res = app
        .post_subscribe(&json!({ "email": "quiet@example.com" }))
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(app.store.len().await, 1);

    Ok(())
}

#[tokio::test]
async fn api_subscribe_store_failure_is_internal_error() -> Result<()> {
    let store = MemoryStore::new();
    store.set_available(false);
    let app = TestApp::spawn_with(store, RecordingPublisher::default(), false).await?;

    let res = app
        .post_subscribe(&json!({ "email": "down@example.com" }))
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(body["error"], "Internal server error");
    assert!(app.publisher.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn api_subscribe_store_failure_exposes_detail_when_enabled() -> Result<()> {
    let store = MemoryStore::new();
    store.set_available(false);
    let app = TestApp::spawn_with(store, RecordingPublisher::default(), true).await?;

    let res = app
        .post_subscribe(&json!({ "email": "down@example.com" }))
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Internal server error");
    let detail = body["error"].as_str().unwrap_or_default();
    assert_ne!(detail, "Internal server error");
    assert!(!detail.is_empty());

    Ok(())
}

#[tokio::test]
async fn api_subscribe_slow_store_times_out() -> Result<()> {
    let store = MemoryStore::with_latency(Duration::from_secs(2));
    let app = TestApp::spawn_with(store, RecordingPublisher::default(), false).await?;

    let res = app
        .post_subscribe(&json!({ "email": "slow@example.com" }))
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.publisher.sent().is_empty());

    Ok(())
}

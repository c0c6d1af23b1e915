use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use leadkit_core::config::{AuthMode, Config};
use leadkit_duckdb::LeadStore;
use leadkit_server::app::build_app;
use leadkit_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/leadkit-test".to_string(),
        auth_mode: AuthMode::None,
        session_days: 7,
        argon2_memory_kb: 8,
        duckdb_memory_limit: "1GB".to_string(),
        cors_origins: vec![],
    }
}

async fn setup() -> axum::Router {
    let db = LeadStore::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    build_app(state)
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-organization-id", "org_test")
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .expect("build request")
}

async fn send(app: &axum::Router, req: Request<Body>) -> axum::http::Response<Body> {
    app.clone().oneshot(req).await.expect("request")
}

async fn create_campaign(app: &axum::Router) -> String {
    let response = send(
        app,
        request(
            "POST",
            "/api/campaigns",
            Some(json!({
                "name": "Spring launch",
                "subject": "We are live",
                "body": "Hello!",
                "channel": "email",
                "cost": 150.0,
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["data"]["id"]
        .as_str()
        .expect("campaign id")
        .to_string()
}

#[tokio::test]
async fn schedule_then_cancel() {
    let app = setup().await;
    let id = create_campaign(&app).await;

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/campaigns/{id}/schedule"),
            Some(json!({ "send_at": "2027-01-15 09:00:00" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "scheduled");
    assert!(body["data"]["scheduled_at"].is_string());

    let response = send(
        &app,
        request("POST", &format!("/api/campaigns/{id}/cancel-schedule"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "cancelled");

    // Cancelled campaigns cannot be sent.
    let response = send(
        &app,
        request("POST", &format!("/api/campaigns/{id}/send"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_snapshots_recipients_and_freezes_the_draft() {
    let app = setup().await;

    // Two sendable contacts and one inactive which must be skipped.
    for (email, status) in [
        ("a@example.com", "lead"),
        ("b@example.com", "active"),
        ("c@example.com", "inactive"),
    ] {
        let response = send(
            &app,
            request(
                "POST",
                "/api/contacts",
                Some(json!({ "email": email, "status": status })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let id = create_campaign(&app).await;
    let response = send(
        &app,
        request("POST", &format!("/api/campaigns/{id}/send"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "sent");
    assert_eq!(body["data"]["recipients_count"], 2);
    assert!(body["data"]["sent_at"].is_string());

    // No edits after send.
    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/api/campaigns/{id}"),
            Some(json!({ "subject": "Changed" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No double send.
    let response = send(
        &app,
        request("POST", &format!("/api/campaigns/{id}/send"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn engagement_counters_only_accumulate_on_sent_campaigns() {
    let app = setup().await;
    let id = create_campaign(&app).await;

    // Draft: engagement rejected.
    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/campaigns/{id}/engagement"),
            Some(json!({ "kind": "opened" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    send(
        &app,
        request("POST", &format!("/api/campaigns/{id}/send"), None),
    )
    .await;

    for kind in ["opened", "opened", "clicked"] {
        let response = send(
            &app,
            request(
                "POST",
                &format!("/api/campaigns/{id}/engagement"),
                Some(json!({ "kind": kind })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let body = json_body(send(&app, request("GET", &format!("/api/campaigns/{id}"), None)).await)
        .await;
    assert_eq!(body["data"]["opened_count"], 2);
    assert_eq!(body["data"]["clicked_count"], 1);

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/campaigns/{id}/engagement"),
            Some(json!({ "kind": "forwarded" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn negative_cost_is_rejected() {
    let app = setup().await;
    let response = send(
        &app,
        request(
            "POST",
            "/api/campaigns",
            Some(json!({
                "name": "Bad",
                "subject": "Bad",
                "body": "Bad",
                "cost": -5.0,
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

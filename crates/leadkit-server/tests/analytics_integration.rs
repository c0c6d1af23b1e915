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

#[tokio::test]
async fn overview_returns_all_five_report_groups() {
    let app = setup().await;

    send(
        &app,
        request(
            "POST",
            "/api/contacts",
            Some(json!({ "email": "lead@example.com", "source": "google" })),
        ),
    )
    .await;

    let response = send(&app, request("GET", "/api/analytics", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    for key in ["contacts", "deals", "email_campaigns", "funnel", "roi"] {
        assert!(body["data"].get(key).is_some(), "missing group {key}");
    }
    assert_eq!(body["data"]["contacts"]["summary"]["total_contacts"], 1);
    assert_eq!(body["data"]["funnel"]["funnel_name"], "marketing");
}

#[tokio::test]
async fn empty_tenant_reports_zeros_not_errors() {
    let app = setup().await;

    let response = send(&app, request("GET", "/api/analytics/funnel", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["overall_conversion"], 0.0);
    assert!(body["data"]["biggest_drop_stage"].is_null());
    for stage in body["data"]["stages"].as_array().expect("stages") {
        assert_eq!(stage["count"], 0);
        assert_eq!(stage["conversion_rate"], 0.0);
    }

    let response = send(&app, request("GET", "/api/analytics/roi", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["channels"].as_array().expect("channels").len(), 0);

    let response = send(&app, request("GET", "/api/analytics/deals", None)).await;
    let body = json_body(response).await;
    assert_eq!(body["data"]["velocity"]["sales_velocity_per_day"], 0.0);
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let app = setup().await;
    let response = send(
        &app,
        request(
            "GET",
            "/api/analytics/contacts?start_date=2026-05-10&end_date=2026-05-01",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn malformed_date_and_period_are_rejected() {
    let app = setup().await;

    let response = send(
        &app,
        request("GET", "/api/analytics/contacts?start_date=May-01", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        request("GET", "/api/analytics/contacts?period=fortnight", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_range_is_rejected() {
    let app = setup().await;
    let response = send(
        &app,
        request(
            "GET",
            "/api/analytics/contacts?start_date=2020-01-01&end_date=2026-01-01",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn funnel_selector_validates_pipeline_ids() {
    let app = setup().await;

    let response = send(
        &app,
        request("GET", "/api/analytics/funnel?funnel=pipeline:", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        request("GET", "/api/analytics/funnel?funnel=pipeline:p_missing", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recorded_events_feed_the_marketing_funnel() {
    let app = setup().await;

    for _ in 0..4 {
        let response = send(
            &app,
            request(
                "POST",
                "/api/analytics",
                Some(json!({ "event_type": "visit", "source": "google" })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    send(
        &app,
        request(
            "POST",
            "/api/contacts",
            Some(json!({ "email": "lead@example.com", "source": "google" })),
        ),
    )
    .await;

    let body = json_body(send(&app, request("GET", "/api/analytics/funnel", None)).await).await;
    let stages = body["data"]["stages"].as_array().expect("stages");
    assert_eq!(stages[0]["stage"], "visit");
    assert_eq!(stages[0]["count"], 4);
    assert_eq!(stages[0]["conversion_rate"], 100.0);
    assert_eq!(stages[1]["count"], 1);
    assert_eq!(stages[1]["conversion_rate"], 25.0);
}

#[tokio::test]
async fn event_with_unknown_contact_is_rejected() {
    let app = setup().await;
    let response = send(
        &app,
        request(
            "POST",
            "/api/analytics",
            Some(json!({ "event_type": "visit", "contact_id": "c_missing" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn organization_snapshot_counts_current_inventory() {
    let app = setup().await;
    for email in ["a@example.com", "b@example.com"] {
        send(
            &app,
            request("POST", "/api/contacts", Some(json!({ "email": email }))),
        )
        .await;
    }
    send(
        &app,
        request(
            "POST",
            "/api/forms",
            Some(json!({ "name": "Signup", "fields": [{ "name": "email", "label": "Email", "type": "email", "required": true }] })),
        ),
    )
    .await;

    let response = send(&app, request("GET", "/api/analytics/organization", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["contacts"], 2);
    assert_eq!(body["data"]["forms"], 1);
    assert_eq!(body["data"]["open_deals"], 0);
    assert_eq!(body["data"]["won_deal_value"], 0.0);
}

#[tokio::test]
async fn user_activity_groups_events_by_recording_user() {
    let app = setup().await;
    for _ in 0..3 {
        send(
            &app,
            request(
                "POST",
                "/api/analytics",
                Some(json!({ "event_type": "visit" })),
            ),
        )
        .await;
    }

    let response = send(&app, request("GET", "/api/analytics/user-activity", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let users = body["data"]["users"].as_array().expect("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["user_id"], "usr_dev");
    assert_eq!(users[0]["events"], 3);
    assert_eq!(users[0]["event_types"], 1);
}

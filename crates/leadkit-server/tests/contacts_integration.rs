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

async fn create_contact(app: &axum::Router, email: &str) -> String {
    let response = send(
        app,
        request("POST", "/api/contacts", Some(json!({ "email": email }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["data"]["id"]
        .as_str()
        .expect("contact id")
        .to_string()
}

#[tokio::test]
async fn crud_round_trip() {
    let app = setup().await;
    let id = create_contact(&app, "lead@example.com").await;

    let response = send(&app, request("GET", &format!("/api/contacts/{id}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["email"], "lead@example.com");
    assert_eq!(body["data"]["status"], "lead");

    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/api/contacts/{id}"),
            Some(json!({ "first_name": "Grace", "status": "active" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["first_name"], "Grace");
    assert_eq!(body["data"]["status"], "active");

    let response = send(&app, request("DELETE", &format!("/api/contacts/{id}"), None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, request("GET", &format!("/api/contacts/{id}"), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = setup().await;
    let response = send(
        &app,
        request("POST", "/api/contacts", Some(json!({ "email": "nope" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn duplicate_email_within_org_is_rejected() {
    let app = setup().await;
    create_contact(&app, "lead@example.com").await;

    let response = send(
        &app,
        request(
            "POST",
            "/api/contacts",
            Some(json!({ "email": "lead@example.com" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pagination_is_stable_across_identical_requests() {
    let app = setup().await;
    for i in 0..5 {
        create_contact(&app, &format!("lead{i}@example.com")).await;
    }

    let uri = "/api/contacts?limit=2&page=1&order_by=created_at&order=asc";
    let first = json_body(send(&app, request("GET", uri, None)).await).await;
    let second = json_body(send(&app, request("GET", uri, None)).await).await;
    assert_eq!(first, second);

    assert_eq!(first["data"].as_array().expect("array").len(), 2);
    assert_eq!(first["pagination"]["total"], 5);
    assert_eq!(first["pagination"]["pages"], 3);

    // Last page holds the remainder.
    let last = json_body(
        send(
            &app,
            request(
                "GET",
                "/api/contacts?limit=2&page=3&order_by=created_at&order=asc",
                None,
            ),
        )
        .await,
    )
    .await;
    assert_eq!(last["data"].as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn unknown_order_column_is_rejected() {
    let app = setup().await;
    let response = send(
        &app,
        request("GET", "/api/contacts?order_by=password_hash", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_filter_narrows_the_list() {
    let app = setup().await;
    let id = create_contact(&app, "one@example.com").await;
    create_contact(&app, "two@example.com").await;

    send(
        &app,
        request(
            "PATCH",
            &format!("/api/contacts/{id}"),
            Some(json!({ "status": "active" })),
        ),
    )
    .await;

    let body = json_body(send(&app, request("GET", "/api/contacts?status=active", None)).await).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["email"], "one@example.com");

    let response = send(&app, request("GET", "/api/contacts?status=vip", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tags_are_deduplicated_and_sorted() {
    let app = setup().await;
    let id = create_contact(&app, "lead@example.com").await;

    for tag in ["vip", "newsletter", "vip"] {
        let response = send(
            &app,
            request(
                "POST",
                &format!("/api/contacts/{id}/tags"),
                Some(json!({ "tag": tag })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body = json_body(
        send(&app, request("GET", &format!("/api/contacts/{id}/tags"), None)).await,
    )
    .await;
    assert_eq!(body["data"], json!(["newsletter", "vip"]));
}

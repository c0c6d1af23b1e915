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
        auth_mode: AuthMode::Local,
        session_days: 7,
        // Low argon2 memory keeps hashing fast in tests.
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

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

async fn register(app: &axum::Router, org: &str, email: &str) -> Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            json!({
                "organization_name": org,
                "email": email,
                "name": "Ada",
                "password": "correct-horse-battery",
            }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn register_returns_token_and_admin_user() {
    let app = setup().await;
    let body = register(&app, "Acme", "ada@acme.test").await;

    assert!(body["data"]["token"].is_string());
    assert!(body["data"]["expires_at"].is_string());
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert_eq!(body["data"]["user"]["email"], "ada@acme.test");
    // The password hash must never leave the server.
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn login_and_me_round_trip() {
    let app = setup().await;
    register(&app, "Acme", "ada@acme.test").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "ada@acme.test", "password": "correct-horse-battery" }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["user"]["email"], "ada@acme.test");
    assert_eq!(body["data"]["organization"]["name"], "Acme");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = setup().await;
    register(&app, "Acme", "ada@acme.test").await;

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "ada@acme.test", "password": "not-the-password-at-all" }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn unknown_email_is_unauthorized_not_not_found() {
    let app = setup().await;

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "ghost@acme.test", "password": "correct-horse-battery" }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = setup().await;
    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            json!({
                "organization_name": "Acme",
                "email": "ada@acme.test",
                "name": "Ada",
                "password": "short",
            }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = setup().await;
    register(&app, "Acme", "ada@acme.test").await;

    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            json!({
                "organization_name": "Other Corp",
                "email": "ada@acme.test",
                "name": "Ada",
                "password": "correct-horse-battery",
            }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = setup().await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/contacts")
        .body(Body::empty())
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("GET")
        .uri("/api/contacts")
        .header("authorization", "Bearer not-a-real-token")
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

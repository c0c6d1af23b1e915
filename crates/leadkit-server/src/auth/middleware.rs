use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use leadkit_core::config::AuthMode;
use leadkit_core::domain::UserRole;

use crate::state::AppState;

use super::jwt::decode_jwt;

/// Auth context injected into request extensions after successful auth.
///
/// Every protected handler reads the tenant key from here and nowhere else,
/// so a request can never act on an organization its token was not minted
/// for.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub organization_id: String,
    pub role: UserRole,
}

/// Require authentication via Bearer session JWT.
///
/// In `none` mode identity is read from unsigned `x-user-id` /
/// `x-organization-id` / `x-role` headers instead. That mode is for tests
/// and local development only.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = match &state.config.auth_mode {
        AuthMode::None => match header_identity(&request) {
            Some(ctx) => ctx,
            None => return unauthorized_response(),
        },
        AuthMode::Local => {
            let token = match bearer_token(&request) {
                Some(t) => t,
                None => return unauthorized_response(),
            };
            let secret = match state.db.jwt_secret().await {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load JWT secret");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };
            match decode_jwt(&token, &secret) {
                Ok(claims) => AuthContext {
                    user_id: claims.sub,
                    organization_id: claims.org,
                    role: UserRole::parse(&claims.role),
                },
                Err(_) => return unauthorized_response(),
            }
        }
    };

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn header_identity(request: &Request) -> Option<AuthContext> {
    let headers = request.headers();
    let org = headers.get("x-organization-id")?.to_str().ok()?.to_string();
    let user = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("usr_dev")
        .to_string();
    let role = headers
        .get("x-role")
        .and_then(|v| v.to_str().ok())
        .map(UserRole::parse)
        .unwrap_or_default();
    Some(AuthContext {
        user_id: user,
        organization_id: org,
        role,
    })
}

pub fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "code": "unauthorized",
                "message": "Unauthorized",
                "field": null
            }
        })),
    )
        .into_response()
}

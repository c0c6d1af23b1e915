use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::{User, UserRole};

use crate::{error::AppError, state::AppState};

use super::jwt::encode_jwt;
use super::middleware::AuthContext;
use super::password::{hash_password, validate_password_strength, verify_password};

// ---------------------------------------------------------------------------
// POST /api/auth/register
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub organization_name: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

/// `POST /api/auth/register` — Create an organization plus its first admin
/// user, and return a session token.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_password_strength(&req.password).map_err(|e| AppError::BadRequest(e.to_string()))?;

    if state.db.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::BadRequest(
            "email is already registered".to_string(),
        ));
    }

    let hash = hash_password(&req.password, state.config.argon2_memory_kb)?;
    let org = state.db.create_organization(&req.organization_name).await?;
    let user = state
        .db
        .create_user(&org.id, &req.email, &req.name, UserRole::Admin, &hash)
        .await?;

    let session = mint_session(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": session }))))
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/login` — Exchange email + password for a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .find_user_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let session = mint_session(&state, &user).await?;
    Ok(Json(json!({ "data": session })))
}

// ---------------------------------------------------------------------------
// GET /api/auth/me
// ---------------------------------------------------------------------------

/// `GET /api/auth/me` — The authenticated user and their organization.
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .get_user(&auth.organization_id, &auth.user_id)
        .await?;
    let org = state.db.get_organization(&auth.organization_id).await?;
    Ok(Json(json!({ "data": { "user": user, "organization": org } })))
}

async fn mint_session(state: &AppState, user: &User) -> Result<serde_json::Value, AppError> {
    let secret = state.db.jwt_secret().await?;
    let (token, expires_at) = encode_jwt(
        &secret,
        &user.id,
        &user.organization_id,
        user.role.as_str(),
        state.config.session_days,
    )?;
    Ok(json!({
        "token": token,
        "expires_at": expires_at,
        "user": user,
    }))
}

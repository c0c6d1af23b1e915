use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::UserRole;

use crate::{auth::AuthContext, error::AppError, state::AppState};

/// `GET /api/organization`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let org = state.db.get_organization(&auth.organization_id).await?;
    Ok(Json(json!({ "data": org })))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// `PATCH /api/organization` — admins only.
pub async fn rename(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse, AppError> {
    if auth.role != UserRole::Admin {
        return Err(AppError::Forbidden);
    }
    let org = state
        .db
        .rename_organization(&auth.organization_id, &req.name)
        .await?;
    Ok(Json(json!({ "data": org })))
}

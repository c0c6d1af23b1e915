use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::CreatePipelineRequest;

use crate::{auth::AuthContext, error::AppError, state::AppState};

/// `POST /api/pipelines`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePipelineRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pipeline = state.db.create_pipeline(&auth.organization_id, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": pipeline }))))
}

/// `GET /api/pipelines`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let pipelines = state.db.list_pipelines(&auth.organization_id).await?;
    Ok(Json(json!({ "data": pipelines })))
}

/// `GET /api/pipelines/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let pipeline = state.db.get_pipeline(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": pipeline })))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// `PATCH /api/pipelines/{id}`
pub async fn rename(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pipeline = state
        .db
        .rename_pipeline(&auth.organization_id, &id, &req.name)
        .await?;
    Ok(Json(json!({ "data": pipeline })))
}

/// `DELETE /api/pipelines/{id}` — refused while the pipeline still has deals.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_pipeline(&auth.organization_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

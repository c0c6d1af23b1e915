use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::{CreateWorkflowRequest, UpdateWorkflowRequest};

use crate::{auth::AuthContext, error::AppError, routes::PageQuery, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListWorkflowsQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub active: Option<String>,
}

fn parse_active(raw: Option<&str>) -> Result<Option<bool>, AppError> {
    match raw {
        None | Some("") => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(_) => Err(AppError::BadRequest(
            "active must be 'true' or 'false'".to_string(),
        )),
    }
}

/// `POST /api/workflows` — created inactive.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateWorkflowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let workflow = state.db.create_workflow(&auth.organization_id, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": workflow }))))
}

/// `GET /api/workflows`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListWorkflowsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .db
        .list_workflows(
            &auth.organization_id,
            parse_active(query.active.as_deref())?,
            &query.page.to_request()?,
        )
        .await?;
    Ok(Json(
        json!({ "data": page.data, "pagination": page.pagination }),
    ))
}

/// `GET /api/workflows/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let workflow = state.db.get_workflow(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": workflow })))
}

/// `PATCH /api/workflows/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateWorkflowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let workflow = state
        .db
        .update_workflow(&auth.organization_id, &id, req)
        .await?;
    Ok(Json(json!({ "data": workflow })))
}

/// `POST /api/workflows/{id}/activate` — idempotent; `changed` reports
/// whether a write happened.
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .set_workflow_active(&auth.organization_id, &id, true)
        .await?;
    Ok(Json(json!({ "data": result })))
}

/// `POST /api/workflows/{id}/deactivate`
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .set_workflow_active(&auth.organization_id, &id, false)
        .await?;
    Ok(Json(json!({ "data": result })))
}

/// `DELETE /api/workflows/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_workflow(&auth.organization_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

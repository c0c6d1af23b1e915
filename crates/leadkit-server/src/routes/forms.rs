use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use leadkit_core::domain::{CreateFormRequest, UpdateFormRequest};

use crate::{auth::AuthContext, error::AppError, routes::PageQuery, state::AppState};

/// `POST /api/forms`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    let form = state.db.create_form(&auth.organization_id, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": form }))))
}

/// `GET /api/forms`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .db
        .list_forms(&auth.organization_id, &query.to_request()?)
        .await?;
    Ok(Json(
        json!({ "data": page.data, "pagination": page.pagination }),
    ))
}

/// `GET /api/forms/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let form = state.db.get_form(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": form })))
}

/// `PATCH /api/forms/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    let form = state.db.update_form(&auth.organization_id, &id, req).await?;
    Ok(Json(json!({ "data": form })))
}

/// `POST /api/forms/{id}/submissions` — authenticated submission.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let submission = state
        .db
        .submit_form(&auth.organization_id, &id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": submission }))))
}

/// `POST /api/public/orgs/{org_id}/forms/{form_id}/submissions`
///
/// Public, unauthenticated endpoint for embedded forms. The organization id
/// is part of the embed URL; an unknown pair 404s like any other miss.
pub async fn submit_public(
    State(state): State<Arc<AppState>>,
    Path((org_id, form_id)): Path<(String, String)>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let submission = state.db.submit_form(&org_id, &form_id, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": submission }))))
}

/// `GET /api/forms/{id}/submissions` — newest first.
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = state
        .db
        .list_form_submissions(&auth.organization_id, &id)
        .await?;
    Ok(Json(json!({ "data": submissions })))
}

/// `DELETE /api/forms/{id}` — cascades to submissions.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_form(&auth.organization_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::{ContactStatus, CreateContactRequest, UpdateContactRequest};
use leadkit_duckdb::ContactFilter;

use crate::{auth::AuthContext, error::AppError, routes::PageQuery, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub status: Option<String>,
    pub source: Option<String>,
}

/// `POST /api/contacts`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let contact = state.db.create_contact(&auth.organization_id, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": contact }))))
}

/// `GET /api/contacts`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListContactsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query
        .status
        .as_deref()
        .map(ContactStatus::parse)
        .transpose()?;
    let filter = ContactFilter {
        status,
        source: query.source,
    };
    let page = state
        .db
        .list_contacts(&auth.organization_id, &filter, &query.page.to_request()?)
        .await?;
    Ok(Json(
        json!({ "data": page.data, "pagination": page.pagination }),
    ))
}

/// `GET /api/contacts/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let contact = state.db.get_contact(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": contact })))
}

/// `PATCH /api/contacts/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let contact = state
        .db
        .update_contact(&auth.organization_id, &id, req)
        .await?;
    Ok(Json(json!({ "data": contact })))
}

/// `DELETE /api/contacts/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_contact(&auth.organization_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag: String,
}

/// `POST /api/contacts/{id}/tags`
pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<TagRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .tag_contact(&auth.organization_id, &id, &req.tag)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": { "ok": true } }))))
}

/// `GET /api/contacts/{id}/tags`
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tags = state.db.contact_tags(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": tags })))
}

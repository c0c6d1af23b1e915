use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::{CreateDealRequest, DealStatus, UpdateDealRequest};
use leadkit_duckdb::DealFilter;

use crate::{auth::AuthContext, error::AppError, routes::PageQuery, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListDealsQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub status: Option<String>,
    pub pipeline_id: Option<String>,
}

/// `POST /api/deals`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateDealRequest>,
) -> Result<impl IntoResponse, AppError> {
    let deal = state.db.create_deal(&auth.organization_id, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": deal }))))
}

/// `GET /api/deals`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListDealsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query.status.as_deref().map(DealStatus::parse).transpose()?;
    let filter = DealFilter {
        status,
        pipeline_id: query.pipeline_id,
    };
    let page = state
        .db
        .list_deals(&auth.organization_id, &filter, &query.page.to_request()?)
        .await?;
    Ok(Json(
        json!({ "data": page.data, "pagination": page.pagination }),
    ))
}

/// `GET /api/deals/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deal = state.db.get_deal(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": deal })))
}

/// `PATCH /api/deals/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDealRequest>,
) -> Result<impl IntoResponse, AppError> {
    let deal = state.db.update_deal(&auth.organization_id, &id, req).await?;
    Ok(Json(json!({ "data": deal })))
}

#[derive(Debug, Deserialize)]
pub struct MoveStageRequest {
    pub stage_id: String,
}

/// `POST /api/deals/{id}/move-stage` — appends to the stage history.
pub async fn move_stage(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<MoveStageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let deal = state
        .db
        .move_deal_stage(&auth.organization_id, &id, &req.stage_id)
        .await?;
    Ok(Json(json!({ "data": deal })))
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub outcome: DealStatus,
}

/// `POST /api/deals/{id}/close` — outcome must be `won` or `lost`.
pub async fn close(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<CloseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let deal = state
        .db
        .close_deal(&auth.organization_id, &id, req.outcome)
        .await?;
    Ok(Json(json!({ "data": deal })))
}

/// `DELETE /api/deals/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_deal(&auth.organization_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

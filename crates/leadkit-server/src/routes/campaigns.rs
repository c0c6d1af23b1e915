use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::{CampaignStatus, CreateCampaignRequest, UpdateCampaignRequest};
use leadkit_duckdb::EngagementKind;

use crate::{auth::AuthContext, error::AppError, routes::PageQuery, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub status: Option<String>,
}

/// `POST /api/campaigns`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state.db.create_campaign(&auth.organization_id, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": campaign }))))
}

/// `GET /api/campaigns`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query
        .status
        .as_deref()
        .map(CampaignStatus::parse)
        .transpose()?;
    let page = state
        .db
        .list_campaigns(&auth.organization_id, status, &query.page.to_request()?)
        .await?;
    Ok(Json(
        json!({ "data": page.data, "pagination": page.pagination }),
    ))
}

/// `GET /api/campaigns/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state.db.get_campaign(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": campaign })))
}

/// `PATCH /api/campaigns/{id}` — drafts only.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state
        .db
        .update_campaign(&auth.organization_id, &id, req)
        .await?;
    Ok(Json(json!({ "data": campaign })))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub send_at: String,
}

/// `POST /api/campaigns/{id}/schedule`
pub async fn schedule(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state
        .db
        .schedule_campaign(&auth.organization_id, &id, &req.send_at)
        .await?;
    Ok(Json(json!({ "data": campaign })))
}

/// `POST /api/campaigns/{id}/cancel-schedule`
pub async fn cancel_schedule(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state
        .db
        .cancel_campaign_schedule(&auth.organization_id, &id)
        .await?;
    Ok(Json(json!({ "data": campaign })))
}

/// `POST /api/campaigns/{id}/send` — snapshots today's non-inactive contacts
/// as recipients and stamps `sent_at`.
pub async fn send(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state.db.send_campaign(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": campaign })))
}

#[derive(Debug, Deserialize)]
pub struct EngagementRequest {
    pub kind: String,
}

/// `POST /api/campaigns/{id}/engagement` — bump one engagement counter.
pub async fn record_engagement(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<EngagementRequest>,
) -> Result<impl IntoResponse, AppError> {
    let kind = match req.kind.as_str() {
        "opened" => EngagementKind::Opened,
        "clicked" => EngagementKind::Clicked,
        "bounced" => EngagementKind::Bounced,
        "unsubscribed" => EngagementKind::Unsubscribed,
        other => {
            return Err(AppError::BadRequest(format!(
                "unknown engagement kind '{other}'"
            )))
        }
    };
    let campaign = state
        .db
        .record_campaign_engagement(&auth.organization_id, &id, kind)
        .await?;
    Ok(Json(json!({ "data": campaign })))
}

/// `DELETE /api/campaigns/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_campaign(&auth.organization_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

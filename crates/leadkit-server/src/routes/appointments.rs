use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::{
    AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};

use crate::{auth::AuthContext, error::AppError, routes::PageQuery, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub status: Option<String>,
    pub contact_id: Option<String>,
}

/// `POST /api/appointments`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let appt = state
        .db
        .create_appointment(&auth.organization_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": appt }))))
}

/// `GET /api/appointments`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query
        .status
        .as_deref()
        .map(AppointmentStatus::parse)
        .transpose()?;
    let page = state
        .db
        .list_appointments(
            &auth.organization_id,
            status,
            query.contact_id.clone(),
            &query.page.to_request()?,
        )
        .await?;
    Ok(Json(
        json!({ "data": page.data, "pagination": page.pagination }),
    ))
}

/// `GET /api/appointments/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let appt = state.db.get_appointment(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": appt })))
}

/// `PATCH /api/appointments/{id}` — rejected once terminal.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let appt = state
        .db
        .update_appointment(&auth.organization_id, &id, req)
        .await?;
    Ok(Json(json!({ "data": appt })))
}

/// `POST /api/appointments/{id}/confirm` — scheduled only.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let appt = state
        .db
        .confirm_appointment(&auth.organization_id, &id)
        .await?;
    Ok(Json(json!({ "data": appt })))
}

/// `POST /api/appointments/{id}/cancel` — any non-terminal state.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let appt = state
        .db
        .cancel_appointment(&auth.organization_id, &id)
        .await?;
    Ok(Json(json!({ "data": appt })))
}

/// `POST /api/appointments/{id}/complete` — blocked once cancelled or
/// already completed.
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let appt = state
        .db
        .complete_appointment(&auth.organization_id, &id)
        .await?;
    Ok(Json(json!({ "data": appt })))
}

/// `DELETE /api/appointments/{id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .delete_appointment(&auth.organization_id, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

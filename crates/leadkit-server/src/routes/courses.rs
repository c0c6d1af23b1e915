use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::domain::{CourseStatus, CreateCourseRequest, UpdateCourseRequest};

use crate::{auth::AuthContext, error::AppError, routes::PageQuery, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListCoursesQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    pub status: Option<String>,
}

/// `POST /api/courses` — starts as a draft.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let course = state.db.create_course(&auth.organization_id, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": course }))))
}

/// `GET /api/courses`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListCoursesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query
        .status
        .as_deref()
        .map(CourseStatus::parse)
        .transpose()?;
    let page = state
        .db
        .list_courses(&auth.organization_id, status, &query.page.to_request()?)
        .await?;
    Ok(Json(
        json!({ "data": page.data, "pagination": page.pagination }),
    ))
}

/// `GET /api/courses/{id}`
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let course = state.db.get_course(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": course })))
}

/// `PATCH /api/courses/{id}` — archived courses are read-only.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let course = state
        .db
        .update_course(&auth.organization_id, &id, req)
        .await?;
    Ok(Json(json!({ "data": course })))
}

/// `POST /api/courses/{id}/publish` — draft only.
pub async fn publish(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let course = state.db.publish_course(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": course })))
}

/// `POST /api/courses/{id}/archive` — published only.
pub async fn archive(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let course = state.db.archive_course(&auth.organization_id, &id).await?;
    Ok(Json(json!({ "data": course })))
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub contact_id: String,
}

/// `POST /api/courses/{id}/enrollments` — published courses only; a contact
/// can enroll once.
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .enroll_contact(&auth.organization_id, &id, &req.contact_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": { "enrolled": true } })),
    ))
}

/// `GET /api/courses/{id}/enrollments`
pub async fn enrollment_count(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let count = state
        .db
        .course_enrollment_count(&auth.organization_id, &id)
        .await?;
    Ok(Json(json!({ "data": { "count": count } })))
}

/// `DELETE /api/courses/{id}` — cascades to enrollments.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete_course(&auth.organization_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

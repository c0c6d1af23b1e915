use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use leadkit_core::analytics::{DateRange, FunnelSelector, Period};
use leadkit_core::domain::RecordEventRequest;

use crate::{auth::AuthContext, error::AppError, state::AppState};

/// Shared query parameters for the reporting endpoints. Unknown values are
/// rejected at parse time; the SQL layer only ever sees validated enums.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub period: Option<String>,
    pub source: Option<String>,
    pub pipeline_id: Option<String>,
    pub funnel: Option<String>,
}

impl AnalyticsQuery {
    fn range(&self) -> Result<DateRange, AppError> {
        let today = chrono::Utc::now().date_naive();
        Ok(DateRange::resolve(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            today,
        )?)
    }

    fn period(&self) -> Result<Period, AppError> {
        Ok(Period::parse(self.period.as_deref())?)
    }
}

/// `GET /api/analytics` — one-call overview; the five report groups are
/// gathered concurrently.
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = query.range()?;
    let period = query.period()?;
    let selector = FunnelSelector::parse(query.funnel.as_deref())?;
    let org = auth.organization_id.as_str();

    let (contacts, deals, campaigns, funnel, roi) = tokio::join!(
        state
            .db
            .contact_stats(org, &range, period, query.source.as_deref()),
        state
            .db
            .deal_stats(org, &range, period, query.pipeline_id.as_deref()),
        state.db.campaign_stats(org, &range, period),
        state.db.funnel_stats(org, &range, &selector),
        state.db.roi_stats(org, &range),
    );

    Ok(Json(json!({
        "data": {
            "contacts": contacts?,
            "deals": deals?,
            "email_campaigns": campaigns?,
            "funnel": funnel?,
            "roi": roi?,
        }
    })))
}

/// `GET /api/analytics/contacts`
pub async fn contacts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .db
        .contact_stats(
            &auth.organization_id,
            &query.range()?,
            query.period()?,
            query.source.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "data": stats })))
}

/// `GET /api/analytics/deals`
pub async fn deals(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .db
        .deal_stats(
            &auth.organization_id,
            &query.range()?,
            query.period()?,
            query.pipeline_id.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "data": stats })))
}

/// `GET /api/analytics/email-campaigns`
pub async fn email_campaigns(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .db
        .campaign_stats(&auth.organization_id, &query.range()?, query.period()?)
        .await?;
    Ok(Json(json!({ "data": stats })))
}

/// `GET /api/analytics/funnel` — `funnel=marketing` (default) or
/// `funnel=pipeline:{id}`.
pub async fn funnel(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let selector = FunnelSelector::parse(query.funnel.as_deref())?;
    let stats = state
        .db
        .funnel_stats(&auth.organization_id, &query.range()?, &selector)
        .await?;
    Ok(Json(json!({ "data": stats })))
}

/// `GET /api/analytics/roi`
pub async fn roi(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .db
        .roi_stats(&auth.organization_id, &query.range()?)
        .await?;
    Ok(Json(json!({ "data": stats })))
}

/// `GET /api/analytics/organization` — whole-tenant inventory snapshot.
pub async fn organization(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.db.organization_stats(&auth.organization_id).await?;
    Ok(Json(json!({ "data": stats })))
}

/// `GET /api/analytics/user-activity` — per-user event counts in range.
pub async fn user_activity(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .db
        .user_activity_stats(&auth.organization_id, &query.range()?)
        .await?;
    Ok(Json(json!({ "data": stats })))
}

/// `POST /api/analytics` — record a raw event for attribution.
pub async fn record_event(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RecordEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event = state
        .db
        .record_event(&auth.organization_id, Some(&auth.user_id), req)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": event }))))
}

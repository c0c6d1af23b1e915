use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Two sub-routers are merged: a public one (health, register/login, embedded
/// form submission) and a protected one behind `require_auth`, which injects
/// the tenant-scoped [`auth::AuthContext`] every handler reads.
///
/// Middleware is applied outer-to-inner:
///
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — origins from config, or permissive when none are set;
///    embedded forms post from third-party pages and browsers need the
///    headers.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = if state.config.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let public = Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/auth/register", post(auth::handlers::register))
        .route("/api/auth/login", post(auth::handlers::login))
        .route(
            "/api/public/orgs/{org_id}/forms/{form_id}/submissions",
            post(routes::forms::submit_public),
        );

    let protected = Router::new()
        .route("/api/auth/me", get(auth::handlers::me))
        .route(
            "/api/organization",
            get(routes::organization::get_one).patch(routes::organization::rename),
        )
        // Contacts
        .route(
            "/api/contacts",
            get(routes::contacts::list).post(routes::contacts::create),
        )
        .route(
            "/api/contacts/{id}",
            get(routes::contacts::get_one)
                .patch(routes::contacts::update)
                .delete(routes::contacts::delete),
        )
        .route(
            "/api/contacts/{id}/tags",
            get(routes::contacts::list_tags).post(routes::contacts::add_tag),
        )
        // Pipelines
        .route(
            "/api/pipelines",
            get(routes::pipelines::list).post(routes::pipelines::create),
        )
        .route(
            "/api/pipelines/{id}",
            get(routes::pipelines::get_one)
                .patch(routes::pipelines::rename)
                .delete(routes::pipelines::delete),
        )
        // Deals
        .route(
            "/api/deals",
            get(routes::deals::list).post(routes::deals::create),
        )
        .route(
            "/api/deals/{id}",
            get(routes::deals::get_one)
                .patch(routes::deals::update)
                .delete(routes::deals::delete),
        )
        .route("/api/deals/{id}/move-stage", post(routes::deals::move_stage))
        .route("/api/deals/{id}/close", post(routes::deals::close))
        // Email campaigns
        .route(
            "/api/campaigns",
            get(routes::campaigns::list).post(routes::campaigns::create),
        )
        .route(
            "/api/campaigns/{id}",
            get(routes::campaigns::get_one)
                .patch(routes::campaigns::update)
                .delete(routes::campaigns::delete),
        )
        .route(
            "/api/campaigns/{id}/schedule",
            post(routes::campaigns::schedule),
        )
        .route(
            "/api/campaigns/{id}/cancel-schedule",
            post(routes::campaigns::cancel_schedule),
        )
        .route("/api/campaigns/{id}/send", post(routes::campaigns::send))
        .route(
            "/api/campaigns/{id}/engagement",
            post(routes::campaigns::record_engagement),
        )
        // Forms
        .route(
            "/api/forms",
            get(routes::forms::list).post(routes::forms::create),
        )
        .route(
            "/api/forms/{id}",
            get(routes::forms::get_one)
                .patch(routes::forms::update)
                .delete(routes::forms::delete),
        )
        .route(
            "/api/forms/{id}/submissions",
            get(routes::forms::list_submissions).post(routes::forms::submit),
        )
        // Workflows
        .route(
            "/api/workflows",
            get(routes::workflows::list).post(routes::workflows::create),
        )
        .route(
            "/api/workflows/{id}",
            get(routes::workflows::get_one)
                .patch(routes::workflows::update)
                .delete(routes::workflows::delete),
        )
        .route(
            "/api/workflows/{id}/activate",
            post(routes::workflows::activate),
        )
        .route(
            "/api/workflows/{id}/deactivate",
            post(routes::workflows::deactivate),
        )
        // Appointments
        .route(
            "/api/appointments",
            get(routes::appointments::list).post(routes::appointments::create),
        )
        .route(
            "/api/appointments/{id}",
            get(routes::appointments::get_one)
                .patch(routes::appointments::update)
                .delete(routes::appointments::delete),
        )
        .route(
            "/api/appointments/{id}/confirm",
            post(routes::appointments::confirm),
        )
        .route(
            "/api/appointments/{id}/cancel",
            post(routes::appointments::cancel),
        )
        .route(
            "/api/appointments/{id}/complete",
            post(routes::appointments::complete),
        )
        // Courses
        .route(
            "/api/courses",
            get(routes::courses::list).post(routes::courses::create),
        )
        .route(
            "/api/courses/{id}",
            get(routes::courses::get_one)
                .patch(routes::courses::update)
                .delete(routes::courses::delete),
        )
        .route("/api/courses/{id}/publish", post(routes::courses::publish))
        .route("/api/courses/{id}/archive", post(routes::courses::archive))
        .route(
            "/api/courses/{id}/enrollments",
            get(routes::courses::enrollment_count).post(routes::courses::enroll),
        )
        // Analytics
        .route(
            "/api/analytics",
            get(routes::analytics::overview).post(routes::analytics::record_event),
        )
        .route("/api/analytics/contacts", get(routes::analytics::contacts))
        .route("/api/analytics/deals", get(routes::analytics::deals))
        .route(
            "/api/analytics/email-campaigns",
            get(routes::analytics::email_campaigns),
        )
        .route("/api/analytics/funnel", get(routes::analytics::funnel))
        .route("/api/analytics/roi", get(routes::analytics::roi))
        .route(
            "/api/analytics/organization",
            get(routes::analytics::organization),
        )
        .route(
            "/api/analytics/user-activity",
            get(routes::analytics::user_activity),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

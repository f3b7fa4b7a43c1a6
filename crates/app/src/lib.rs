//! HTTP JSON API for crop-pronunciation test runs.

#![forbid(unsafe_code)]

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use services::AppServices;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;

/// Largest accepted request body; covers a few minutes of recorded audio.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .route("/api/languages", get(api::list_languages))
        .route(
            "/api/sessions",
            get(api::list_sessions).post(api::start_session),
        )
        .route("/api/sessions/:id", get(api::get_session))
        .route("/api/sessions/:id/items/:index", get(api::locate_item))
        .route(
            "/api/sessions/:id/items/:index/attempts/:number",
            post(api::submit_attempt),
        )
        .route("/api/sessions/:id/skip", post(api::skip_attempt))
        .route("/api/sessions/:id/end", post(api::end_session))
        .route("/api/sessions/:id/results", get(api::get_results))
        .route("/api/sessions/:id/export.csv", get(api::export_item_report))
        .route("/api/sessions/:id/attempts.csv", get(api::export_attempt_log))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

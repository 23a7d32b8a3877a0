//! Defines the routes of the upload service.
//!
//! - `GET  /`        — upload form (renders and clears a pending flash)
//! - `POST /`        — multipart upload, always redirects back to `/`
//! - `GET  /healthz` — liveness
//! - `GET  /readyz`  — category folders writable

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        upload_handlers::{upload_file, upload_form},
    },
    state::AppState,
};
use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::trace::TraceLayer;

/// Routes carrying `AppState`, before state is attached.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // upload form
        .route("/", get(upload_form).post(upload_file))
}

/// Fully layered application, ready to serve.
///
/// Uploads have no size cap, so axum's default body limit is lifted.
pub fn app(state: AppState) -> Router {
    routes()
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
}

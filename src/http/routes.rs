//! HTTP API Route Definitions

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use super::handlers::{self, AppState};
use crate::task::IMAGE_NAMESPACE;

/// Create the router with all routes
///
/// Saved images are served under `/images`, matching the `image_path`
/// exposed in task snapshots.
pub fn create_router(app_state: AppState) -> Router {
    let images = ServeDir::new(app_state.pipeline.image_dir());

    let api = Router::new()
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_tasks),
        )
        .route("/tasks/:id", get(handlers::get_task))
        .route("/tasks/:id/cancel", post(handlers::cancel_task))
        .route("/events", get(handlers::events_sse));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .nest_service(&format!("/{}", IMAGE_NAMESPACE), images)
        .with_state(app_state)
}

//! HTTP API Request Handlers
//!
//! Handlers that map HTTP requests onto pipeline operations.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::StreamExt as _;
use tracing::{debug, info, warn};
use url::Url;

use super::types::*;
use crate::events::Broadcaster;
use crate::pipeline::{CancelOutcome, Pipeline};
use crate::task::{parse_scheduled_at, TaskId};
use crate::RelayError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub broadcaster: Broadcaster,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Parse a task ID string into a UUID, returning an error response on failure.
fn parse_task_id(id: &str) -> Result<TaskId, Response> {
    TaskId::parse_str(id)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid task ID format"))
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "ok"
}

/// Submit a batch of URLs
pub async fn create_tasks(
    State(state): State<AppState>,
    Json(request): Json<CreateTasksRequest>,
) -> Response {
    let scheduled_at = match parse_scheduled_at(&request.date) {
        Ok(at) => at,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let urls = match request
        .urls
        .iter()
        .map(|entry| {
            Url::parse(&entry.url).map_err(|source| RelayError::InvalidUrl {
                url: entry.url.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(urls) => urls,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    debug!(
        "HTTP submit request: {} URL(s) scheduled at {}",
        urls.len(),
        scheduled_at
    );

    match state.pipeline.submit(&urls, scheduled_at) {
        Ok(snapshots) => (StatusCode::OK, Json(snapshots)).into_response(),
        Err(RelayError::CapacityExceeded { .. }) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::too_many_urls()),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// List every task in creation order
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.pipeline.registry().list())
}

/// Fetch one task
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_task_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.pipeline.registry().get(&id) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

/// Request cancellation of a task
///
/// The outcome is reported through the event stream, not in the response.
pub async fn cancel_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_task_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.pipeline.cancel(&id) {
        Ok(outcome) => {
            if let CancelOutcome::Ignored(current) = outcome {
                debug!("Cancel of task {} ignored in state {}", id, current);
            }
            (StatusCode::ACCEPTED, Json(CancelResponse { accepted: true })).into_response()
        }
        Err(e @ RelayError::NotFound { .. }) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// SSE endpoint for live task events
pub async fn events_sse(State(state): State<AppState>) -> impl IntoResponse {
    let subscription = state.broadcaster.subscribe();
    let observer = subscription.id();
    info!("SSE client connected as observer {}", observer);

    let stream = subscription
        .into_stream()
        .filter_map(move |event| match serde_json::to_string(&event) {
            Ok(json) => Some(Ok::<_, Infallible>(
                SseEvent::default().event(event.kind.as_str()).data(json),
            )),
            Err(e) => {
                warn!("SSE serialization error for observer {}: {}", observer, e);
                None
            }
        });

    Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(15)))
}

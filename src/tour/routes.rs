//! REST endpoints for the tour control surface.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::events::DomainEvent;
use super::host::TourHost;

/// Shared state for tour routes.
#[derive(Clone)]
pub struct TourRouteState {
    pub host: Arc<TourHost>,
}

/// Body of `POST /api/tour/start`.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// Forget saved progress first. Defaults to true, as the host's
    /// "restart tour" button does.
    #[serde(default = "default_force_clear")]
    pub force_clear: bool,
}

fn default_force_clear() -> bool {
    true
}

/// GET /api/tour/status
async fn get_status(State(state): State<TourRouteState>) -> impl IntoResponse {
    Json(state.host.status().await)
}

/// POST /api/tour/start
///
/// Body is optional; `{"force_clear": false}` resumes saved progress.
async fn start(State(state): State<TourRouteState>, body: Bytes) -> impl IntoResponse {
    let force_clear = if body.is_empty() {
        default_force_clear()
    } else {
        match serde_json::from_slice::<StartRequest>(&body) {
            Ok(req) => req.force_clear,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("Invalid start request: {e}") })),
                )
                    .into_response();
            }
        }
    };
    Json(state.host.start(force_clear).await).into_response()
}

/// POST /api/tour/next
async fn next(State(state): State<TourRouteState>) -> impl IntoResponse {
    if !state.host.advance().await {
        return no_session();
    }
    Json(state.host.status().await).into_response()
}

/// POST /api/tour/previous
async fn previous(State(state): State<TourRouteState>) -> impl IntoResponse {
    let Some(controller) = state.host.controller().await else {
        return no_session();
    };
    controller.previous().await;
    Json(controller.status().await).into_response()
}

/// POST /api/tour/skip
async fn skip(State(state): State<TourRouteState>) -> impl IntoResponse {
    let Some(controller) = state.host.controller().await else {
        return no_session();
    };
    controller.skip().await;
    Json(controller.status().await).into_response()
}

/// POST /api/tour/teardown
async fn teardown(State(state): State<TourRouteState>) -> impl IntoResponse {
    let removed = state.host.teardown().await;
    Json(serde_json::json!({ "torn_down": removed }))
}

/// POST /api/tour/events
///
/// Accepts a typed domain event, e.g. `{"type": "classCreated"}`.
async fn publish_event(
    State(state): State<TourRouteState>,
    Json(event): Json<DomainEvent>,
) -> impl IntoResponse {
    let kind = event.kind();
    let listeners = state.host.publish(event);
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "event": kind, "listeners": listeners })),
    )
}

/// POST /api/tour/test/student-added
async fn test_student_added(State(state): State<TourRouteState>) -> impl IntoResponse {
    let listeners = state.host.simulate_student_added();
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "event": "studentAdded", "listeners": listeners })),
    )
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn no_session() -> axum::response::Response {
    (
        StatusCode::CONFLICT,
        Json(serde_json::json!({ "error": "No tour is running on this page" })),
    )
        .into_response()
}

/// Build the tour control routes.
pub fn tour_routes(state: TourRouteState) -> Router {
    Router::new()
        .route("/api/tour/status", get(get_status))
        .route("/api/tour/start", post(start))
        .route("/api/tour/next", post(next))
        .route("/api/tour/previous", post(previous))
        .route("/api/tour/skip", post(skip))
        .route("/api/tour/teardown", post(teardown))
        .route("/api/tour/events", post(publish_event))
        .route("/api/tour/test/student-added", post(test_student_added))
        .route("/health", get(health))
        .with_state(state)
}

use crate::domain::ports::Clock;
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{CombatSnapshotDto, WebhookEventDto};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ArenaError, InteractionEvent};

use axum::{
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, serde::Serialize)]
struct WebhookAccepted {
    success: bool,
    message: &'static str,
}

#[derive(Debug, serde::Serialize)]
struct WebhookStatus {
    status: &'static str,
    connected_clients: usize,
    timestamp: u64,
}

/// Accepts one platform event and queues it for the arena task.
pub async fn webhook_event_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookEventDto>, JsonRejection>,
) -> Response {
    let Json(dto) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "malformed webhook body");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let event_type = dto.event_type.clone();
    let event = match InteractionEvent::try_from(dto) {
        Ok(event) => event,
        Err(e) => {
            warn!(event_type = %event_type, error = %e, "rejected webhook event");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    debug!(
        kind = event.kind(),
        user_id = %event.viewer().user_id,
        "webhook event received"
    );
    match state.arena.submit(event) {
        Ok(()) => (
            StatusCode::OK,
            Json(WebhookAccepted {
                success: true,
                message: "Event processed successfully",
            }),
        )
            .into_response(),
        Err(e) => arena_unavailable(e),
    }
}

pub async fn webhook_status_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(WebhookStatus {
        status: "ok",
        connected_clients: state.registry.len(),
        timestamp: state.clock.now_millis(),
    })
    .into_response()
}

/// Current combat snapshot for the upstream controller.
pub async fn arena_state_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.arena.snapshot().await {
        Ok(snapshot) => Json(CombatSnapshotDto::from(snapshot)).into_response(),
        Err(e) => arena_unavailable(e),
    }
}

/// Forces a fresh session: round 1, full health, cooldowns cleared.
pub async fn arena_reset_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.arena.restart().await {
        Ok(snapshot) => Json(CombatSnapshotDto::from(snapshot)).into_response(),
        Err(e) => arena_unavailable(e),
    }
}

fn arena_unavailable(e: ArenaError) -> Response {
    match e {
        ArenaError::Busy => warn!("arena command queue full; rejecting request"),
        ArenaError::Closed => warn!("arena task not running; rejecting request"),
    }
    error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
}

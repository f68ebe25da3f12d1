//! Service status and the Feishu test message

use axum::{
    Json,
    extract::State as AxumState,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info};

use super::ApiResponse;
use crate::SharedState;
use crate::format::format_test_card;

fn status_document(state: &SharedState) -> serde_json::Value {
    json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at,
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "timestamp": Utc::now(),
    })
}

/// GET / - service status
pub async fn root(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    Json(status_document(&state))
}

/// GET /health - same document as `/`, for load balancer probes
pub async fn health(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    Json(status_document(&state))
}

/// GET /test - sends a test card to the configured Feishu group
pub async fn test_notification(AxumState(state): AxumState<SharedState>) -> Response {
    match state.dispatcher.send(&format_test_card(Utc::now())).await {
        Ok(()) => {
            info!("Test message sent");
            Json(ApiResponse::success(
                "Test message sent, check the Feishu group",
            ))
            .into_response()
        }
        Err(e) => {
            error!("Test message failed: {}", e);
            e.into_response()
        }
    }
}

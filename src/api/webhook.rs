//! Webhook handler for GitHub push and pull request events

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use super::ApiResponse;
use crate::SharedState;
use crate::dispatch::{DispatchOutcome, InboundRequest};

const HEADER_EVENT: &str = "X-GitHub-Event";
const HEADER_SIGNATURE: &str = "X-Hub-Signature-256";
const HEADER_DELIVERY: &str = "X-GitHub-Delivery";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handles the GitHub webhook POST request.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery_id = header(&headers, HEADER_DELIVERY)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    let event_type = header(&headers, HEADER_EVENT);
    let span = info_span!("webhook", delivery = %delivery_id, event = ?event_type);

    let request = InboundRequest {
        event_type,
        signature: header(&headers, HEADER_SIGNATURE),
        body: &body,
    };

    let result = state.dispatcher.dispatch(request).instrument(span).await;

    match result {
        Ok(DispatchOutcome::Delivered) => {
            info!(delivery = %delivery_id, "Notification sent for {:?} event", event_type);
            Json(ApiResponse::success("Notification sent successfully")).into_response()
        }
        Ok(DispatchOutcome::Ignored(reason)) => {
            Json(ApiResponse::ignored(reason.to_string())).into_response()
        }
        Err(e) => {
            error!(delivery = %delivery_id, "Webhook processing failed: {}", e);
            e.into_response()
        }
    }
}

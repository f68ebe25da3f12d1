//! HTTP surface: the GitHub webhook receiver plus health and test endpoints.

pub mod health;
pub mod webhook;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing,
};
use serde::Serialize;

use crate::SharedState;
use crate::error::NotifyError;

pub use health::{health, root, test_notification};
pub use webhook::handle_webhook;

/// Body of every webhook and test endpoint response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    pub message: String,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    pub fn ignored(message: impl Into<String>) -> Self {
        Self {
            status: "ignored",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        let status = match &self {
            NotifyError::AuthenticationFailure(_) => StatusCode::UNAUTHORIZED,
            NotifyError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            NotifyError::DeliveryFailure(_)
            | NotifyError::ConfigError(_)
            | NotifyError::IoError(_)
            | NotifyError::TomlParseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/health", routing::get(health))
        .route("/test", routing::get(test_notification))
        .route("/github-webhook", routing::post(handle_webhook))
        .with_state(state)
}

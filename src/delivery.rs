//! Outbound delivery to the Feishu bot webhook.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::{NotifyError, Result};
use crate::utils::truncate_for_log;

/// Status line and raw body of a delivery response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
}

/// Something that can POST a JSON document and report what came back.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<DeliveryResponse>;
}

/// reqwest-backed client with a fixed request timeout.
pub struct HttpDeliveryClient {
    client: Client,
}

impl HttpDeliveryClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<DeliveryResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::DeliveryFailure(format!("request timed out: {}", e))
                } else {
                    NotifyError::DeliveryFailure(format!("request failed: {}", e))
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::DeliveryFailure(format!("failed to read response: {}", e)))?;
        debug!("Feishu responded {}: {}", status, truncate_for_log(&body));

        Ok(DeliveryResponse { status, body })
    }
}

/// Interprets a Feishu response.
///
/// Success requires a 2xx status and a JSON body whose `code` (or the legacy
/// `StatusCode`) is zero.
pub fn check_response(response: &DeliveryResponse) -> Result<()> {
    if !(200..300).contains(&response.status) {
        error!(
            "Feishu delivery failed with HTTP {}: {}",
            response.status,
            truncate_for_log(&response.body)
        );
        return Err(NotifyError::DeliveryFailure(format!(
            "HTTP {}",
            response.status
        )));
    }

    let json: Value = serde_json::from_str(&response.body).map_err(|e| {
        error!(
            "Feishu returned a non-JSON body: {}",
            truncate_for_log(&response.body)
        );
        NotifyError::DeliveryFailure(format!("unparseable response body: {}", e))
    })?;

    let code = json
        .get("code")
        .or_else(|| json.get("StatusCode"))
        .and_then(Value::as_i64);

    match code {
        Some(0) => {
            info!("Feishu message delivered");
            Ok(())
        }
        Some(code) => {
            let msg = json
                .get("msg")
                .or_else(|| json.get("StatusMessage"))
                .and_then(Value::as_str)
                .unwrap_or("");
            error!("Feishu rejected message: code {} {}", code, msg);
            Err(NotifyError::DeliveryFailure(format!(
                "Feishu error code {}: {}",
                code, msg
            )))
        }
        None => {
            error!(
                "Feishu response carries no status code: {}",
                truncate_for_log(&response.body)
            );
            Err(NotifyError::DeliveryFailure(
                "response has no status code".to_string(),
            ))
        }
    }
}

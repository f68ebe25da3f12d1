//! Verify → classify → format → sign → deliver.
//!
//! A [`Dispatcher`] is built once at startup from [`RelayConfig`] and shared
//! read-only between requests. Each call runs one delivery attempt to
//! completion; nothing is retried or queued.

use std::fmt;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::card::{DeliveryEnvelope, NotificationPayload};
use crate::classify::{Classification, EventKind, IgnoreReason, SupportedEvent, classify};
use crate::delivery::{DeliveryClient, check_response};
use crate::error::{NotifyError, Result};
use crate::event::{PullRequestEvent, PushEvent, ValidatedEvent};
use crate::format::format_event;
use crate::signature::verify_github_signature;
use crate::webhook::{PullRequestPayload, PushPayload};
use crate::{FeishuConfig, FormatConfig, RelayConfig};

/// Processing stage of a single inbound delivery, used for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Verifying,
    Classifying,
    Formatting,
    Signing,
    Delivering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Verifying => "verifying",
            Stage::Classifying => "classifying",
            Stage::Formatting => "formatting",
            Stage::Signing => "signing",
            Stage::Delivering => "delivering",
        };
        f.write_str(name)
    }
}

/// What the webhook handler extracted from the HTTP request.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub event_type: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub body: &'a [u8],
}

/// Result of the synchronous half of dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    Ignored(IgnoreReason),
    Ready(NotificationPayload),
}

/// Terminal, non-error outcomes of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Ignored(IgnoreReason),
}

pub struct Dispatcher {
    feishu: FeishuConfig,
    github_secret: Option<String>,
    format: FormatConfig,
    client: Box<dyn DeliveryClient>,
}

impl Dispatcher {
    pub fn new(config: &RelayConfig, client: Box<dyn DeliveryClient>) -> Self {
        Self {
            feishu: config.feishu.clone(),
            github_secret: config.github_secret().map(str::to_string),
            format: config.format.clone(),
            client,
        }
    }

    fn feishu_secret(&self) -> Option<&str> {
        self.feishu.secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Verifies, classifies, validates and formats an inbound delivery.
    pub fn ingest(&self, request: InboundRequest<'_>) -> Result<Ingested> {
        debug!(stage = %Stage::Verifying, "Checking signature");
        if !verify_github_signature(self.github_secret.as_deref(), request.body, request.signature)
        {
            return Err(NotifyError::AuthenticationFailure(
                "invalid or missing X-Hub-Signature-256".to_string(),
            ));
        }

        debug!(stage = %Stage::Classifying, "Classifying event {:?}", request.event_type);
        // Bodies of unsupported events are never parsed.
        let payload: Value = if EventKind::from_label(request.event_type).is_supported() {
            serde_json::from_slice(request.body)?
        } else {
            Value::Null
        };
        let event = match classify(request.event_type, &payload) {
            Classification::Ignored(reason) => return Ok(Ingested::Ignored(reason)),
            Classification::Process(SupportedEvent::Push) => {
                let push: PushPayload = serde_json::from_value(payload)?;
                ValidatedEvent::Push(PushEvent::from_payload(push)?)
            }
            Classification::Process(SupportedEvent::PullRequest) => {
                let pr: PullRequestPayload = serde_json::from_value(payload)?;
                ValidatedEvent::PullRequest(PullRequestEvent::from_payload(pr)?)
            }
        };

        debug!(stage = %Stage::Formatting, "Formatting notification");
        Ok(Ingested::Ready(format_event(&event, &self.format)))
    }

    /// Runs the whole pipeline for one inbound delivery.
    pub async fn dispatch(&self, request: InboundRequest<'_>) -> Result<DispatchOutcome> {
        debug!(stage = %Stage::Received, "{} byte body", request.body.len());
        match self.ingest(request) {
            Ok(Ingested::Ignored(reason)) => {
                info!("{}", reason);
                Ok(DispatchOutcome::Ignored(reason))
            }
            Ok(Ingested::Ready(payload)) => {
                self.send(&payload).await?;
                Ok(DispatchOutcome::Delivered)
            }
            Err(e) => {
                warn!("Rejected delivery: {}", e);
                Err(e)
            }
        }
    }

    /// Signs and posts a payload to the configured bot webhook. One attempt.
    pub async fn send(&self, payload: &NotificationPayload) -> Result<()> {
        if self.feishu.webhook_url.is_empty() {
            error!("Feishu webhook URL is not configured");
            return Err(NotifyError::ConfigError(
                "FEISHU_WEBHOOK_URL is not set".to_string(),
            ));
        }

        debug!(stage = %Stage::Signing, "Signing delivery");
        let timestamp = Utc::now().timestamp().to_string();
        let envelope = DeliveryEnvelope::signed(payload.clone(), &timestamp, self.feishu_secret());

        debug!(stage = %Stage::Delivering, "Posting {} message", payload.msg_type());
        let response = self
            .client
            .post_json(&self.feishu.webhook_url, &envelope.to_json())
            .await
            .inspect_err(|e| error!("Feishu delivery failed: {}", e))?;
        check_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryResponse;
    use crate::signature::compute_github_signature;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingClient {
        sent: Arc<Mutex<Vec<(String, Value)>>>,
        reply: Option<DeliveryResponse>,
    }

    #[async_trait]
    impl DeliveryClient for RecordingClient {
        async fn post_json(&self, url: &str, body: &Value) -> Result<DeliveryResponse> {
            self.sent
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(NotifyError::DeliveryFailure("connection refused".to_string())),
            }
        }
    }

    fn ok_reply() -> Option<DeliveryResponse> {
        Some(DeliveryResponse {
            status: 200,
            body: r#"{"code":0,"msg":"success"}"#.to_string(),
        })
    }

    fn config(github_secret: Option<&str>, feishu_secret: Option<&str>) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.feishu.webhook_url = "https://open.feishu.cn/open-apis/bot/v2/hook/test".to_string();
        config.feishu.secret = feishu_secret.map(str::to_string);
        config.github.secret = github_secret.map(str::to_string);
        config
    }

    fn push_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "ref": "refs/heads/main",
            "repository": {
                "full_name": "test-user/test-repo",
                "html_url": "https://github.com/test-user/test-repo"
            },
            "pusher": {"name": "test-user"},
            "commits": [
                {"id": "a".repeat(40), "message": "fix login style", "url": "https://github.com/test-user/test-repo/commit/a"},
                {"id": "b".repeat(40), "message": "add avatar upload\n\n- jpg", "url": "https://github.com/test-user/test-repo/commit/b"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_push_delivered_and_signed() {
        let client = RecordingClient {
            reply: ok_reply(),
            ..Default::default()
        };
        let sent = client.sent.clone();
        let dispatcher = Dispatcher::new(&config(Some("gh"), Some("bot")), Box::new(client));

        let body = push_body();
        let signature = compute_github_signature("gh", &body).unwrap();
        let outcome = dispatcher
            .dispatch(InboundRequest {
                event_type: Some("push"),
                signature: Some(&signature),
                body: &body,
            })
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Delivered);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (url, message) = &sent[0];
        assert_eq!(url, "https://open.feishu.cn/open-apis/bot/v2/hook/test");
        assert_eq!(message["msg_type"], "interactive");
        assert!(message["timestamp"].is_string());
        assert!(message["sign"].is_string());
    }

    #[tokio::test]
    async fn test_missing_signature_rejected_without_delivery() {
        let client = RecordingClient {
            reply: ok_reply(),
            ..Default::default()
        };
        let sent = client.sent.clone();
        let dispatcher = Dispatcher::new(&config(Some("gh"), None), Box::new(client));

        let body = push_body();
        let err = dispatcher
            .dispatch(InboundRequest {
                event_type: Some("push"),
                signature: None,
                body: &body,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::AuthenticationFailure(_)));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_push_ignored_without_delivery() {
        let client = RecordingClient::default();
        let sent = client.sent.clone();
        let dispatcher = Dispatcher::new(&config(None, None), Box::new(client));

        let body = serde_json::to_vec(&json!({
            "ref": "refs/heads/main",
            "repository": {"full_name": "o/r"},
            "pusher": {"name": "u"},
            "commits": []
        }))
        .unwrap();
        let outcome = dispatcher
            .dispatch(InboundRequest {
                event_type: Some("push"),
                signature: None,
                body: &body,
            })
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Ignored(IgnoreReason::NoCommits));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_event_ignored_before_parsing() {
        let dispatcher = Dispatcher::new(&config(None, None), Box::new(RecordingClient::default()));
        let outcome = dispatcher
            .dispatch(InboundRequest {
                event_type: Some("issues"),
                signature: None,
                body: b"not json",
            })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Ignored(IgnoreReason::UnsupportedEvent("issues".to_string()))
        );
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let dispatcher = Dispatcher::new(&config(None, None), Box::new(RecordingClient::default()));
        let err = dispatcher
            .ingest(InboundRequest {
                event_type: Some("push"),
                signature: None,
                body: b"{not json",
            })
            .unwrap_err();
        assert!(matches!(err, NotifyError::MalformedPayload(_)));
    }

    #[test]
    fn test_invalid_pull_request_is_malformed() {
        let dispatcher = Dispatcher::new(&config(None, None), Box::new(RecordingClient::default()));
        let body = serde_json::to_vec(&json!({
            "action": "opened",
            "pull_request": {
                "number": 0,
                "title": "t",
                "html_url": "https://github.com/o/r/pull/0",
                "user": {"login": "u"},
                "head": {"ref": "feature"},
                "base": {"ref": "main"}
            },
            "repository": {"full_name": "o/r"}
        }))
        .unwrap();
        let err = dispatcher
            .ingest(InboundRequest {
                event_type: Some("pull_request"),
                signature: None,
                body: &body,
            })
            .unwrap_err();
        assert!(matches!(err, NotifyError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_transport_error_is_delivery_failure() {
        let dispatcher = Dispatcher::new(&config(None, None), Box::new(RecordingClient::default()));
        let body = push_body();
        let err = dispatcher
            .dispatch(InboundRequest {
                event_type: Some("push"),
                signature: None,
                body: &body,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::DeliveryFailure(_)));
    }

    #[tokio::test]
    async fn test_application_error_code_is_delivery_failure() {
        let client = RecordingClient {
            reply: Some(DeliveryResponse {
                status: 200,
                body: r#"{"code":9499,"msg":"Bad Request"}"#.to_string(),
            }),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(&config(None, None), Box::new(client));
        let err = dispatcher
            .send(&NotificationPayload::Text("hello".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::DeliveryFailure(_)));
    }

    #[tokio::test]
    async fn test_unsigned_delivery_without_secret() {
        let client = RecordingClient {
            reply: ok_reply(),
            ..Default::default()
        };
        let sent = client.sent.clone();
        let dispatcher = Dispatcher::new(&config(None, Some("")), Box::new(client));
        dispatcher
            .send(&NotificationPayload::Text("hello".to_string()))
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert!(sent[0].1.get("sign").is_none());
        assert!(sent[0].1.get("timestamp").is_none());
        assert_eq!(sent[0].1["content"]["text"], "hello");
    }

    #[tokio::test]
    async fn test_send_without_webhook_url_fails() {
        let dispatcher = Dispatcher::new(&RelayConfig::default(), Box::new(RecordingClient::default()));
        let err = dispatcher
            .send(&NotificationPayload::Text("hello".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::ConfigError(_)));
    }
}

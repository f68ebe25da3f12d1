//! Notification payloads and their Feishu wire form.

use serde_json::{Value, json};

use crate::signature::sign_delivery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardColor {
    Blue,
    Green,
    Red,
}

impl CardColor {
    /// Feishu header template name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardColor::Blue => "blue",
            CardColor::Green => "green",
            CardColor::Red => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub icon: String,
    pub title: String,
    pub color: CardColor,
    pub lines: Vec<String>,
    pub action: Option<ActionButton>,
}

impl Card {
    pub fn new(icon: &str, title: &str, color: CardColor) -> Self {
        Self {
            icon: icon.to_string(),
            title: title.to_string(),
            color,
            lines: Vec::new(),
            action: None,
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn field(self, name: &str, value: impl std::fmt::Display) -> Self {
        self.line(format!("**{}**: {}", name, value))
    }

    pub fn button(mut self, label: &str, url: &str) -> Self {
        self.action = Some(ActionButton {
            label: label.to_string(),
            url: url.to_string(),
        });
        self
    }

    fn content(&self) -> String {
        let body = self
            .lines
            .iter()
            .map(|line| format!("• {}", line))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{} **{}**\n\n{}", self.icon, self.title, body)
    }

    fn to_json(&self) -> Value {
        let mut elements = vec![json!({
            "tag": "div",
            "text": {
                "content": self.content(),
                "tag": "lark_md",
            },
        })];

        if let Some(action) = &self.action {
            elements.push(json!({
                "tag": "action",
                "actions": [{
                    "tag": "button",
                    "text": {"content": action.label, "tag": "lark_md"},
                    "url": action.url,
                    "type": "default",
                    "value": {},
                }],
            }));
        }

        json!({
            "elements": elements,
            "header": {
                "title": {"content": self.title, "tag": "plain_text"},
                "template": self.color.as_str(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationPayload {
    Text(String),
    Card(Card),
}

impl NotificationPayload {
    pub fn msg_type(&self) -> &'static str {
        match self {
            NotificationPayload::Text(_) => "text",
            NotificationPayload::Card(_) => "interactive",
        }
    }

    /// The Feishu message body without timestamp or signature.
    pub fn to_message(&self) -> Value {
        match self {
            NotificationPayload::Text(text) => json!({
                "msg_type": self.msg_type(),
                "content": {"text": text},
            }),
            NotificationPayload::Card(card) => json!({
                "msg_type": self.msg_type(),
                "card": card.to_json(),
            }),
        }
    }
}

/// A payload ready to POST, optionally stamped and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEnvelope {
    pub payload: NotificationPayload,
    pub timestamp: Option<String>,
    pub sign: Option<String>,
}

impl DeliveryEnvelope {
    pub fn unsigned(payload: NotificationPayload) -> Self {
        Self {
            payload,
            timestamp: None,
            sign: None,
        }
    }

    /// Signs with `secret` when one is configured; otherwise the envelope stays unsigned.
    pub fn signed(payload: NotificationPayload, timestamp: &str, secret: Option<&str>) -> Self {
        match sign_delivery(timestamp, secret) {
            Some(sign) => Self {
                payload,
                timestamp: Some(timestamp.to_string()),
                sign: Some(sign),
            },
            None => Self::unsigned(payload),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut message = self.payload.to_message();
        if let Some(timestamp) = &self.timestamp {
            message["timestamp"] = json!(timestamp);
        }
        if let Some(sign) = &self.sign {
            message["sign"] = json!(sign);
        }
        message
    }
}

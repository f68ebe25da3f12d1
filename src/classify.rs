//! Decides which GitHub deliveries become notifications.

use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Push,
    PullRequest,
    Other(String),
}

impl EventKind {
    /// Maps the `X-GitHub-Event` header value. A missing header is an unsupported event.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("push") => EventKind::Push,
            Some("pull_request") => EventKind::PullRequest,
            Some(other) => EventKind::Other(other.to_string()),
            None => EventKind::Other(String::new()),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, EventKind::Other(_))
    }
}

/// Event kinds that produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedEvent {
    Push,
    PullRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnsupportedEvent(String),
    BranchDeleted,
    NoCommits,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnsupportedEvent(label) if label.is_empty() => {
                write!(f, "Missing event type is not supported")
            }
            IgnoreReason::UnsupportedEvent(label) => {
                write!(f, "Event type '{}' is not supported", label)
            }
            IgnoreReason::BranchDeleted => write!(f, "Push event ignored: branch deleted"),
            IgnoreReason::NoCommits => write!(f, "Push event ignored: no commits"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Process(SupportedEvent),
    Ignored(IgnoreReason),
}

/// Filter rules applied to push payloads.
pub fn push_suppression(payload: &Value) -> Option<IgnoreReason> {
    if payload.get("deleted").and_then(Value::as_bool).unwrap_or(false) {
        return Some(IgnoreReason::BranchDeleted);
    }

    let has_commits = payload
        .get("commits")
        .and_then(Value::as_array)
        .is_some_and(|commits| !commits.is_empty());
    if !has_commits {
        return Some(IgnoreReason::NoCommits);
    }

    None
}

/// Decides whether a delivery is notified. The payload is only inspected for pushes.
pub fn classify(label: Option<&str>, payload: &Value) -> Classification {
    match EventKind::from_label(label) {
        EventKind::Other(label) => Classification::Ignored(IgnoreReason::UnsupportedEvent(label)),
        EventKind::Push => match push_suppression(payload) {
            Some(reason) => Classification::Ignored(reason),
            None => Classification::Process(SupportedEvent::Push),
        },
        EventKind::PullRequest => Classification::Process(SupportedEvent::PullRequest),
    }
}

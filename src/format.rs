//! Notification formatting
//!
//! Pure mapping from validated events to [`NotificationPayload`]s. No I/O
//! happens here, and formatting the same event twice yields identical payloads.

use chrono::{DateTime, Utc};

use crate::FormatConfig;
use crate::card::{Card, CardColor, NotificationPayload};
use crate::event::{
    CommitMessage, CommitNotice, CommitSha, PrAction, PullRequestEvent, PushEvent, ValidatedEvent,
};
use crate::utils::commit_summary;

const PUSH_ICON: &str = "🚀";
const PUSH_TITLE: &str = "GitHub Push Notification";

/// Header style of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardStyle {
    pub icon: &'static str,
    pub title: &'static str,
    pub color: CardColor,
}

pub fn format_event(event: &ValidatedEvent, options: &FormatConfig) -> NotificationPayload {
    match event {
        ValidatedEvent::Push(push) => format_push(push, options),
        ValidatedEvent::PullRequest(pr) => format_pull_request(pr),
    }
}

fn commit_line(sha: Option<&CommitSha>, message: &CommitMessage, limit: usize) -> String {
    let text = commit_summary(message.as_str(), limit);
    match sha {
        Some(sha) => format!("`{}` {}", sha.short(), text),
        None => text,
    }
}

pub fn format_push(event: &PushEvent, options: &FormatConfig) -> NotificationPayload {
    let mut card = Card::new(PUSH_ICON, PUSH_TITLE, CardColor::Blue)
        .field("Repository", &event.repository)
        .field("Branch", &event.branch)
        .field("Pusher", &event.pusher);

    for commit in event.commits.iter().take(options.max_commits) {
        card = card.line(commit_line(
            commit.sha.as_ref(),
            &commit.message,
            options.message_limit,
        ));
    }

    let remaining = event.commits.len().saturating_sub(options.max_commits);
    if remaining > 0 {
        let noun = if remaining == 1 { "commit" } else { "commits" };
        card = card.line(format!("... and {} more {}", remaining, noun));
    }

    let card = match (&event.repository_url, event.head_commit_url()) {
        (Some(url), _) => card.button("View Repository", url),
        (None, Some(url)) => card.button("View Commit", url),
        (None, None) => card,
    };
    NotificationPayload::Card(card)
}

pub fn pull_request_style(action: &PrAction, merged: bool) -> CardStyle {
    match (action, merged) {
        (PrAction::Opened, _) => CardStyle {
            icon: "🔄",
            title: "Pull Request Created",
            color: CardColor::Green,
        },
        (PrAction::Closed, true) => CardStyle {
            icon: "✅",
            title: "Pull Request Merged",
            color: CardColor::Blue,
        },
        (PrAction::Closed, false) => CardStyle {
            icon: "❌",
            title: "Pull Request Closed",
            color: CardColor::Red,
        },
        _ => CardStyle {
            icon: "🔄",
            title: "Pull Request Updated",
            color: CardColor::Blue,
        },
    }
}

pub fn format_pull_request(event: &PullRequestEvent) -> NotificationPayload {
    let style = pull_request_style(&event.action, event.merged);
    let card = Card::new(style.icon, style.title, style.color)
        .field("Repository", &event.repository)
        .field("Title", &event.title)
        .field("Number", format!("#{}", event.number))
        .field("Author", &event.author)
        .field("Source Branch", &event.source_branch)
        .field("Target Branch", &event.target_branch)
        .button("View PR", &event.url);
    NotificationPayload::Card(card)
}

pub fn format_commit_notice(notice: &CommitNotice, options: &FormatConfig) -> NotificationPayload {
    let card = Card::new(PUSH_ICON, PUSH_TITLE, CardColor::Blue)
        .field("Repository", &notice.repository)
        .field("Branch", &notice.branch)
        .field("Author", &notice.author)
        .field("Commit", format!("`{}`", notice.sha.short()))
        .field(
            "Message",
            commit_summary(notice.message.as_str(), options.message_limit),
        )
        .button("View Commit", &notice.url);
    NotificationPayload::Card(card)
}

/// Card sent by the `/test` endpoint to check the bot configuration.
pub fn format_test_card(sent_at: DateTime<Utc>) -> NotificationPayload {
    let card = Card::new("🔔", "Test Notification", CardColor::Blue)
        .line("This is a test message to verify the Feishu bot configuration.")
        .field("Sent At", sent_at.format("%Y-%m-%d %H:%M:%S UTC"))
        .field("Status", "OK");
    NotificationPayload::Card(card)
}

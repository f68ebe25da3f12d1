//! Building notifications from inside a GitHub Actions run.
//!
//! The workflow exposes the event through environment variables rather than a
//! webhook body, so these helpers read through a `lookup` function
//! (`std::env::var` in production).

use tokio::process::Command;
use tracing::{error, info};

use crate::FormatConfig;
use crate::card::NotificationPayload;
use crate::error::{NotifyError, Result};
use crate::event::{CommitNotice, PrAction, PullRequestEvent, PullRequestFields};
use crate::format::{format_commit_notice, format_pull_request};

fn var<F>(lookup: &F, key: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_default()
}

/// Reads the full message of `sha` from the local checkout.
pub async fn read_commit_message(sha: &str) -> Result<String> {
    info!("Running: git log --format=%B -n 1 {}", sha);
    let output = Command::new("git")
        .arg("log")
        .arg("--format=%B")
        .arg("-n")
        .arg("1")
        .arg(sha)
        .output()
        .await?;

    if !output.status.success() {
        let msg = format!(
            "git log failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        error!("{}", msg);
        return Err(NotifyError::malformed(msg));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

pub fn commit_notice_from_env<F>(lookup: F, commit_message: &str) -> Result<CommitNotice>
where
    F: Fn(&str) -> Option<String>,
{
    let repository = var(&lookup, "GITHUB_REPOSITORY");
    let sha = var(&lookup, "GITHUB_SHA");
    let url = format!("https://github.com/{}/commit/{}", repository, sha);

    CommitNotice::new(
        &repository,
        &var(&lookup, "GITHUB_REF_NAME"),
        &var(&lookup, "GITHUB_ACTOR"),
        &sha,
        commit_message,
        &url,
    )
}

pub fn pull_request_from_env<F>(lookup: F) -> Result<PullRequestEvent>
where
    F: Fn(&str) -> Option<String>,
{
    let raw_number = var(&lookup, "PR_NUMBER");
    let number = raw_number.trim().parse::<i64>().map_err(|_| {
        NotifyError::malformed(format!("PR_NUMBER '{}' is not a number", raw_number))
    })?;

    PullRequestEvent::new(PullRequestFields {
        repository: var(&lookup, "GITHUB_REPOSITORY"),
        title: var(&lookup, "PR_TITLE"),
        number,
        author: var(&lookup, "GITHUB_ACTOR"),
        action: PrAction::parse(&var(&lookup, "GITHUB_EVENT_ACTION")),
        merged: var(&lookup, "PR_MERGED").eq_ignore_ascii_case("true"),
        source_branch: var(&lookup, "GITHUB_HEAD_REF"),
        target_branch: var(&lookup, "GITHUB_BASE_REF"),
        url: var(&lookup, "PR_URL"),
    })
}

/// Builds the notification for the current workflow event.
///
/// Returns `Ok(None)` for events the notifier does not report.
pub async fn notification_from_env<F>(
    lookup: F,
    options: &FormatConfig,
) -> Result<Option<NotificationPayload>>
where
    F: Fn(&str) -> Option<String>,
{
    let event_name = lookup("GITHUB_EVENT_NAME");
    info!("Handling GitHub event: {:?}", event_name);

    match event_name.as_deref() {
        Some("push") => {
            let message = read_commit_message(&var(&lookup, "GITHUB_SHA")).await?;
            let notice = commit_notice_from_env(lookup, &message)?;
            Ok(Some(format_commit_notice(&notice, options)))
        }
        Some("pull_request") => {
            let event = pull_request_from_env(lookup)?;
            Ok(Some(format_pull_request(&event)))
        }
        other => {
            info!("Ignoring event type {:?}", other);
            Ok(None)
        }
    }
}

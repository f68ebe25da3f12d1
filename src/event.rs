//! Validated events
//!
//! Wire payloads from [`crate::webhook`] (or the CI environment) are turned
//! into these types through `Result`-returning constructors. Anything that
//! violates an invariant comes back as [`NotifyError::MalformedPayload`], so
//! the formatter only ever sees well-formed input.

use std::fmt;

use crate::error::{NotifyError, Result};
use crate::utils::branch_from_ref;
use crate::webhook::{PullRequestPayload, PushPayload};

const FORBIDDEN_BRANCH_CHARS: [char; 7] = [' ', '~', '^', ':', '?', '*', '['];

/// A git branch name that is non-empty and free of characters git rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchName(String);

impl BranchName {
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NotifyError::malformed("branch name must not be empty"));
        }
        if let Some(c) = name.chars().find(|c| FORBIDDEN_BRANCH_CHARS.contains(c)) {
            return Err(NotifyError::malformed(format!(
                "branch name '{}' contains forbidden character {:?}",
                name, c
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 7 to 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSha(String);

impl CommitSha {
    pub fn parse(sha: &str) -> Result<Self> {
        let valid_len = (7..=40).contains(&sha.len());
        let valid_chars = sha.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'));
        if !valid_len || !valid_chars {
            return Err(NotifyError::malformed(format!(
                "commit sha '{}' must be 7-40 lowercase hex characters",
                sha
            )));
        }
        Ok(Self(sha.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

/// Commit message, stored trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage(String);

impl CommitMessage {
    pub fn parse(message: &str) -> Result<Self> {
        let message = message.trim();
        if message.is_empty() {
            return Err(NotifyError::malformed("commit message must not be empty"));
        }
        Ok(Self(message.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn require_url(field: &str, url: &str) -> Result<String> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url.to_string())
    } else {
        Err(NotifyError::malformed(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )))
    }
}

fn require_text(field: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(NotifyError::malformed(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: Option<CommitSha>,
    pub message: CommitMessage,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub repository: String,
    pub repository_url: Option<String>,
    pub branch: BranchName,
    pub pusher: String,
    pub commits: Vec<Commit>,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl PushEvent {
    pub fn from_payload(payload: PushPayload) -> Result<Self> {
        let branch = BranchName::parse(branch_from_ref(&payload.git_ref))?;

        let commits = payload
            .commits
            .into_iter()
            .map(|commit| -> Result<Commit> {
                Ok(Commit {
                    sha: commit.id.as_deref().map(CommitSha::parse).transpose()?,
                    message: CommitMessage::parse(&commit.message)?,
                    url: commit.url,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            repository: require_text("repository.full_name", &payload.repository.full_name)?,
            repository_url: payload.repository.html_url.filter(|u| !u.is_empty()),
            branch,
            pusher: payload.pusher.name,
            commits,
            before: payload.before,
            after: payload.after,
        })
    }

    /// URL of the newest commit in the push, if any.
    pub fn head_commit_url(&self) -> Option<&str> {
        self.commits
            .last()
            .map(|c| c.url.as_str())
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrAction {
    Opened,
    Closed,
    Reopened,
    Synchronize,
    Other(String),
}

impl PrAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "opened" => PrAction::Opened,
            "closed" => PrAction::Closed,
            "reopened" => PrAction::Reopened,
            "synchronize" => PrAction::Synchronize,
            other => PrAction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PrAction::Opened => "opened",
            PrAction::Closed => "closed",
            PrAction::Reopened => "reopened",
            PrAction::Synchronize => "synchronize",
            PrAction::Other(other) => other,
        }
    }
}

/// Unvalidated pull request fields, as collected from a webhook or the CI environment.
#[derive(Debug, Clone)]
pub struct PullRequestFields {
    pub repository: String,
    pub title: String,
    pub number: i64,
    pub author: String,
    pub action: PrAction,
    pub merged: bool,
    pub source_branch: String,
    pub target_branch: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub(crate) repository: String,
    pub(crate) title: String,
    pub(crate) number: u64,
    pub(crate) author: String,
    pub(crate) action: PrAction,
    pub(crate) merged: bool,
    pub(crate) source_branch: BranchName,
    pub(crate) target_branch: BranchName,
    pub(crate) url: String,
}

impl PullRequestEvent {
    pub fn new(fields: PullRequestFields) -> Result<Self> {
        if fields.merged && fields.action != PrAction::Closed {
            return Err(NotifyError::malformed(format!(
                "pull request cannot be merged with action '{}'",
                fields.action.as_str()
            )));
        }
        let number = u64::try_from(fields.number)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                NotifyError::malformed(format!(
                    "pull request number must be positive, got {}",
                    fields.number
                ))
            })?;

        Ok(Self {
            repository: require_text("repository", &fields.repository)?,
            title: fields.title,
            number,
            author: fields.author,
            action: fields.action,
            merged: fields.merged,
            source_branch: BranchName::parse(&fields.source_branch)?,
            target_branch: BranchName::parse(&fields.target_branch)?,
            url: require_url("pull request url", &fields.url)?,
        })
    }

    /// GitHub reports `merged: true` on every later event of a merged PR
    /// (labels, edits); only a `closed` delivery carries the merge itself.
    pub fn from_payload(payload: PullRequestPayload) -> Result<Self> {
        let action = PrAction::parse(&payload.action);
        let merged = payload.pull_request.merged.unwrap_or(false) && action == PrAction::Closed;

        Self::new(PullRequestFields {
            repository: payload.repository.full_name,
            title: payload.pull_request.title,
            number: payload.pull_request.number,
            author: payload.pull_request.user.login,
            action,
            merged,
            source_branch: payload.pull_request.head.git_ref,
            target_branch: payload.pull_request.base.git_ref,
            url: payload.pull_request.html_url,
        })
    }

    pub fn action(&self) -> &PrAction {
        &self.action
    }

    pub fn merged(&self) -> bool {
        self.merged
    }

    pub fn number(&self) -> u64 {
        self.number
    }
}

/// A single-commit push, as reported from inside a CI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitNotice {
    pub(crate) repository: String,
    pub(crate) branch: BranchName,
    pub(crate) author: String,
    pub(crate) sha: CommitSha,
    pub(crate) message: CommitMessage,
    pub(crate) url: String,
}

impl CommitNotice {
    pub fn new(
        repository: &str,
        branch: &str,
        author: &str,
        sha: &str,
        message: &str,
        url: &str,
    ) -> Result<Self> {
        Ok(Self {
            repository: require_text("repository", repository)?,
            branch: BranchName::parse(branch)?,
            author: author.to_string(),
            sha: CommitSha::parse(sha)?,
            message: CommitMessage::parse(message)?,
            url: require_url("commit url", url)?,
        })
    }
}

/// An event that passed classification and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedEvent {
    Push(PushEvent),
    PullRequest(PullRequestEvent),
}

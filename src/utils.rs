//! Small string helpers shared by the formatter and the request handlers.

/// Marker appended to text that was clipped.
pub const ELLIPSIS: &str = "...";

/// Strips the `refs/heads/` prefix from a git ref, leaving tags and other refs as-is.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref)
}

/// Clips `text` to at most `limit` characters, appending [`ELLIPSIS`] when anything was cut.
///
/// Counts `char`s rather than bytes so multi-byte messages are never split mid-codepoint.
pub fn clip(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}

/// First line of a commit message, trimmed.
pub fn summary_line(message: &str) -> &str {
    message.trim().lines().next().unwrap_or("").trim()
}

/// Renders a commit message for a card line.
///
/// Keeps the first line, at most `limit` characters of it, and appends
/// [`ELLIPSIS`] whenever any part of the trimmed message was left out.
pub fn commit_summary(message: &str, limit: usize) -> String {
    let full = message.trim();
    let kept: String = summary_line(full).chars().take(limit).collect();
    if kept.len() < full.len() {
        format!("{}{}", kept, ELLIPSIS)
    } else {
        kept
    }
}

/// Truncates a response body for log output.
pub fn truncate_for_log(body: &str) -> String {
    const MAX_LOGGED_BODY: usize = 200;
    clip(body, MAX_LOGGED_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_from_ref() {
        assert_eq!(branch_from_ref("refs/heads/main"), "main");
        assert_eq!(branch_from_ref("refs/heads/feature/x"), "feature/x");
        assert_eq!(branch_from_ref("refs/tags/v1.0"), "refs/tags/v1.0");
        assert_eq!(branch_from_ref("main"), "main");
    }

    #[test]
    fn test_clip_short_text_unchanged() {
        assert_eq!(clip("fix typo", 50), "fix typo");
        assert_eq!(clip(&"a".repeat(50), 50), "a".repeat(50));
    }

    #[test]
    fn test_clip_long_text() {
        let clipped = clip(&"a".repeat(51), 50);
        assert_eq!(clipped, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn test_clip_multibyte() {
        let text = "修".repeat(60);
        let clipped = clip(&text, 50);
        assert_eq!(clipped.chars().count(), 53);
        assert!(clipped.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(summary_line("  add upload\n\n- jpg\n- png"), "add upload");
        assert_eq!(summary_line("single"), "single");
        assert_eq!(summary_line(""), "");
    }

    #[test]
    fn test_commit_summary_single_line() {
        assert_eq!(commit_summary("  fix typo  ", 50), "fix typo");
        assert_eq!(commit_summary(&"a".repeat(51), 50), format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn test_commit_summary_marks_dropped_body() {
        let message = format!("fix\n\n{}", "body text ".repeat(12));
        assert_eq!(commit_summary(&message, 50), "fix...");
    }

    #[test]
    fn test_commit_summary_long_first_line_with_body() {
        let message = format!("{}\nbody", "b".repeat(60));
        assert_eq!(commit_summary(&message, 50), format!("{}...", "b".repeat(50)));
    }
}

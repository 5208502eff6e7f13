//! Typed errors for the automation engine.
//!
//! Collaborator traits speak `anyhow`; everything the engine itself returns
//! is an `AutomationError` so callers can tell a missing record from a
//! rejected publish without string matching.

use thiserror::Error;

use crate::id::RecordId;
use crate::types::record::RecordStatus;

/// Default clip length for user-visible error messages.
pub const DEFAULT_ERROR_MESSAGE_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum AutomationError {
    /// Record does not exist. Never retried.
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    /// Record exists but its owning team could not be loaded. Never retried.
    #[error("team not found for record: {0}")]
    TeamNotFound(RecordId),

    /// Every crawl attempt failed with a transient error.
    #[error("crawl failed after {attempts} attempts: {message}")]
    CrawlExhausted { attempts: u32, message: String },

    /// Crawl returned content that failed validation.
    #[error("crawl payload rejected: {0}")]
    InvalidPayload(String),

    /// Assembler, publisher, or publication bookkeeping failed.
    #[error("publish failed: {0}")]
    Publish(#[source] anyhow::Error),

    /// Publisher answered without success or without an entity id.
    #[error("publisher rejected entity: {0}")]
    PublishRejected(String),

    /// Record store read or write failed.
    #[error("storage error: {0}")]
    Store(#[source] anyhow::Error),

    /// Another run for the same record is still in flight.
    #[error("automation already running for record {0}")]
    AlreadyRunning(RecordId),

    /// Operation is not allowed from the record's current status.
    #[error("record {record_id} is {status}, expected {expected}")]
    InvalidState {
        record_id: RecordId,
        status: RecordStatus,
        expected: RecordStatus,
    },
}

impl AutomationError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AutomationError::CrawlExhausted { .. }
                | AutomationError::Publish(_)
                | AutomationError::Store(_)
                | AutomationError::AlreadyRunning(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AutomationError>;

/// Rewrite an error into something safe to show on a record.
///
/// Keeps only the first line, collapses whitespace, replaces well-known
/// infrastructure failures with plain wording and clips to `limit` chars.
pub fn sanitize_error_message(raw: &str, limit: usize) -> String {
    let first_line = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    let lowered = collapsed.to_lowercase();
    let rewritten = if lowered.contains("timed out") || lowered.contains("timeout") {
        "The request timed out. Please try again later.".to_string()
    } else if lowered.contains("429") || lowered.contains("rate limit") {
        "The upstream service is rate limiting requests. Please try again later.".to_string()
    } else if lowered.contains("connection refused") || lowered.contains("dns error") {
        "The upstream service could not be reached.".to_string()
    } else if collapsed.is_empty() {
        "Unknown error".to_string()
    } else {
        collapsed
    };

    truncate_chars(&rewritten, limit)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut clipped: String = text.chars().take(limit - 1).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_first_line_only() {
        let raw = "publisher returned 400\n  at internal::wikidata::client (client.rs:42)";
        assert_eq!(sanitize_error_message(raw, 500), "publisher returned 400");
    }

    #[test]
    fn test_rewrites_timeouts() {
        let msg = sanitize_error_message("operation timed out after 30s", 500);
        assert_eq!(msg, "The request timed out. Please try again later.");
    }

    #[test]
    fn test_rewrites_rate_limits() {
        let msg = sanitize_error_message("HTTP 429 Too Many Requests", 500);
        assert!(msg.contains("rate limiting"));
    }

    #[test]
    fn test_clips_long_messages() {
        let raw = "x".repeat(1_000);
        let msg = sanitize_error_message(&raw, 20);
        assert_eq!(msg.chars().count(), 20);
        assert!(msg.ends_with('…'));
    }

    #[test]
    fn test_empty_message_is_replaced() {
        assert_eq!(sanitize_error_message("   \n ", 500), "Unknown error");
    }

    #[test]
    fn test_retryable_classification() {
        let missing = AutomationError::RecordNotFound(RecordId::new());
        assert!(!missing.is_retryable());

        let exhausted = AutomationError::CrawlExhausted {
            attempts: 3,
            message: "boom".into(),
        };
        assert!(exhausted.is_retryable());

        let invalid = AutomationError::InvalidPayload("no title".into());
        assert!(!invalid.is_retryable());
    }
}

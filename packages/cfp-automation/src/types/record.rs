//! Business records, their owning teams, and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use typed_builder::TypedBuilder;

use crate::id::{RecordId, TeamId};

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a record.
///
/// ```text
/// pending ─► crawling ─► crawled ─► generating ─► published
///                │          ▲  ▲        │
///                ▼          │  └────────┘ (fingerprint done / not notable)
///              error ───────┘ (manual retry)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Pending,
    Crawling,
    Crawled,
    Generating,
    Published,
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Crawling => "crawling",
            RecordStatus::Crawled => "crawled",
            RecordStatus::Generating => "generating",
            RecordStatus::Published => "published",
            RecordStatus::Error => "error",
        }
    }

    /// Work is underway on the record.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, RecordStatus::Crawling | RecordStatus::Generating)
    }

    /// Whether moving from `self` to `next` is a known transition.
    ///
    /// Scheduled runs re-enter `crawling` from the resting states, and any
    /// active state may fall into `error`.
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        use RecordStatus::*;

        if *self == next {
            return true;
        }
        match (self, next) {
            (Pending | Crawled | Published | Error, Crawling) => true,
            (Crawling, Crawled) => true,
            (Crawled | Published | Error, Generating) => true,
            (Generating, Crawled | Published) => true,
            (Pending | Crawling | Crawled | Generating, Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Team
// ============================================================================

/// Subscription tier. Ordered from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Agency,
}

impl PlanTier {
    /// Parse a stored plan name. Anything unrecognised falls back to `Free`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pro" | "professional" => PlanTier::Pro,
            "agency" | "enterprise" => PlanTier::Agency,
            _ => PlanTier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Agency => "agency",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Team {
    #[builder(default)]
    pub id: TeamId,
    #[builder(default)]
    pub name: String,
    #[builder(default)]
    pub plan_tier: PlanTier,
}

// ============================================================================
// Record
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Record {
    #[builder(default)]
    pub id: RecordId,
    pub team_id: TeamId,
    pub url: String,
    #[builder(default)]
    pub name: String,
    #[builder(default, setter(strip_option))]
    pub location: Option<String>,

    #[builder(default)]
    pub status: RecordStatus,
    #[builder(default = true)]
    pub automation_enabled: bool,

    // Scheduling
    #[builder(default, setter(strip_option))]
    pub next_run_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub last_crawled_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub last_published_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub last_auto_published_at: Option<DateTime<Utc>>,

    /// Last validated crawl result. Opaque to the engine except for backfill.
    #[builder(default, setter(strip_option))]
    pub crawl_payload: Option<serde_json::Value>,
    /// Identifier assigned by the publishing system once published.
    #[builder(default, setter(strip_option))]
    pub external_entity_id: Option<String>,
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,

    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn is_published(&self) -> bool {
        self.external_entity_id.is_some()
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &RecordUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(location) = &update.location {
            self.location = location.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(enabled) = update.automation_enabled {
            self.automation_enabled = enabled;
        }
        if let Some(next_run_at) = update.next_run_at {
            self.next_run_at = next_run_at;
        }
        if let Some(at) = update.last_crawled_at {
            self.last_crawled_at = at;
        }
        if let Some(at) = update.last_published_at {
            self.last_published_at = at;
        }
        if let Some(at) = update.last_auto_published_at {
            self.last_auto_published_at = at;
        }
        if let Some(payload) = &update.crawl_payload {
            self.crawl_payload = payload.clone();
        }
        if let Some(entity_id) = &update.external_entity_id {
            self.external_entity_id = entity_id.clone();
        }
        if let Some(message) = &update.error_message {
            self.error_message = message.clone();
        }
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Partial update
// ============================================================================

/// Partial write against a record.
///
/// `None` leaves a field untouched. Nullable columns use `Option<Option<T>>`
/// so that `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub name: Option<String>,
    pub location: Option<Option<String>>,
    pub status: Option<RecordStatus>,
    pub automation_enabled: Option<bool>,
    pub next_run_at: Option<Option<DateTime<Utc>>>,
    pub last_crawled_at: Option<Option<DateTime<Utc>>>,
    pub last_published_at: Option<Option<DateTime<Utc>>>,
    pub last_auto_published_at: Option<Option<DateTime<Utc>>>,
    pub crawl_payload: Option<Option<serde_json::Value>>,
    pub external_entity_id: Option<Option<String>>,
    pub error_message: Option<Option<String>>,
}

impl RecordUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status-only write.
    pub fn status(status: RecordStatus) -> Self {
        Self::new().with_status(status)
    }

    /// Move to `error` with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new()
            .with_status(RecordStatus::Error)
            .with_error_message(Some(message.into()))
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_next_run_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.next_run_at = Some(at);
        self
    }

    pub fn with_last_crawled_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_crawled_at = Some(Some(at));
        self
    }

    pub fn with_last_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_published_at = Some(Some(at));
        self
    }

    pub fn with_last_auto_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_auto_published_at = Some(Some(at));
        self
    }

    pub fn with_crawl_payload(mut self, payload: serde_json::Value) -> Self {
        self.crawl_payload = Some(Some(payload));
        self
    }

    pub fn with_external_entity_id(mut self, id: impl Into<String>) -> Self {
        self.external_entity_id = Some(Some(id.into()));
        self
    }

    pub fn with_error_message(mut self, message: Option<String>) -> Self {
        self.error_message = Some(message);
        self
    }

    /// Clear any stale error message.
    pub fn clear_error(self) -> Self {
        self.with_error_message(None)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::builder()
            .team_id(TeamId::new())
            .url("https://example.com")
            .name("Example Bakery")
            .build()
    }

    #[test]
    fn test_builder_defaults() {
        let record = record();
        assert_eq!(record.status, RecordStatus::Pending);
        assert!(record.automation_enabled);
        assert!(record.next_run_at.is_none());
        assert!(!record.is_published());
    }

    #[test]
    fn test_apply_leaves_untouched_fields() {
        let mut record = record();
        record.apply(&RecordUpdate::status(RecordStatus::Crawling));

        assert_eq!(record.status, RecordStatus::Crawling);
        assert_eq!(record.name, "Example Bakery");
        assert_eq!(record.url, "https://example.com");
    }

    #[test]
    fn test_apply_can_clear_nullable_fields() {
        let mut record = record();
        record.apply(&RecordUpdate::failed("boom"));
        assert_eq!(record.error_message.as_deref(), Some("boom"));

        record.apply(&RecordUpdate::status(RecordStatus::Crawling).clear_error());
        assert!(record.error_message.is_none());
    }

    #[test]
    fn test_unknown_plan_falls_back_to_free() {
        assert_eq!(PlanTier::parse_lenient("pro"), PlanTier::Pro);
        assert_eq!(PlanTier::parse_lenient(" Agency "), PlanTier::Agency);
        assert_eq!(PlanTier::parse_lenient("platinum"), PlanTier::Free);
        assert_eq!(PlanTier::parse_lenient(""), PlanTier::Free);
    }

    #[test]
    fn test_documented_transitions_are_allowed() {
        use RecordStatus::*;

        let allowed = [
            (Pending, Crawling),
            (Crawling, Crawled),
            (Crawling, Error),
            (Crawled, Generating),
            (Generating, Crawled),
            (Generating, Published),
            (Generating, Error),
            (Error, Crawling),
            (Error, Generating),
        ];
        for (from, to) in allowed {
            assert!(from.can_transition_to(to), "{} -> {}", from, to);
        }
    }

    #[test]
    fn test_undocumented_transitions_are_rejected() {
        use RecordStatus::*;

        assert!(!Pending.can_transition_to(Published));
        assert!(!Crawling.can_transition_to(Published));
        assert!(!Published.can_transition_to(Error));
        assert!(!Error.can_transition_to(Published));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&RecordStatus::Generating).unwrap();
        assert_eq!(json, "\"generating\"");
    }
}

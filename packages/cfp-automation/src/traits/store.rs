//! Storage traits for records, fingerprints and fallback entities.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::id::RecordId;
use crate::types::{
    fingerprint::Fingerprint,
    publish::{FallbackMeta, PublicationRecord},
    record::{Record, RecordUpdate, Team},
};

/// Transactional key-value access to records and their teams.
///
/// Every write is a single-record read-modify-write. Callers guarantee at
/// most one automation run per record id at a time.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record(&self, id: RecordId) -> Result<Option<Record>>;

    /// Apply a partial update. Updating a missing record is an error.
    async fn update_record(&self, id: RecordId, update: RecordUpdate) -> Result<()>;

    /// Team owning the record.
    async fn get_team_for(&self, id: RecordId) -> Result<Option<Team>>;

    async fn create_publication_record(&self, publication: PublicationRecord) -> Result<()>;

    /// Number of publications already stored for a record.
    async fn publication_count(&self, id: RecordId) -> Result<u32>;

    /// Automation-enabled records with their teams where `next_run_at` is unset
    /// or `<= due_before`, plus, when `stale_before` is given, records whose
    /// `last_crawled_at` is unset or older than it.
    async fn find_automation_candidates(
        &self,
        due_before: DateTime<Utc>,
        stale_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<(Record, Team)>>;
}

/// Append-only fingerprint history.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn append_fingerprint(&self, fingerprint: Fingerprint) -> Result<()>;

    /// Newest fingerprint for a record.
    async fn latest_fingerprint(&self, record_id: RecordId) -> Result<Option<Fingerprint>>;
}

/// Side-channel holding assembled entities so a human can finish publication.
///
/// Callers treat failures as best-effort: logged, never propagated.
#[async_trait]
pub trait ManualFallbackStore: Send + Sync {
    async fn store(
        &self,
        record_id: RecordId,
        entity: serde_json::Value,
        meta: FallbackMeta,
    ) -> Result<()>;
}

//! In-memory storage implementation for testing and development.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::id::{RecordId, TeamId};
use crate::traits::store::{FingerprintStore, ManualFallbackStore, RecordStore};
use crate::types::{
    fingerprint::Fingerprint,
    publish::{FallbackMeta, PublicationRecord},
    record::{Record, RecordStatus, RecordUpdate, Team},
};

/// Entity snapshot kept for manual publication.
#[derive(Debug, Clone)]
pub struct FallbackEntry {
    pub entity: serde_json::Value,
    pub meta: FallbackMeta,
}

/// In-memory storage for records, teams, fingerprints and publications.
///
/// Every status written through [`RecordStore::update_record`] is also kept
/// in a per-record history so tests can assert on the path a record took.
/// Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordId, Record>>,
    teams: RwLock<HashMap<TeamId, Team>>,
    publications: RwLock<Vec<PublicationRecord>>,
    fingerprints: RwLock<Vec<Fingerprint>>,
    fallback: RwLock<HashMap<RecordId, Vec<FallbackEntry>>>,
    status_history: RwLock<HashMap<RecordId, Vec<RecordStatus>>>,
    fail_fallback: AtomicBool,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_team(&self, team: Team) -> TeamId {
        let id = team.id;
        write(&self.teams).insert(id, team);
        id
    }

    pub fn insert_record(&self, record: Record) -> RecordId {
        let id = record.id;
        write(&self.records).insert(id, record);
        id
    }

    /// Snapshot of a record.
    pub fn record(&self, id: RecordId) -> Option<Record> {
        read(&self.records).get(&id).cloned()
    }

    pub fn status(&self, id: RecordId) -> Option<RecordStatus> {
        read(&self.records).get(&id).map(|r| r.status)
    }

    /// Statuses written for a record, oldest first.
    pub fn status_history(&self, id: RecordId) -> Vec<RecordStatus> {
        read(&self.status_history)
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn publications(&self, id: RecordId) -> Vec<PublicationRecord> {
        read(&self.publications)
            .iter()
            .filter(|p| p.record_id == id)
            .cloned()
            .collect()
    }

    pub fn fingerprint_count(&self, id: RecordId) -> usize {
        read(&self.fingerprints)
            .iter()
            .filter(|f| f.record_id == id)
            .count()
    }

    pub fn fallback_entries(&self, id: RecordId) -> Vec<FallbackEntry> {
        read(&self.fallback).get(&id).cloned().unwrap_or_default()
    }

    pub fn fallback_count(&self, id: RecordId) -> usize {
        read(&self.fallback).get(&id).map_or(0, Vec::len)
    }

    /// Make every fallback write fail until switched off again.
    pub fn set_fail_fallback(&self, fail: bool) {
        self.fail_fallback.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, id: RecordId) -> Result<Option<Record>> {
        Ok(self.record(id))
    }

    async fn update_record(&self, id: RecordId, update: RecordUpdate) -> Result<()> {
        {
            let mut records = write(&self.records);
            let record = records
                .get_mut(&id)
                .ok_or_else(|| anyhow!("record {} not found", id))?;
            record.apply(&update);
        }
        if let Some(status) = update.status {
            write(&self.status_history).entry(id).or_default().push(status);
        }
        Ok(())
    }

    async fn get_team_for(&self, id: RecordId) -> Result<Option<Team>> {
        let team_id = match read(&self.records).get(&id) {
            Some(record) => record.team_id,
            None => return Ok(None),
        };
        Ok(read(&self.teams).get(&team_id).cloned())
    }

    async fn create_publication_record(&self, publication: PublicationRecord) -> Result<()> {
        write(&self.publications).push(publication);
        Ok(())
    }

    async fn publication_count(&self, id: RecordId) -> Result<u32> {
        let count = read(&self.publications)
            .iter()
            .filter(|p| p.record_id == id)
            .count();
        Ok(u32::try_from(count)?)
    }

    async fn find_automation_candidates(
        &self,
        due_before: DateTime<Utc>,
        stale_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<(Record, Team)>> {
        let records = read(&self.records);
        let teams = read(&self.teams);

        let mut candidates: Vec<(Record, Team)> = records
            .values()
            .filter(|r| r.automation_enabled)
            .filter(|r| {
                let due = r.next_run_at.map_or(true, |next| next <= due_before);
                let stale = stale_before
                    .map_or(false, |cutoff| r.last_crawled_at.map_or(true, |at| at < cutoff));
                due || stale
            })
            .filter_map(|r| teams.get(&r.team_id).map(|t| (r.clone(), t.clone())))
            .collect();

        // Oldest due first; ids are time-ordered so this is stable across calls.
        candidates.sort_by_key(|(r, _)| (r.next_run_at, r.id));
        Ok(candidates)
    }
}

#[async_trait]
impl FingerprintStore for MemoryStore {
    async fn append_fingerprint(&self, fingerprint: Fingerprint) -> Result<()> {
        write(&self.fingerprints).push(fingerprint);
        Ok(())
    }

    async fn latest_fingerprint(&self, record_id: RecordId) -> Result<Option<Fingerprint>> {
        Ok(read(&self.fingerprints)
            .iter()
            .rev()
            .find(|f| f.record_id == record_id)
            .cloned())
    }
}

#[async_trait]
impl ManualFallbackStore for MemoryStore {
    async fn store(
        &self,
        record_id: RecordId,
        entity: serde_json::Value,
        meta: FallbackMeta,
    ) -> Result<()> {
        if self.fail_fallback.load(Ordering::SeqCst) {
            anyhow::bail!("fallback storage unavailable");
        }
        write(&self.fallback)
            .entry(record_id)
            .or_default()
            .push(FallbackEntry { entity, meta });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fingerprint::AnalysisResult;
    use chrono::Duration;

    fn seed(store: &MemoryStore) -> (TeamId, RecordId) {
        let team_id = store.insert_team(Team::builder().name("Acme").build());
        let record_id = store.insert_record(
            Record::builder()
                .team_id(team_id)
                .url("https://acme.test")
                .name("Acme")
                .build(),
        );
        (team_id, record_id)
    }

    #[tokio::test]
    async fn test_update_applies_and_tracks_status() {
        let store = MemoryStore::new();
        let (_, id) = seed(&store);

        store
            .update_record(id, RecordUpdate::status(RecordStatus::Crawling))
            .await
            .unwrap();
        store
            .update_record(id, RecordUpdate::failed("boom"))
            .await
            .unwrap();

        let record = store.record(id).unwrap();
        assert_eq!(record.status, RecordStatus::Error);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
        assert_eq!(
            store.status_history(id),
            vec![RecordStatus::Crawling, RecordStatus::Error]
        );
    }

    #[tokio::test]
    async fn test_update_missing_record_errors() {
        let store = MemoryStore::new();
        let result = store
            .update_record(RecordId::new(), RecordUpdate::status(RecordStatus::Crawled))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_team_lookup_follows_record() {
        let store = MemoryStore::new();
        let (team_id, id) = seed(&store);

        let team = store.get_team_for(id).await.unwrap().unwrap();
        assert_eq!(team.id, team_id);
        assert!(store.get_team_for(RecordId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_candidates_respect_due_and_stale() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let (_, due) = seed(&store);
        let (_, future) = seed(&store);
        let (_, disabled) = seed(&store);

        store
            .update_record(
                future,
                RecordUpdate::new()
                    .with_next_run_at(Some(now + Duration::days(3)))
                    .with_last_crawled_at(now - Duration::days(60)),
            )
            .await
            .unwrap();
        store
            .update_record(
                disabled,
                RecordUpdate {
                    automation_enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ids = |candidates: Vec<(Record, Team)>| -> Vec<RecordId> {
            candidates.into_iter().map(|(r, _)| r.id).collect()
        };

        let only_due = store.find_automation_candidates(now, None).await.unwrap();
        assert_eq!(ids(only_due), vec![due]);

        let with_stale = store
            .find_automation_candidates(now, Some(now - Duration::days(30)))
            .await
            .unwrap();
        let with_stale = ids(with_stale);
        assert!(with_stale.contains(&due));
        assert!(with_stale.contains(&future));
        assert!(!with_stale.contains(&disabled));
    }

    #[tokio::test]
    async fn test_latest_fingerprint_is_newest() {
        let store = MemoryStore::new();
        let (_, id) = seed(&store);

        for score in [10.0, 20.0] {
            let analysis = AnalysisResult {
                visibility_score: score,
                ..Default::default()
            };
            store
                .append_fingerprint(Fingerprint::from_analysis(id, analysis))
                .await
                .unwrap();
        }

        let latest = store.latest_fingerprint(id).await.unwrap().unwrap();
        assert_eq!(latest.visibility_score, 20.0);
        assert_eq!(store.fingerprint_count(id), 2);
    }
}

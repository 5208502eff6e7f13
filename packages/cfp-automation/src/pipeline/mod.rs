//! The CFP pipeline: crawl, fingerprint, publish and the orchestrator that
//! composes them for one record.
//!
//! ```text
//! CfpOrchestrator::run(record)
//!     ├─► CrawlExecutor ──────┐   (concurrent)
//!     ├─► FingerprintExecutor ┘
//!     ├─► reconcile status
//!     └─► PublishDecision      (after crawl, when allowed)
//! ```

pub mod backfill;
pub mod crawl;
pub mod fingerprint;
pub mod orchestrator;
pub mod publish;

pub use crawl::{backoff_delay, CrawlExecutor};
pub use fingerprint::FingerprintExecutor;
pub use orchestrator::CfpOrchestrator;
pub use publish::PublishDecision;

use tracing::warn;

use crate::error::{sanitize_error_message, AutomationError, Result};
use crate::id::RecordId;
use crate::traits::store::RecordStore;
use crate::types::record::{Record, RecordStatus, RecordUpdate, Team};

pub(crate) async fn load_record(records: &dyn RecordStore, id: RecordId) -> Result<Record> {
    records
        .get_record(id)
        .await
        .map_err(AutomationError::Store)?
        .ok_or(AutomationError::RecordNotFound(id))
}

pub(crate) async fn load_team(records: &dyn RecordStore, id: RecordId) -> Result<Team> {
    records
        .get_team_for(id)
        .await
        .map_err(AutomationError::Store)?
        .ok_or(AutomationError::TeamNotFound(id))
}

pub(crate) async fn current_status(
    records: &dyn RecordStore,
    id: RecordId,
) -> Result<RecordStatus> {
    Ok(load_record(records, id).await?.status)
}

/// Write a status change, flagging transitions outside the state machine.
///
/// The store stays authoritative: an unexpected transition is logged, not
/// refused.
pub(crate) async fn transition(
    records: &dyn RecordStore,
    id: RecordId,
    from: RecordStatus,
    update: RecordUpdate,
) -> Result<()> {
    if let Some(to) = update.status {
        if !from.can_transition_to(to) {
            warn!(record_id = %id, from = %from, to = %to, "Unexpected status transition");
        }
    }
    records
        .update_record(id, update)
        .await
        .map_err(AutomationError::Store)
}

/// Move a record to `error` unless it is already there.
///
/// Returns whether a write happened. An existing `error` keeps its original
/// message.
pub(crate) async fn mark_error_once(
    records: &dyn RecordStore,
    id: RecordId,
    message: &str,
    limit: usize,
) -> Result<bool> {
    let status = current_status(records, id).await?;
    if status == RecordStatus::Error {
        return Ok(false);
    }
    let update = RecordUpdate::failed(sanitize_error_message(message, limit));
    transition(records, id, status, update).await?;
    Ok(true)
}

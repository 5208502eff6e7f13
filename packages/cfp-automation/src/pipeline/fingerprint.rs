//! Fingerprint stage: one LLM visibility analysis per run.
//!
//! Fingerprinting enriches a record but never blocks the pipeline, so every
//! failure here is logged and reported as `ok: false` instead of an error.

use tracing::{info, warn};

use crate::deps::AutomationDeps;
use crate::id::RecordId;
use crate::pipeline::{current_status, load_record, transition};
use crate::types::{
    fingerprint::{Fingerprint, FingerprintRunResult},
    record::{RecordStatus, RecordUpdate},
};

#[derive(Clone)]
pub struct FingerprintExecutor {
    deps: AutomationDeps,
}

impl FingerprintExecutor {
    pub fn new(deps: AutomationDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, record_id: RecordId) -> FingerprintRunResult {
        let records = self.deps.records.as_ref();

        let record = match load_record(records, record_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Fingerprint skipped, record unavailable");
                return FingerprintRunResult { ok: false };
            }
        };

        // Only a record resting in `crawled` is marked; mid-crawl records keep
        // their crawl status.
        let prior = record.status;
        let marked = prior == RecordStatus::Crawled
            && match transition(
                records,
                record_id,
                prior,
                RecordUpdate::status(RecordStatus::Generating),
            )
            .await
            {
                Ok(()) => true,
                Err(e) => {
                    warn!(record_id = %record_id, error = %e, "Could not mark record generating");
                    false
                }
            };

        let ok = match self.deps.analyzer.analyze(&record).await {
            Ok(analysis) => {
                let fingerprint = Fingerprint::from_analysis(record_id, analysis);
                let score = fingerprint.visibility_score;
                match self.deps.fingerprints.append_fingerprint(fingerprint).await {
                    Ok(()) => {
                        info!(record_id = %record_id, visibility_score = score, "Fingerprint stored");
                        true
                    }
                    Err(e) => {
                        warn!(record_id = %record_id, error = %e, "Failed to store fingerprint");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Fingerprint analysis failed");
                false
            }
        };

        if marked {
            self.restore(record_id, prior).await;
        }

        FingerprintRunResult { ok }
    }

    /// Put the pre-call status back, unless another step already moved on.
    async fn restore(&self, record_id: RecordId, prior: RecordStatus) {
        let records = self.deps.records.as_ref();
        match current_status(records, record_id).await {
            Ok(RecordStatus::Generating) => {
                if let Err(e) = transition(
                    records,
                    record_id,
                    RecordStatus::Generating,
                    RecordUpdate::status(prior),
                )
                .await
                {
                    warn!(record_id = %record_id, error = %e, "Failed to restore status after fingerprint");
                }
            }
            Ok(status) => {
                info!(record_id = %record_id, status = %status, "Status advanced during fingerprint, leaving it");
            }
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Could not re-read status after fingerprint");
            }
        }
    }
}

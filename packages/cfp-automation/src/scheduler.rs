//! Batch processing of records due for automation.
//!
//! ```text
//! process_due()
//!     │
//!     ├─► find_automation_candidates(now, stale cutoff?)
//!     │
//!     └─► chunks of batch_size ─► tokio::spawn per record ─► join_all
//!             └─► skip manual / not due / in flight
//!             └─► CfpOrchestrator::run(RunOptions::scheduled())
//! ```

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::deps::AutomationDeps;
use crate::error::{AutomationError, Result};
use crate::pipeline::CfpOrchestrator;
use crate::policy::{config_for, is_crawl_due, is_stale};
use crate::runs::InFlightRuns;
use crate::types::{
    record::{Record, Team},
    run::{ProcessOptions, ProcessSummary, RunOptions},
};

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Skipped,
    Failed,
}

#[derive(Clone)]
pub struct Scheduler {
    orchestrator: CfpOrchestrator,
    deps: AutomationDeps,
    in_flight: InFlightRuns,
}

impl Scheduler {
    pub fn new(orchestrator: CfpOrchestrator, deps: AutomationDeps, in_flight: InFlightRuns) -> Self {
        Self {
            orchestrator,
            deps,
            in_flight,
        }
    }

    /// Options taken from the engine config.
    pub fn default_options(&self) -> ProcessOptions {
        ProcessOptions {
            batch_size: self.deps.config.batch_size,
            catch_missed: self.deps.config.catch_missed,
        }
    }

    /// Run every due record once.
    ///
    /// Records inside a batch run concurrently; batches run one after the
    /// other. A failing record never aborts the pass, only the candidate
    /// query itself can fail it.
    pub async fn process_due(&self, options: ProcessOptions) -> Result<ProcessSummary> {
        let now = Utc::now();
        let stale_before = options
            .catch_missed
            .then(|| now - self.deps.config.stale_window());

        let candidates = self
            .deps
            .records
            .find_automation_candidates(now, stale_before)
            .await
            .map_err(AutomationError::Store)?;

        let mut seen = HashSet::new();
        let candidates: Vec<(Record, Team)> = candidates
            .into_iter()
            .filter(|(record, _)| seen.insert(record.id))
            .collect();

        let mut summary = ProcessSummary {
            total: candidates.len(),
            ..Default::default()
        };

        if candidates.is_empty() {
            debug!("No records due for automation");
            return Ok(summary);
        }

        info!(
            total = candidates.len(),
            batch_size = options.batch_size,
            catch_missed = options.catch_missed,
            "Processing due records"
        );

        for batch in candidates.chunks(options.batch_size.max(1)) {
            let handles = batch.iter().cloned().map(|(record, team)| {
                let scheduler = self.clone();
                tokio::spawn(async move { scheduler.process_one(record, team, now, options).await })
            });

            for joined in join_all(handles).await {
                match joined {
                    Ok(Outcome::Success) => summary.success += 1,
                    Ok(Outcome::Skipped) => summary.skipped += 1,
                    Ok(Outcome::Failed) => summary.failed += 1,
                    Err(e) => {
                        error!(error = %e, "Record task panicked or was cancelled");
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            total = summary.total,
            success = summary.success,
            skipped = summary.skipped,
            failed = summary.failed,
            "Scheduler pass complete"
        );

        Ok(summary)
    }

    async fn process_one(
        &self,
        record: Record,
        team: Team,
        now: DateTime<Utc>,
        options: ProcessOptions,
    ) -> Outcome {
        let record_id = record.id;
        let policy = config_for(team.plan_tier);

        if policy.crawl_cadence.is_manual() {
            debug!(record_id = %record_id, plan = %team.plan_tier, "Manual cadence, skipping");
            return Outcome::Skipped;
        }

        let due = is_crawl_due(&record, &policy, now)
            || (options.catch_missed
                && record.automation_enabled
                && is_stale(&record, now, self.deps.config.stale_window()));
        if !due {
            debug!(record_id = %record_id, next_run_at = ?record.next_run_at, "Not due, skipping");
            return Outcome::Skipped;
        }

        let Some(_guard) = self.in_flight.try_acquire(record_id) else {
            info!(record_id = %record_id, "Run already in progress, skipping");
            return Outcome::Skipped;
        };

        match self.orchestrator.run(record_id, RunOptions::scheduled()).await {
            Ok(result) if result.is_success() => Outcome::Success,
            Ok(result) => {
                warn!(
                    record_id = %record_id,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "Scheduled run failed"
                );
                Outcome::Failed
            }
            Err(e) => {
                error!(
                    record_id = %record_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Scheduled run errored"
                );
                Outcome::Failed
            }
        }
    }
}

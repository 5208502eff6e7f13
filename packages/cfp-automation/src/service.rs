//! Entry points for callers outside the scheduler: manual runs and retries.

use tokio_cron_scheduler::JobScheduler;
use tracing::info;

use crate::deps::AutomationDeps;
use crate::error::{AutomationError, Result};
use crate::id::RecordId;
use crate::pipeline::{load_record, CfpOrchestrator};
use crate::runs::InFlightRuns;
use crate::scheduled_tasks::start_scheduler;
use crate::scheduler::Scheduler;
use crate::types::{
    publish::{PublishDisposition, PublishTrigger},
    record::RecordStatus,
    run::{CfpRunResult, RunOptions},
};

/// What a retry ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// The record already had a crawl payload; only publish was retried.
    Published(PublishDisposition),
    /// No payload; the full pipeline ran again.
    Rerun(CfpRunResult),
}

#[derive(Clone)]
pub struct AutomationService {
    orchestrator: CfpOrchestrator,
    scheduler: Scheduler,
    deps: AutomationDeps,
    in_flight: InFlightRuns,
}

impl AutomationService {
    pub fn new(deps: AutomationDeps) -> Self {
        let orchestrator = CfpOrchestrator::new(deps.clone());
        let in_flight = InFlightRuns::new();
        let scheduler = Scheduler::new(orchestrator.clone(), deps.clone(), in_flight.clone());
        Self {
            orchestrator,
            scheduler,
            deps,
            in_flight,
        }
    }

    /// Scheduler sharing this service's in-flight registry.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn in_flight(&self) -> &InFlightRuns {
        &self.in_flight
    }

    /// Start the cron job on the configured schedule and batch options.
    pub async fn start(&self) -> anyhow::Result<JobScheduler> {
        start_scheduler(
            self.scheduler.clone(),
            &self.deps.config.schedule,
            self.scheduler.default_options(),
        )
        .await
    }

    /// Run the pipeline for one record now.
    pub async fn trigger(&self, record_id: RecordId, options: RunOptions) -> Result<CfpRunResult> {
        let _guard = self
            .in_flight
            .try_acquire(record_id)
            .ok_or(AutomationError::AlreadyRunning(record_id))?;

        info!(record_id = %record_id, auto_publish = ?options.auto_publish, "Manual CFP run");
        self.orchestrator.run(record_id, options).await
    }

    /// Recover a record stuck in `error`.
    ///
    /// With a crawl payload on file only publish is retried, bypassing the
    /// plan's auto-publish flag. Without one the whole pipeline runs again,
    /// leaving the schedule alone.
    pub async fn retry(&self, record_id: RecordId) -> Result<RetryOutcome> {
        let _guard = self
            .in_flight
            .try_acquire(record_id)
            .ok_or(AutomationError::AlreadyRunning(record_id))?;

        let record = load_record(self.deps.records.as_ref(), record_id).await?;
        if record.status != RecordStatus::Error {
            return Err(AutomationError::InvalidState {
                record_id,
                status: record.status,
                expected: RecordStatus::Error,
            });
        }

        if record.crawl_payload.is_some() {
            info!(record_id = %record_id, "Retrying publish from stored payload");
            let disposition = self
                .orchestrator
                .publish_decision()
                .run_with(record_id, PublishTrigger::Manual)
                .await?;
            Ok(RetryOutcome::Published(disposition))
        } else {
            info!(record_id = %record_id, "Retrying full pipeline");
            let result = self
                .orchestrator
                .run(record_id, RunOptions::default().with_schedule_next(false))
                .await?;
            Ok(RetryOutcome::Rerun(result))
        }
    }
}

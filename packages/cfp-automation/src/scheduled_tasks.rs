//! Cron registration for the automation scheduler.
//!
//! ```text
//! JobScheduler (cron, default hourly)
//!     │
//!     └─► Scheduler::process_due(options)
//!             └─► summary logged; errors logged, never propagated
//! ```

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::scheduler::Scheduler;
use crate::types::run::ProcessOptions;

/// Register the automation pass on `schedule` (six-field cron) and start it.
///
/// An invalid expression fails here, before anything is started.
pub async fn start_scheduler(
    scheduler: Scheduler,
    schedule: &str,
    options: ProcessOptions,
) -> Result<JobScheduler> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let scheduler = scheduler.clone();
        Box::pin(async move {
            match scheduler.process_due(options).await {
                Ok(summary) => tracing::info!(
                    total = summary.total,
                    success = summary.success,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "Automation pass finished"
                ),
                Err(e) => tracing::error!("Automation pass failed: {}", e),
            }
        })
    })
    .with_context(|| format!("invalid automation schedule '{}'", schedule))?;

    let cron = JobScheduler::new().await?;
    cron.add(job).await?;
    cron.start().await?;

    tracing::info!(schedule, "Automation scheduler started");
    Ok(cron)
}

//! One full CFP run for a single record.

use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::deps::AutomationDeps;
use crate::error::Result;
use crate::id::RecordId;
use crate::pipeline::{
    current_status, load_record, load_team, mark_error_once, transition, CrawlExecutor,
    FingerprintExecutor, PublishDecision,
};
use crate::policy::{config_for, next_run_after, AutomationPolicyConfig};
use crate::types::{
    publish::PublishTrigger,
    record::{RecordStatus, RecordUpdate},
    run::{CfpRunResult, RunOptions},
};

#[derive(Clone)]
pub struct CfpOrchestrator {
    deps: AutomationDeps,
    crawl: CrawlExecutor,
    fingerprint: FingerprintExecutor,
    publish: PublishDecision,
}

impl CfpOrchestrator {
    pub fn new(deps: AutomationDeps) -> Self {
        Self {
            crawl: CrawlExecutor::new(deps.clone()),
            fingerprint: FingerprintExecutor::new(deps.clone()),
            publish: PublishDecision::new(deps.clone()),
            deps,
        }
    }

    pub fn publish_decision(&self) -> &PublishDecision {
        &self.publish
    }

    /// Run crawl and fingerprint concurrently, then publish if allowed.
    ///
    /// Only a missing record/team or a failing store write before the stages
    /// start is returned as `Err`; stage failures are reported in the result.
    pub async fn run(&self, record_id: RecordId, options: RunOptions) -> Result<CfpRunResult> {
        let started = Instant::now();
        let records = self.deps.records.as_ref();

        let record = load_record(records, record_id).await?;
        let team = load_team(records, record_id).await?;
        let policy = config_for(team.plan_tier);

        info!(
            record_id = %record_id,
            plan = %team.plan_tier,
            status = %record.status,
            "Starting CFP run"
        );

        // Claim `crawling` before the stages start so the fingerprint step
        // never marks a record the crawl is about to work on.
        if !record.status.is_in_progress() {
            transition(
                records,
                record_id,
                record.status,
                RecordUpdate::status(RecordStatus::Crawling).clear_error(),
            )
            .await?;
        }

        let mut result = CfpRunResult::default();

        // Independent sources: neither failure cancels the other.
        let (crawl, fingerprint) =
            tokio::join!(self.crawl.run(record_id), self.fingerprint.run(record_id));

        result.crawl_ok = match crawl {
            Ok(crawl) => {
                result.error = crawl.error;
                crawl.ok
            }
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Crawl stage errored");
                result.error = Some(e.to_string());
                false
            }
        };
        result.fingerprint_ok = fingerprint.ok;

        // A failed fingerprint is retried once, and only with a fresh crawl behind it.
        if result.crawl_ok && !result.fingerprint_ok {
            info!(record_id = %record_id, "Retrying fingerprint against fresh crawl");
            result.fingerprint_ok = self.fingerprint.run(record_id).await.ok;
        }

        if let Err(e) = self
            .reconcile(record_id, result.crawl_ok, result.fingerprint_ok)
            .await
        {
            warn!(record_id = %record_id, error = %e, "Status reconciliation failed");
        }

        if result.crawl_ok && should_publish(options, &policy) {
            let trigger = if policy.auto_publish_enabled {
                PublishTrigger::Automatic
            } else {
                PublishTrigger::Manual
            };
            match self.publish.run_with(record_id, trigger).await {
                Ok(disposition) => result.publish_ok = disposition.is_published(),
                Err(e) => {
                    // Crawl + fingerprint is still a valid outcome.
                    warn!(record_id = %record_id, error = %e, "Publish failed, run continues");
                    result.error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        if options.schedule_next {
            if let Some(next) = next_run_after(policy.crawl_cadence, Utc::now()) {
                if let Err(e) = records
                    .update_record(record_id, RecordUpdate::new().with_next_run_at(Some(next)))
                    .await
                {
                    warn!(record_id = %record_id, error = %e, "Failed to schedule next run");
                }
            }
        }

        result.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            record_id = %record_id,
            crawl_ok = result.crawl_ok,
            fingerprint_ok = result.fingerprint_ok,
            publish_ok = result.publish_ok,
            duration_ms = result.duration_ms,
            "CFP run finished"
        );

        Ok(result)
    }

    /// Both ok → `crawled`; both failed → `error`; partial → untouched, so
    /// the record reads as retry-later rather than failed.
    async fn reconcile(&self, record_id: RecordId, crawl_ok: bool, fingerprint_ok: bool) -> Result<()> {
        let records = self.deps.records.as_ref();
        match (crawl_ok, fingerprint_ok) {
            (true, true) => {
                let status = current_status(records, record_id).await?;
                if status != RecordStatus::Crawled {
                    transition(
                        records,
                        record_id,
                        status,
                        RecordUpdate::status(RecordStatus::Crawled),
                    )
                    .await?;
                }
            }
            (false, false) => {
                mark_error_once(
                    records,
                    record_id,
                    "crawl and fingerprint both failed",
                    self.deps.config.error_message_limit,
                )
                .await?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn should_publish(options: RunOptions, policy: &AutomationPolicyConfig) -> bool {
    options.auto_publish.unwrap_or(policy.auto_publish_enabled)
}

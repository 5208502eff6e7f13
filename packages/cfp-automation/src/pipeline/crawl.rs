//! Crawl stage: bounded retries with exponential backoff.

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::deps::AutomationDeps;
use crate::error::{AutomationError, Result};
use crate::id::RecordId;
use crate::pipeline::{backfill, load_record, mark_error_once, transition};
use crate::policy::{config_for, next_run_after};
use crate::types::{
    crawl::CrawlRunResult,
    record::{Record, RecordStatus, RecordUpdate},
};

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Delay slept after failed attempt number `attempt` (1-based): `base * 2^(attempt-1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Why one attempt did not produce a usable payload.
enum AttemptFailure {
    /// Worth another attempt.
    Transient(String),
    /// The site content itself is bad; retrying will not help.
    Invalid(String),
}

#[derive(Clone)]
pub struct CrawlExecutor {
    deps: AutomationDeps,
}

impl CrawlExecutor {
    pub fn new(deps: AutomationDeps) -> Self {
        Self { deps }
    }

    /// Crawl a record's site and persist the payload.
    ///
    /// Crawl failures come back as `Ok` with `ok: false` after the record was
    /// moved to `error`; `Err` is reserved for a missing record or a store
    /// failure.
    pub async fn run(&self, record_id: RecordId) -> Result<CrawlRunResult> {
        let records = self.deps.records.as_ref();
        let record = load_record(records, record_id).await?;

        transition(
            records,
            record_id,
            record.status,
            RecordUpdate::status(RecordStatus::Crawling),
        )
        .await?;

        let max_attempts = self.deps.config.crawl_max_attempts.max(1);
        let base_delay = self.deps.config.crawl_base_delay;
        let mut last_error = String::from("crawl did not run");

        for attempt in 1..=max_attempts {
            debug!(
                record_id = %record_id,
                attempt,
                crawler = self.deps.crawler.name(),
                "Crawl attempt"
            );

            match self.attempt(&record.url).await {
                Ok(payload) => {
                    self.persist_success(&record, payload).await?;
                    info!(record_id = %record_id, attempts = attempt, "Crawl succeeded");
                    return Ok(CrawlRunResult::succeeded(attempt));
                }
                Err(AttemptFailure::Invalid(reason)) => {
                    error!(
                        record_id = %record_id,
                        attempt,
                        reason = %reason,
                        "Crawl payload failed validation, not retrying"
                    );
                    let err = AutomationError::InvalidPayload(reason);
                    self.persist_failure(record_id, &err).await?;
                    return Ok(CrawlRunResult::failed(attempt, err.to_string()));
                }
                Err(AttemptFailure::Transient(reason)) => {
                    last_error = reason;
                    if attempt < max_attempts {
                        let delay = backoff_delay(base_delay, attempt);
                        warn!(
                            record_id = %record_id,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_error,
                            "Crawl attempt failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let err = AutomationError::CrawlExhausted {
            attempts: max_attempts,
            message: last_error,
        };
        error!(record_id = %record_id, error = %err, "Crawl retries exhausted");
        self.persist_failure(record_id, &err).await?;
        Ok(CrawlRunResult::failed(max_attempts, err.to_string()))
    }

    async fn attempt(&self, url: &str) -> std::result::Result<serde_json::Value, AttemptFailure> {
        let response = self
            .deps
            .crawler
            .crawl(url)
            .await
            .map_err(|e| AttemptFailure::Transient(e.to_string()))?;

        if !response.success {
            return Err(AttemptFailure::Transient(
                response
                    .error
                    .clone()
                    .unwrap_or_else(|| "crawler reported failure".to_string()),
            ));
        }

        let payload = response
            .payload()
            .cloned()
            .ok_or_else(|| AttemptFailure::Transient("crawler returned an empty payload".into()))?;

        self.deps
            .validator
            .validate(&payload)
            .map_err(|e| AttemptFailure::Invalid(e.to_string()))?;

        Ok(payload)
    }

    async fn persist_success(&self, record: &Record, payload: serde_json::Value) -> Result<()> {
        let records = self.deps.records.as_ref();
        let now = Utc::now();

        let mut update = RecordUpdate::new()
            .with_status(RecordStatus::Crawled)
            .with_crawl_payload(payload.clone())
            .with_last_crawled_at(now)
            .clear_error();

        if record.automation_enabled {
            match records.get_team_for(record.id).await {
                Ok(Some(team)) => {
                    let cadence = config_for(team.plan_tier).crawl_cadence;
                    if let Some(next) = next_run_after(cadence, now) {
                        update = update.with_next_run_at(Some(next));
                    }
                }
                Ok(None) => warn!(record_id = %record.id, "No team for record, next run not scheduled"),
                Err(e) => warn!(record_id = %record.id, error = %e, "Team lookup failed, next run not scheduled"),
            }
        }

        transition(records, record.id, RecordStatus::Crawling, update).await?;

        // Best-effort: a failed backfill never fails the crawl.
        if let Some(identity) = backfill::identity_update(record, &payload) {
            if let Err(e) = records.update_record(record.id, identity).await {
                warn!(record_id = %record.id, error = %e, "Identity backfill failed");
            } else {
                debug!(record_id = %record.id, "Backfilled name/location from crawl");
            }
        }

        Ok(())
    }

    async fn persist_failure(&self, record_id: RecordId, err: &AutomationError) -> Result<()> {
        mark_error_once(
            self.deps.records.as_ref(),
            record_id,
            &err.to_string(),
            self.deps.config.error_message_limit,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(2_000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let base = Duration::from_secs(10);
        assert_eq!(backoff_delay(base, 20), MAX_BACKOFF);
        assert_eq!(backoff_delay(base, u32::MAX), MAX_BACKOFF);
    }
}

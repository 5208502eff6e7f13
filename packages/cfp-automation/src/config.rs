use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DEFAULT_ERROR_MESSAGE_LIMIT;
use crate::policy::DEFAULT_STALE_AFTER_DAYS;
use crate::types::publish::PublishTarget;

/// Hourly, on the hour.
pub const DEFAULT_SCHEDULE: &str = "0 0 * * * *";

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Records processed concurrently per scheduler batch.
    pub batch_size: usize,
    pub catch_missed: bool,
    pub crawl_max_attempts: u32,
    /// Delay before the first crawl retry; doubles for each further retry.
    pub crawl_base_delay: Duration,
    pub stale_after_days: i64,
    pub error_message_limit: usize,
    pub publish_target: PublishTarget,
    /// Six-field cron expression for the scheduler job.
    pub schedule: String,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            catch_missed: false,
            crawl_max_attempts: 3,
            crawl_base_delay: Duration::from_millis(1_000),
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            error_message_limit: DEFAULT_ERROR_MESSAGE_LIMIT,
            publish_target: PublishTarget::Test,
            schedule: DEFAULT_SCHEDULE.to_string(),
        }
    }
}

impl AutomationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();

        let config = Self {
            batch_size: parse_var("AUTOMATION_BATCH_SIZE", defaults.batch_size)?,
            catch_missed: parse_var("AUTOMATION_CATCH_MISSED", defaults.catch_missed)?,
            crawl_max_attempts: parse_var(
                "AUTOMATION_CRAWL_MAX_ATTEMPTS",
                defaults.crawl_max_attempts,
            )?,
            crawl_base_delay: Duration::from_millis(parse_var(
                "AUTOMATION_CRAWL_BASE_DELAY_MS",
                defaults.crawl_base_delay.as_millis() as u64,
            )?),
            stale_after_days: parse_var("AUTOMATION_STALE_AFTER_DAYS", defaults.stale_after_days)?,
            error_message_limit: parse_var(
                "AUTOMATION_ERROR_MESSAGE_LIMIT",
                defaults.error_message_limit,
            )?,
            publish_target: match env::var("AUTOMATION_PUBLISH_TARGET") {
                Ok(raw) => raw
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("AUTOMATION_PUBLISH_TARGET must be 'test' or 'production'")?,
                Err(_) => defaults.publish_target,
            },
            schedule: env::var("AUTOMATION_SCHEDULE").unwrap_or(defaults.schedule),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("AUTOMATION_BATCH_SIZE must be at least 1");
        }
        if self.crawl_max_attempts == 0 {
            anyhow::bail!("AUTOMATION_CRAWL_MAX_ATTEMPTS must be at least 1");
        }
        if self.stale_after_days <= 0 {
            anyhow::bail!("AUTOMATION_STALE_AFTER_DAYS must be positive");
        }
        Ok(())
    }

    pub fn stale_window(&self) -> ChronoDuration {
        ChronoDuration::days(self.stale_after_days)
    }

    pub fn with_crawl_base_delay(mut self, delay: Duration) -> Self {
        self.crawl_base_delay = delay;
        self
    }

    pub fn with_crawl_max_attempts(mut self, attempts: u32) -> Self {
        self.crawl_max_attempts = attempts;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_publish_target(mut self, target: PublishTarget) -> Self {
        self.publish_target = target;
        self
    }

    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = schedule.into();
        self
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

//! Per-run options and results.

use serde::{Deserialize, Serialize};

/// Options for a single CFP run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// `Some(true)` forces publish, `Some(false)` suppresses it, `None` defers
    /// to the team's plan.
    pub auto_publish: Option<bool>,
    /// Persist the next due time from the plan cadence after the run.
    pub schedule_next: bool,
}

impl RunOptions {
    pub fn scheduled() -> Self {
        Self {
            auto_publish: None,
            schedule_next: true,
        }
    }

    pub fn with_auto_publish(mut self, auto_publish: bool) -> Self {
        self.auto_publish = Some(auto_publish);
        self
    }

    pub fn with_schedule_next(mut self, schedule_next: bool) -> Self {
        self.schedule_next = schedule_next;
        self
    }
}

/// Aggregated result of one CFP run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CfpRunResult {
    pub crawl_ok: bool,
    pub fingerprint_ok: bool,
    pub publish_ok: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl CfpRunResult {
    /// Crawl is the stage a scheduled run is judged by.
    pub fn is_success(&self) -> bool {
        self.crawl_ok
    }
}

/// Options for `Scheduler::process_due`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub batch_size: usize,
    /// Also pick up records never crawled or not crawled within the
    /// staleness window.
    pub catch_missed: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            catch_missed: false,
        }
    }
}

/// Counters returned by a scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
}

// Common test utilities
#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::sync::Once;

use cfp_automation::{Record, RecordStatus, TeamId};

static TRACING: Once = Once::new();

/// Install the test subscriber once per test binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = cfp_automation::telemetry::init_tracing("warn");
    });
}

/// Record that was crawled a day ago and is sitting in `crawled`.
pub fn crawled_record(team_id: TeamId, url: &str) -> Record {
    Record::builder()
        .team_id(team_id)
        .url(url)
        .name("Corner Cafe")
        .location("Saint Paul, MN".to_string())
        .status(RecordStatus::Crawled)
        .last_crawled_at(Utc::now() - Duration::days(1))
        .crawl_payload(serde_json::json!({"name": "Corner Cafe"}))
        .build()
}

//! Tier-based automation rules.
//!
//! Pure decision logic - no IO. Everything here is a deterministic function
//! of the plan tier, the record and the supplied clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::record::{PlanTier, Record, RecordStatus};

/// Records not crawled within this window are picked up by catch-missed runs.
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Only runs when someone asks.
    Manual,
    Daily,
    Weekly,
}

impl Cadence {
    /// Interval between automatic runs; `None` for manual.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Cadence::Manual => None,
            Cadence::Daily => Some(Duration::days(1)),
            Cadence::Weekly => Some(Duration::days(7)),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Cadence::Manual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentLevel {
    Basic,
    Enhanced,
    Complete,
}

/// Feature flags and cadences granted by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationPolicyConfig {
    pub crawl_cadence: Cadence,
    pub fingerprint_cadence: Cadence,
    pub auto_publish_enabled: bool,
    pub enrichment_level: EnrichmentLevel,
}

/// Project a plan tier onto its automation config.
pub fn config_for(tier: PlanTier) -> AutomationPolicyConfig {
    match tier {
        PlanTier::Free => AutomationPolicyConfig {
            crawl_cadence: Cadence::Manual,
            fingerprint_cadence: Cadence::Manual,
            auto_publish_enabled: false,
            enrichment_level: EnrichmentLevel::Basic,
        },
        PlanTier::Pro => AutomationPolicyConfig {
            crawl_cadence: Cadence::Weekly,
            fingerprint_cadence: Cadence::Weekly,
            auto_publish_enabled: true,
            enrichment_level: EnrichmentLevel::Enhanced,
        },
        PlanTier::Agency => AutomationPolicyConfig {
            crawl_cadence: Cadence::Daily,
            fingerprint_cadence: Cadence::Daily,
            auto_publish_enabled: true,
            enrichment_level: EnrichmentLevel::Complete,
        },
    }
}

/// Same as [`config_for`] for a stored plan name; unknown names get the
/// most restrictive plan.
pub fn config_for_plan_name(plan: &str) -> AutomationPolicyConfig {
    config_for(PlanTier::parse_lenient(plan))
}

pub fn is_crawl_due(record: &Record, config: &AutomationPolicyConfig, now: DateTime<Utc>) -> bool {
    if config.crawl_cadence.is_manual() || !record.automation_enabled {
        return false;
    }
    match record.next_run_at {
        None => true,
        Some(next) => next <= now,
    }
}

pub fn is_publish_eligible(record: &Record, config: &AutomationPolicyConfig) -> bool {
    config.auto_publish_enabled && has_publishable_content(record)
}

/// Status/content half of publish eligibility, without the plan flag.
///
/// A published record only qualifies again once it has been re-crawled
/// after its last publication.
pub fn has_publishable_content(record: &Record) -> bool {
    match record.status {
        RecordStatus::Crawled => true,
        RecordStatus::Published => match (record.last_crawled_at, record.last_published_at) {
            (_, None) => true,
            (Some(crawled), Some(published)) => crawled > published,
            (None, Some(_)) => false,
        },
        _ => false,
    }
}

/// Next due time for a cadence; `None` for manual.
pub fn next_run_after(cadence: Cadence, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    cadence.interval().map(|interval| now + interval)
}

/// Never crawled, or last crawled before `now - window`.
pub fn is_stale(record: &Record, now: DateTime<Utc>, window: Duration) -> bool {
    match record.last_crawled_at {
        None => true,
        Some(at) => at < now - window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TeamId;

    fn record() -> Record {
        Record::builder()
            .team_id(TeamId::new())
            .url("https://example.com")
            .build()
    }

    #[test]
    fn test_tier_mapping() {
        let free = config_for(PlanTier::Free);
        assert_eq!(free.crawl_cadence, Cadence::Manual);
        assert!(!free.auto_publish_enabled);

        let pro = config_for(PlanTier::Pro);
        assert_eq!(pro.crawl_cadence, Cadence::Weekly);
        assert!(pro.auto_publish_enabled);
        assert_eq!(pro.enrichment_level, EnrichmentLevel::Enhanced);

        let agency = config_for(PlanTier::Agency);
        assert_eq!(agency.crawl_cadence, Cadence::Daily);
        assert_eq!(agency.enrichment_level, EnrichmentLevel::Complete);
    }

    #[test]
    fn test_unknown_plan_gets_most_restrictive_config() {
        assert_eq!(config_for_plan_name("gold"), config_for(PlanTier::Free));
    }

    #[test]
    fn test_crawl_due_rules() {
        let now = Utc::now();
        let pro = config_for(PlanTier::Pro);

        let mut record = record();
        assert!(is_crawl_due(&record, &pro, now), "unset next_run_at is due");

        record.next_run_at = Some(now - Duration::minutes(1));
        assert!(is_crawl_due(&record, &pro, now));

        record.next_run_at = Some(now + Duration::hours(1));
        assert!(!is_crawl_due(&record, &pro, now));

        record.next_run_at = None;
        record.automation_enabled = false;
        assert!(!is_crawl_due(&record, &pro, now));

        record.automation_enabled = true;
        assert!(!is_crawl_due(&record, &config_for(PlanTier::Free), now));
    }

    #[test]
    fn test_publish_eligibility() {
        let pro = config_for(PlanTier::Pro);
        let now = Utc::now();

        let mut record = record();
        assert!(!is_publish_eligible(&record, &pro), "pending is not eligible");

        record.status = RecordStatus::Crawled;
        assert!(is_publish_eligible(&record, &pro));
        assert!(!is_publish_eligible(&record, &config_for(PlanTier::Free)));

        record.status = RecordStatus::Published;
        record.last_published_at = Some(now);
        record.last_crawled_at = Some(now - Duration::hours(1));
        assert!(!is_publish_eligible(&record, &pro), "nothing changed since publish");

        record.last_crawled_at = Some(now + Duration::hours(1));
        assert!(is_publish_eligible(&record, &pro));

        record.last_published_at = None;
        assert!(is_publish_eligible(&record, &pro));

        record.status = RecordStatus::Error;
        assert!(!is_publish_eligible(&record, &pro));
    }

    #[test]
    fn test_next_run_after() {
        let now = Utc::now();
        assert_eq!(next_run_after(Cadence::Daily, now), Some(now + Duration::days(1)));
        assert_eq!(next_run_after(Cadence::Weekly, now), Some(now + Duration::days(7)));
        assert_eq!(next_run_after(Cadence::Manual, now), None);
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        let window = Duration::days(DEFAULT_STALE_AFTER_DAYS);

        let mut record = record();
        assert!(is_stale(&record, now, window));

        record.last_crawled_at = Some(now - Duration::days(31));
        assert!(is_stale(&record, now, window));

        record.last_crawled_at = Some(now - Duration::days(2));
        assert!(!is_stale(&record, now, window));
    }
}

//! CFP automation engine
//!
//! Keeps business records fresh by running **Crawl**, **Fingerprint** and
//! **Publish** on a cadence set by each team's subscription plan.
//!
//! # Flow
//!
//! ```text
//! cron tick ─► Scheduler::process_due ─► CfpOrchestrator::run (per record)
//!                                            ├─► CrawlExecutor        ┐ concurrent
//!                                            ├─► FingerprintExecutor  ┘
//!                                            └─► PublishDecision
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use cfp_automation::{AutomationService, RunOptions};
//! use cfp_automation::testing::TestScenario;
//!
//! let scenario = TestScenario::new();
//! let team = scenario.add_team(PlanTier::Agency);
//! let record = scenario.add_record(team, "https://cafe.test");
//!
//! let service = AutomationService::new(scenario.deps());
//! let result = service.trigger(record, RunOptions::default()).await?;
//! ```
//!
//! # Modules
//!
//! - [`policy`] - Plan tier rules (pure)
//! - [`pipeline`] - Crawl, fingerprint, publish and the orchestrator
//! - [`scheduler`] - Batch processing of due records
//! - [`service`] - Manual trigger and retry
//! - [`traits`] - Collaborator contracts
//! - [`stores`] - Storage implementations (MemoryStore)
//! - [`testing`] - Mock implementations for testing

pub mod config;
pub mod deps;
pub mod error;
pub mod id;
pub mod pipeline;
pub mod policy;
pub mod runs;
pub mod scheduled_tasks;
pub mod scheduler;
pub mod service;
pub mod stores;
pub mod telemetry;
pub mod testing;
pub mod traits;
pub mod types;

pub use config::AutomationConfig;
pub use deps::AutomationDeps;
pub use error::{sanitize_error_message, AutomationError, Result};
pub use id::{FingerprintId, Id, PublicationId, RecordId, TeamId};
pub use pipeline::{CfpOrchestrator, CrawlExecutor, FingerprintExecutor, PublishDecision};
pub use policy::{
    config_for, config_for_plan_name, is_crawl_due, is_publish_eligible, AutomationPolicyConfig,
    Cadence, EnrichmentLevel,
};
pub use runs::InFlightRuns;
pub use scheduled_tasks::start_scheduler;
pub use scheduler::Scheduler;
pub use service::{AutomationService, RetryOutcome};
pub use stores::MemoryStore;
pub use traits::{
    analyzer::FingerprintAnalyzer,
    crawler::{Crawler, ObjectPayloadValidator, PayloadValidator},
    publisher::{PublishAssembler, Publisher},
    store::{FingerprintStore, ManualFallbackStore, RecordStore},
};
pub use types::{
    crawl::{CrawlResponse, CrawlRunResult},
    fingerprint::{AnalysisResult, Fingerprint, FingerprintRunResult},
    publish::{
        FallbackMeta, Notability, PublicationRecord, PublishAction, PublishDisposition,
        PublishOptions, PublishOutcome, PublishPackage, PublishTarget, PublishTrigger,
    },
    record::{PlanTier, Record, RecordStatus, RecordUpdate, Team},
    run::{CfpRunResult, ProcessOptions, ProcessSummary, RunOptions},
};

// Re-export testing utilities
pub use testing::{MockAnalyzer, MockAssembler, MockCrawler, MockPublisher, TestScenario};

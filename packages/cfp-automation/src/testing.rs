//! Testing utilities including mock implementations.
//!
//! These let applications exercise the engine without network, LLM or
//! publisher calls. Every mock records its calls for assertions.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::AutomationConfig;
use crate::deps::AutomationDeps;
use crate::id::{RecordId, TeamId};
use crate::stores::MemoryStore;
use crate::traits::{
    analyzer::FingerprintAnalyzer,
    crawler::{Crawler, ObjectPayloadValidator, PayloadValidator},
    publisher::{PublishAssembler, Publisher},
};
use crate::types::{
    crawl::CrawlResponse,
    fingerprint::AnalysisResult,
    publish::{Notability, PublishOptions, PublishOutcome, PublishPackage, PublishTarget},
    record::{PlanTier, Record, RecordStatus, Team},
};

// ============================================================================
// Crawler
// ============================================================================

/// Scripted reply for one crawler call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(CrawlResponse),
    /// The crawler call itself errors (network failure, timeout).
    Error(String),
}

/// A single call made to [`MockCrawler`].
#[derive(Debug, Clone)]
pub struct MockCrawlCall {
    pub url: String,
    pub at: Instant,
}

/// Mock crawler that replays queued replies, then falls back to a default.
pub struct MockCrawler {
    replies: RwLock<VecDeque<MockReply>>,
    fallback: RwLock<MockReply>,
    delay: Option<Duration>,
    calls: RwLock<Vec<MockCrawlCall>>,
}

impl Default for MockCrawler {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCrawler {
    /// Succeeds with a small business payload on every call.
    pub fn new() -> Self {
        Self {
            replies: RwLock::new(VecDeque::new()),
            fallback: RwLock::new(MockReply::Response(CrawlResponse::ok(default_payload()))),
            delay: None,
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Every call errors with `message` unless a reply is queued.
    pub fn always_failing(message: impl Into<String>) -> Self {
        let crawler = Self::new();
        *crawler.fallback.write().unwrap() = MockReply::Error(message.into());
        crawler
    }

    /// Default payload for unscripted calls.
    pub fn with_payload(self, payload: serde_json::Value) -> Self {
        *self.fallback.write().unwrap() = MockReply::Response(CrawlResponse::ok(payload));
        self
    }

    /// Queue a response for the next call.
    pub fn with_response(self, response: CrawlResponse) -> Self {
        self.replies
            .write()
            .unwrap()
            .push_back(MockReply::Response(response));
        self
    }

    /// Queue an error for the next call.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.replies
            .write()
            .unwrap()
            .push_back(MockReply::Error(message.into()));
        self
    }

    /// Queue `n` errors.
    pub fn failing_times(self, n: usize, message: &str) -> Self {
        (0..n).fold(self, |crawler, _| crawler.with_error(message))
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<MockCrawlCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Gaps between consecutive calls.
    pub fn call_gaps(&self) -> Vec<Duration> {
        let calls = self.calls.read().unwrap();
        calls
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }
}

#[async_trait]
impl Crawler for MockCrawler {
    async fn crawl(&self, url: &str) -> anyhow::Result<CrawlResponse> {
        self.calls.write().unwrap().push(MockCrawlCall {
            url: url.to_string(),
            at: Instant::now(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.replies.write().unwrap().pop_front();
        let reply = queued.unwrap_or_else(|| self.fallback.read().unwrap().clone());
        match reply {
            MockReply::Response(response) => Ok(response),
            MockReply::Error(message) => Err(anyhow::anyhow!(message)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn default_payload() -> serde_json::Value {
    json!({
        "name": "Mock Business",
        "description": "A business used in tests",
        "location": {"city": "Minneapolis", "state": "MN", "country": "US"}
    })
}

/// Rejects every payload.
pub struct RejectingValidator(pub String);

impl PayloadValidator for RejectingValidator {
    fn validate(&self, _payload: &serde_json::Value) -> anyhow::Result<()> {
        anyhow::bail!("{}", self.0)
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// A single call made to [`MockAnalyzer`].
#[derive(Debug, Clone)]
pub struct MockAnalyzeCall {
    pub record_id: RecordId,
    /// Status the record carried when it was handed over.
    pub status: RecordStatus,
}

/// Mock analyzer: queued failures first, then a fixed score.
pub struct MockAnalyzer {
    failures: RwLock<VecDeque<String>>,
    always_fail: Option<String>,
    score: f64,
    delay: Option<Duration>,
    calls: RwLock<Vec<MockAnalyzeCall>>,
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self {
            failures: RwLock::new(VecDeque::new()),
            always_fail: None,
            score: 42.0,
            delay: None,
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn always_failing(message: impl Into<String>) -> Self {
        Self {
            always_fail: Some(message.into()),
            ..Self::new()
        }
    }

    /// Fail the next `n` calls.
    pub fn failing_times(self, n: usize, message: &str) -> Self {
        self.failures
            .write()
            .unwrap()
            .extend(std::iter::repeat(message.to_string()).take(n));
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<MockAnalyzeCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl FingerprintAnalyzer for MockAnalyzer {
    async fn analyze(&self, record: &Record) -> anyhow::Result<AnalysisResult> {
        self.calls.write().unwrap().push(MockAnalyzeCall {
            record_id: record.id,
            status: record.status,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.always_fail {
            anyhow::bail!("{}", message);
        }
        if let Some(message) = self.failures.write().unwrap().pop_front() {
            anyhow::bail!("{}", message);
        }

        Ok(AnalysisResult {
            visibility_score: self.score,
            mention_rate: self.score / 100.0,
            sentiment: Some("neutral".to_string()),
            summary: Some(format!("{} is mentioned occasionally", record.name)),
            raw: json!({"provider": "mock"}),
        })
    }
}

// ============================================================================
// Assembler
// ============================================================================

enum AssemblerMode {
    Package(PublishPackage),
    Fail(String),
}

/// Mock assembler returning a fixed package.
pub struct MockAssembler {
    mode: AssemblerMode,
    calls: AtomicUsize,
}

impl Default for MockAssembler {
    fn default() -> Self {
        Self::notable(0.9)
    }
}

impl MockAssembler {
    /// Publishable package with the given confidence.
    pub fn notable(confidence: f64) -> Self {
        Self::with_package(PublishPackage {
            can_publish: true,
            notability: Notability {
                is_notable: true,
                confidence,
                reasons: vec!["Has independent coverage".to_string()],
            },
            full_entity: test_entity(),
            recommendation: None,
        })
    }

    /// Package the publisher must not receive.
    pub fn not_notable() -> Self {
        Self::with_package(PublishPackage {
            can_publish: false,
            notability: Notability {
                is_notable: false,
                confidence: 0.2,
                reasons: vec!["No independent sources".to_string()],
            },
            full_entity: test_entity(),
            recommendation: Some("Gather independent sources before publishing".to_string()),
        })
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            mode: AssemblerMode::Fail(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_package(package: PublishPackage) -> Self {
        Self {
            mode: AssemblerMode::Package(package),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublishAssembler for MockAssembler {
    async fn assemble(&self, _record_id: RecordId) -> anyhow::Result<PublishPackage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            AssemblerMode::Package(package) => Ok(package.clone()),
            AssemblerMode::Fail(message) => anyhow::bail!("{}", message),
        }
    }
}

fn test_entity() -> serde_json::Value {
    json!({
        "labels": {"en": "Mock Business"},
        "claims": {"P31": "Q4830453"}
    })
}

// ============================================================================
// Publisher
// ============================================================================

/// Record of a call made to [`MockPublisher`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockPublishCall {
    Create {
        record_id: RecordId,
        target: PublishTarget,
    },
    Update {
        entity_id: String,
        record_id: RecordId,
        target: PublishTarget,
    },
}

#[derive(Clone)]
enum PublisherMode {
    /// Create assigns `Q{n}`; update echoes the id back.
    Succeed,
    Reject(String),
    Fail(String),
}

/// Mock entity publisher.
pub struct MockPublisher {
    mode: PublisherMode,
    next_id: AtomicUsize,
    calls: RwLock<Vec<MockPublishCall>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            mode: PublisherMode::Succeed,
            next_id: AtomicUsize::new(1000),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Answers every call with `success: false`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            mode: PublisherMode::Reject(reason.into()),
            ..Self::new()
        }
    }

    /// Every call errors, as on a network failure.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            mode: PublisherMode::Fail(message.into()),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<MockPublishCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockPublishCall::Create { .. }))
            .count()
    }

    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockPublishCall::Update { .. }))
            .count()
    }

    fn answer(&self, entity_id: Option<&str>) -> anyhow::Result<PublishOutcome> {
        match &self.mode {
            PublisherMode::Succeed => {
                let id = match entity_id {
                    Some(id) => id.to_string(),
                    None => format!("Q{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
                };
                Ok(PublishOutcome::published(id))
            }
            PublisherMode::Reject(reason) => Ok(PublishOutcome::failed(reason.clone())),
            PublisherMode::Fail(message) => anyhow::bail!("{}", message),
        }
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn create(
        &self,
        record: &Record,
        _payload: &serde_json::Value,
        options: &PublishOptions,
    ) -> anyhow::Result<PublishOutcome> {
        self.calls.write().unwrap().push(MockPublishCall::Create {
            record_id: record.id,
            target: options.target,
        });
        self.answer(None)
    }

    async fn update(
        &self,
        entity_id: &str,
        record: &Record,
        _payload: &serde_json::Value,
        options: &PublishOptions,
    ) -> anyhow::Result<PublishOutcome> {
        self.calls.write().unwrap().push(MockPublishCall::Update {
            entity_id: entity_id.to_string(),
            record_id: record.id,
            target: options.target,
        });
        self.answer(Some(entity_id))
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// Wires mocks and a [`MemoryStore`] into [`AutomationDeps`].
///
/// ```ignore
/// let scenario = TestScenario::new().with_crawler(MockCrawler::new().failing_times(2, "timeout"));
/// let team = scenario.add_team(PlanTier::Pro);
/// let record = scenario.add_record(team, "https://cafe.test");
/// let orchestrator = CfpOrchestrator::new(scenario.deps());
/// ```
pub struct TestScenario {
    pub store: Arc<MemoryStore>,
    pub crawler: Arc<MockCrawler>,
    pub analyzer: Arc<MockAnalyzer>,
    pub assembler: Arc<MockAssembler>,
    pub publisher: Arc<MockPublisher>,
    pub validator: Arc<dyn PayloadValidator>,
    pub config: AutomationConfig,
}

impl Default for TestScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl TestScenario {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            crawler: Arc::new(MockCrawler::new()),
            analyzer: Arc::new(MockAnalyzer::new()),
            assembler: Arc::new(MockAssembler::default()),
            publisher: Arc::new(MockPublisher::new()),
            validator: Arc::new(ObjectPayloadValidator),
            config: AutomationConfig::default(),
        }
    }

    pub fn with_crawler(mut self, crawler: MockCrawler) -> Self {
        self.crawler = Arc::new(crawler);
        self
    }

    pub fn with_analyzer(mut self, analyzer: MockAnalyzer) -> Self {
        self.analyzer = Arc::new(analyzer);
        self
    }

    pub fn with_assembler(mut self, assembler: MockAssembler) -> Self {
        self.assembler = Arc::new(assembler);
        self
    }

    pub fn with_publisher(mut self, publisher: MockPublisher) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }

    pub fn with_validator(mut self, validator: impl PayloadValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_config(mut self, config: AutomationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_team(&self, tier: PlanTier) -> TeamId {
        self.store.insert_team(
            Team::builder()
                .name(format!("{} team", tier))
                .plan_tier(tier)
                .build(),
        )
    }

    /// Pending record with a placeholder name.
    pub fn add_record(&self, team_id: TeamId, url: &str) -> RecordId {
        self.store.insert_record(
            Record::builder()
                .team_id(team_id)
                .url(url)
                .name("Unknown Business")
                .build(),
        )
    }

    pub fn add(&self, record: Record) -> RecordId {
        self.store.insert_record(record)
    }

    pub fn deps(&self) -> AutomationDeps {
        AutomationDeps::builder()
            .records(self.store.clone())
            .fingerprints(self.store.clone())
            .fallback(self.store.clone())
            .crawler(self.crawler.clone())
            .validator(self.validator.clone())
            .analyzer(self.analyzer.clone())
            .assembler(self.assembler.clone())
            .publisher(self.publisher.clone())
            .config(self.config.clone())
            .build()
    }
}

//! Dependency container shared by every pipeline stage.
//!
//! All external services sit behind trait objects so tests can swap in the
//! mocks from [`crate::testing`] and an in-memory store.

use std::sync::Arc;
use typed_builder::TypedBuilder;

use crate::config::AutomationConfig;
use crate::traits::{
    analyzer::FingerprintAnalyzer,
    crawler::{Crawler, ObjectPayloadValidator, PayloadValidator},
    publisher::{PublishAssembler, Publisher},
    store::{FingerprintStore, ManualFallbackStore, RecordStore},
};

#[derive(Clone, TypedBuilder)]
pub struct AutomationDeps {
    pub records: Arc<dyn RecordStore>,
    pub fingerprints: Arc<dyn FingerprintStore>,
    pub fallback: Arc<dyn ManualFallbackStore>,
    pub crawler: Arc<dyn Crawler>,
    #[builder(default = Arc::new(ObjectPayloadValidator))]
    pub validator: Arc<dyn PayloadValidator>,
    pub analyzer: Arc<dyn FingerprintAnalyzer>,
    pub assembler: Arc<dyn PublishAssembler>,
    pub publisher: Arc<dyn Publisher>,
    #[builder(default)]
    pub config: AutomationConfig,
}

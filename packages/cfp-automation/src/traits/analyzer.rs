//! LLM visibility analysis.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{fingerprint::AnalysisResult, record::Record};

#[async_trait]
pub trait FingerprintAnalyzer: Send + Sync {
    /// Run the analysis once. Errors on failure; retries are the
    /// implementation's concern.
    async fn analyze(&self, record: &Record) -> Result<AnalysisResult>;
}

//! LLM visibility analyses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{FingerprintId, RecordId};

/// What the analyzer reports for a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0-100 visibility across the queried models.
    pub visibility_score: f64,
    /// Fraction of prompts in which the business was mentioned.
    pub mention_rate: f64,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Provider-specific detail kept verbatim.
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Stored analysis. Rows are only ever appended; the newest one is current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub id: FingerprintId,
    pub record_id: RecordId,
    pub visibility_score: f64,
    pub mention_rate: f64,
    pub sentiment: Option<String>,
    pub summary: Option<String>,
    pub raw: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Fingerprint {
    pub fn from_analysis(record_id: RecordId, analysis: AnalysisResult) -> Self {
        Self {
            id: FingerprintId::new(),
            record_id,
            visibility_score: analysis.visibility_score,
            mention_rate: analysis.mention_rate,
            sentiment: analysis.sentiment,
            summary: analysis.summary,
            raw: analysis.raw,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of one `FingerprintExecutor::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRunResult {
    pub ok: bool,
}

//! Crawler responses and crawl run results.

use serde::{Deserialize, Serialize};

/// Response from a single crawler call. The crawler never retries internally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CrawlResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Payload, if the response carries a non-empty one.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.data.as_ref().filter(|data| !is_empty_payload(data))
    }
}

fn is_empty_payload(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Outcome of one `CrawlExecutor::run`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlRunResult {
    pub ok: bool,
    /// Number of crawler calls made.
    pub attempts: u32,
    pub error: Option<String>,
}

impl CrawlRunResult {
    pub fn succeeded(attempts: u32) -> Self {
        Self {
            ok: true,
            attempts,
            error: None,
        }
    }

    pub fn failed(attempts: u32, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            attempts,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_payloads_are_not_payloads() {
        assert!(CrawlResponse::ok(json!({})).payload().is_none());
        assert!(CrawlResponse::ok(json!(null)).payload().is_none());
        assert!(CrawlResponse::ok(json!("  ")).payload().is_none());
        assert!(CrawlResponse::ok(json!({"name": "Cafe"})).payload().is_some());
    }

    #[test]
    fn test_failed_response_has_no_payload() {
        let response = CrawlResponse::failed("502 from upstream");
        assert!(!response.success);
        assert!(response.payload().is_none());
    }
}

//! Crawler and crawl payload validation.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::crawl::CrawlResponse;

/// Single-attempt site crawler. Retries belong to the caller.
#[async_trait]
pub trait Crawler: Send + Sync {
    async fn crawl(&self, url: &str) -> Result<CrawlResponse>;

    /// Crawler name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Schema check for crawl payloads.
///
/// A rejection means the site content itself is malformed, so it is never
/// retried.
pub trait PayloadValidator: Send + Sync {
    fn validate(&self, payload: &serde_json::Value) -> Result<()>;
}

/// Accepts any JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectPayloadValidator;

impl PayloadValidator for ObjectPayloadValidator {
    fn validate(&self, payload: &serde_json::Value) -> Result<()> {
        if payload.is_object() {
            Ok(())
        } else {
            anyhow::bail!("crawl payload must be a JSON object")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_validator() {
        let validator = ObjectPayloadValidator;
        assert!(validator.validate(&json!({"name": "Cafe"})).is_ok());
        assert!(validator.validate(&json!(["not", "an", "object"])).is_err());
    }
}

//! Publish packages, publisher results and local publication snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::id::{PublicationId, RecordId};

/// Notability assessment produced alongside the entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notability {
    pub is_notable: bool,
    /// 0.0 - 1.0
    pub confidence: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Everything the assembler produced for a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishPackage {
    pub can_publish: bool,
    pub notability: Notability,
    /// Complete entity, kept even when it is not published.
    pub full_entity: serde_json::Value,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Publisher answer for a create or update call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub success: bool,
    #[serde(default)]
    pub external_entity_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PublishOutcome {
    pub fn published(entity_id: impl Into<String>) -> Self {
        Self {
            success: true,
            external_entity_id: Some(entity_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            external_entity_id: None,
            error: Some(error.into()),
        }
    }

    /// Entity id if and only if the publisher reported success with one.
    pub fn confirmed_id(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.external_entity_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }
}

/// Which publishing environment to write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishTarget {
    #[default]
    Test,
    Production,
}

impl PublishTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishTarget::Test => "test",
            PublishTarget::Production => "production",
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "testwikidata" => Ok(PublishTarget::Test),
            "production" | "prod" | "wikidata" => Ok(PublishTarget::Production),
            other => Err(format!("unknown publish target: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    pub target: PublishTarget,
}

/// Create or update, decided by whether the record already has an entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
    Create,
    Update,
}

/// Who asked for the publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishTrigger {
    /// Scheduled or pipeline-driven; subject to the tier's auto-publish flag.
    #[default]
    Automatic,
    /// Explicit request; bypasses the tier flag.
    Manual,
}

/// Result of a publish decision that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublishDisposition {
    /// Not eligible. The record was not touched.
    Skipped,
    /// Not notable enough. Status reverted to `crawled`.
    Declined { recommendation: Option<String> },
    Published {
        external_entity_id: String,
        action: PublishAction,
    },
}

impl PublishDisposition {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishDisposition::Published { .. })
    }
}

/// Metadata stored with a manual-fallback entity snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackMeta {
    pub can_publish: bool,
    pub notability: Notability,
    pub recommendation: Option<String>,
    pub stored_at: DateTime<Utc>,
}

/// Local record of a successful publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub id: PublicationId,
    pub record_id: RecordId,
    pub external_entity_id: String,
    pub entity: serde_json::Value,
    pub target: PublishTarget,
    pub action: PublishAction,
    /// Increments with every publication of the same record.
    pub version: u32,
    pub published_at: DateTime<Utc>,
}

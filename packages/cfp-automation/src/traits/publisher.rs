//! Publishing system contracts.

use anyhow::Result;
use async_trait::async_trait;

use crate::id::RecordId;
use crate::types::{
    publish::{PublishOptions, PublishOutcome, PublishPackage},
    record::Record,
};

/// Builds the entity and notability verdict for a record.
#[async_trait]
pub trait PublishAssembler: Send + Sync {
    async fn assemble(&self, record_id: RecordId) -> Result<PublishPackage>;
}

/// External entity publisher.
///
/// `create` must only be used for records without an entity id; calling it
/// for a published record duplicates the entity upstream.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn create(
        &self,
        record: &Record,
        payload: &serde_json::Value,
        options: &PublishOptions,
    ) -> Result<PublishOutcome>;

    async fn update(
        &self,
        entity_id: &str,
        record: &Record,
        payload: &serde_json::Value,
        options: &PublishOptions,
    ) -> Result<PublishOutcome>;
}

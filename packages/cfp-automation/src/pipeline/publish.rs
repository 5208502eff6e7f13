//! Publish stage: notability gate, fallback storage, create-vs-update.
//!
//! ```text
//! eligible? ──no──► Skipped (record untouched)
//!    │
//!    ▼
//! generating ─► assemble ─► store fallback (always)
//!                              │
//!              can_publish? ──no──► crawled (Declined)
//!                              │
//!              entity id? ──yes──► update(id)
//!                  │no
//!                  ▼
//!               create ─► published | error
//! ```

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::deps::AutomationDeps;
use crate::error::{sanitize_error_message, AutomationError, Result};
use crate::id::{PublicationId, RecordId};
use crate::pipeline::{load_record, load_team, mark_error_once, transition};
use crate::policy::{config_for, has_publishable_content, is_publish_eligible};
use crate::types::{
    publish::{
        FallbackMeta, PublicationRecord, PublishAction, PublishDisposition, PublishOptions,
        PublishPackage, PublishTrigger,
    },
    record::{Record, RecordStatus, RecordUpdate},
};

#[derive(Clone)]
pub struct PublishDecision {
    deps: AutomationDeps,
}

impl PublishDecision {
    pub fn new(deps: AutomationDeps) -> Self {
        Self { deps }
    }

    /// Publish under the team's plan rules.
    pub async fn run(&self, record_id: RecordId) -> Result<PublishDisposition> {
        self.run_with(record_id, PublishTrigger::Automatic).await
    }

    /// Publish for an explicit trigger.
    ///
    /// Every failure after eligibility has been established leaves the
    /// record in `error` before the error is returned.
    pub async fn run_with(
        &self,
        record_id: RecordId,
        trigger: PublishTrigger,
    ) -> Result<PublishDisposition> {
        let records = self.deps.records.as_ref();
        let record = load_record(records, record_id).await?;
        let team = load_team(records, record_id).await?;
        let policy = config_for(team.plan_tier);

        let eligible = match trigger {
            PublishTrigger::Automatic => is_publish_eligible(&record, &policy),
            PublishTrigger::Manual => is_manually_publishable(&record),
        };
        if !eligible {
            debug!(
                record_id = %record_id,
                status = %record.status,
                plan = %team.plan_tier,
                "Record not eligible for publish"
            );
            return Ok(PublishDisposition::Skipped);
        }

        match self.publish(record, trigger).await {
            Ok(disposition) => Ok(disposition),
            Err(err) => {
                error!(record_id = %record_id, error = %err, "Publish failed");
                if let Err(mark_err) = mark_error_once(
                    records,
                    record_id,
                    &err.to_string(),
                    self.deps.config.error_message_limit,
                )
                .await
                {
                    warn!(record_id = %record_id, error = %mark_err, "Could not record publish failure");
                }
                Err(err)
            }
        }
    }

    async fn publish(&self, record: Record, trigger: PublishTrigger) -> Result<PublishDisposition> {
        let records = self.deps.records.as_ref();
        let record_id = record.id;

        transition(
            records,
            record_id,
            record.status,
            RecordUpdate::status(RecordStatus::Generating),
        )
        .await?;

        let package = self
            .deps
            .assembler
            .assemble(record_id)
            .await
            .map_err(AutomationError::Publish)?;

        self.store_fallback(record_id, &package).await;

        if !package.can_publish {
            info!(
                record_id = %record_id,
                notable = package.notability.is_notable,
                confidence = package.notability.confidence,
                "Record not notable enough to publish yet"
            );
            transition(
                records,
                record_id,
                RecordStatus::Generating,
                RecordUpdate::status(RecordStatus::Crawled),
            )
            .await?;
            return Ok(PublishDisposition::Declined {
                recommendation: package.recommendation,
            });
        }

        let options = PublishOptions {
            target: self.deps.config.publish_target,
        };

        // An existing entity id must route to update; create would duplicate
        // the entity upstream.
        let (action, outcome) = match record.external_entity_id.as_deref() {
            Some(entity_id) => {
                info!(record_id = %record_id, entity_id, target = %options.target, "Updating published entity");
                let outcome = self
                    .deps
                    .publisher
                    .update(entity_id, &record, &package.full_entity, &options)
                    .await
                    .map_err(AutomationError::Publish)?;
                (PublishAction::Update, outcome)
            }
            None => {
                info!(record_id = %record_id, target = %options.target, "Creating entity");
                let outcome = self
                    .deps
                    .publisher
                    .create(&record, &package.full_entity, &options)
                    .await
                    .map_err(AutomationError::Publish)?;
                (PublishAction::Create, outcome)
            }
        };

        let Some(entity_id) = outcome.confirmed_id().map(str::to_string) else {
            let reason = outcome
                .error
                .clone()
                .unwrap_or_else(|| "publisher returned no entity id".to_string());
            let message = sanitize_error_message(&reason, self.deps.config.error_message_limit);
            transition(
                records,
                record_id,
                RecordStatus::Generating,
                RecordUpdate::failed(message),
            )
            .await?;
            return Err(AutomationError::PublishRejected(reason));
        };

        let version = records
            .publication_count(record_id)
            .await
            .map_err(AutomationError::Publish)?
            + 1;
        let now = Utc::now();

        records
            .create_publication_record(PublicationRecord {
                id: PublicationId::new(),
                record_id,
                external_entity_id: entity_id.clone(),
                entity: package.full_entity,
                target: options.target,
                action,
                version,
                published_at: now,
            })
            .await
            .map_err(AutomationError::Publish)?;

        let mut update = RecordUpdate::new()
            .with_status(RecordStatus::Published)
            .with_external_entity_id(entity_id.clone())
            .with_last_published_at(now)
            .clear_error();
        if trigger == PublishTrigger::Automatic {
            update = update.with_last_auto_published_at(now);
        }
        transition(records, record_id, RecordStatus::Generating, update).await?;

        info!(
            record_id = %record_id,
            entity_id = %entity_id,
            action = ?action,
            version,
            "Record published"
        );

        Ok(PublishDisposition::Published {
            external_entity_id: entity_id,
            action,
        })
    }

    /// Best-effort: the snapshot lets a human finish publication later.
    async fn store_fallback(&self, record_id: RecordId, package: &PublishPackage) {
        let meta = FallbackMeta {
            can_publish: package.can_publish,
            notability: package.notability.clone(),
            recommendation: package.recommendation.clone(),
            stored_at: Utc::now(),
        };
        if let Err(e) = self
            .deps
            .fallback
            .store(record_id, package.full_entity.clone(), meta)
            .await
        {
            warn!(record_id = %record_id, error = %e, "Failed to store manual fallback entity");
        }
    }
}

/// Manual triggers skip the plan flag; an `error` record with a payload can
/// be retried straight into publish.
fn is_manually_publishable(record: &Record) -> bool {
    has_publishable_content(record)
        || (record.status == RecordStatus::Error && record.crawl_payload.is_some())
}

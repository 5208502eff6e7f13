//! Publish decision: eligibility, notability gate, create vs update routing.

mod common;

use chrono::{Duration, Utc};

use cfp_automation::testing::{MockAssembler, MockPublishCall, MockPublisher, TestScenario};
use cfp_automation::{
    AutomationConfig, AutomationError, PlanTier, PublishAction, PublishDecision,
    PublishDisposition, PublishTarget, PublishTrigger, RecordStatus, RecordUpdate, RecordStore,
};
use common::{crawled_record, init_tracing};

#[tokio::test]
async fn test_ineligible_record_is_left_untouched() {
    init_tracing();
    let scenario = TestScenario::new();
    let free = scenario.add_team(PlanTier::Free);
    let pro = scenario.add_team(PlanTier::Pro);
    let free_record = scenario.add(crawled_record(free, "https://free.test"));
    let pending_record = scenario.add_record(pro, "https://pending.test");

    let decision = PublishDecision::new(scenario.deps());

    assert_eq!(decision.run(free_record).await.unwrap(), PublishDisposition::Skipped);
    assert_eq!(decision.run(pending_record).await.unwrap(), PublishDisposition::Skipped);

    assert!(scenario.store.status_history(free_record).is_empty());
    assert!(scenario.store.status_history(pending_record).is_empty());
    assert_eq!(scenario.assembler.call_count(), 0);
    assert_eq!(scenario.store.fallback_count(free_record), 0);
}

#[tokio::test]
async fn test_create_path_records_publication() {
    init_tracing();
    let scenario = TestScenario::new();
    let team = scenario.add_team(PlanTier::Agency);
    let id = scenario.add(crawled_record(team, "https://corner-cafe.test"));

    let disposition = PublishDecision::new(scenario.deps()).run(id).await.unwrap();

    let PublishDisposition::Published {
        external_entity_id,
        action,
    } = disposition
    else {
        panic!("expected the record to be published");
    };
    assert_eq!(action, PublishAction::Create);

    let record = scenario.store.record(id).unwrap();
    assert_eq!(record.status, RecordStatus::Published);
    assert_eq!(record.external_entity_id.as_deref(), Some(external_entity_id.as_str()));
    assert_eq!(
        scenario.store.status_history(id),
        vec![RecordStatus::Generating, RecordStatus::Published]
    );

    let publications = scenario.store.publications(id);
    assert_eq!(publications.len(), 1);
    assert_eq!(publications[0].external_entity_id, external_entity_id);
    assert_eq!(publications[0].action, PublishAction::Create);
    assert_eq!(publications[0].target, PublishTarget::Test);
    assert_eq!(scenario.store.fallback_count(id), 1);
}

#[tokio::test]
async fn test_changed_published_record_is_updated_with_next_version() {
    init_tracing();
    let scenario = TestScenario::new();
    let team = scenario.add_team(PlanTier::Pro);
    let id = scenario.add(crawled_record(team, "https://corner-cafe.test"));
    let decision = PublishDecision::new(scenario.deps());

    decision.run(id).await.unwrap();
    let entity_id = scenario.store.record(id).unwrap().external_entity_id.unwrap();

    // Unchanged since the last publish: nothing to do.
    assert_eq!(decision.run(id).await.unwrap(), PublishDisposition::Skipped);

    scenario
        .store
        .update_record(
            id,
            RecordUpdate::new().with_last_crawled_at(Utc::now() + Duration::seconds(5)),
        )
        .await
        .unwrap();

    let disposition = decision.run(id).await.unwrap();
    assert_eq!(
        disposition,
        PublishDisposition::Published {
            external_entity_id: entity_id.clone(),
            action: PublishAction::Update,
        }
    );
    assert_eq!(scenario.publisher.create_count(), 1);
    assert_eq!(scenario.publisher.update_count(), 1);

    let versions: Vec<u32> = scenario
        .store
        .publications(id)
        .iter()
        .map(|p| p.version)
        .collect();
    assert_eq!(versions, vec![1, 2]);
}

#[tokio::test]
async fn test_not_notable_stores_fallback_and_reverts() {
    init_tracing();
    let scenario = TestScenario::new().with_assembler(MockAssembler::not_notable());
    let team = scenario.add_team(PlanTier::Pro);
    let id = scenario.add(crawled_record(team, "https://corner-cafe.test"));

    let disposition = PublishDecision::new(scenario.deps()).run(id).await.unwrap();

    assert!(matches!(
        disposition,
        PublishDisposition::Declined {
            recommendation: Some(_)
        }
    ));
    assert_eq!(scenario.store.status(id), Some(RecordStatus::Crawled));
    assert!(scenario.publisher.calls().is_empty());

    let entries = scenario.store.fallback_entries(id);
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].meta.can_publish);
    assert!(!entries[0].meta.notability.is_notable);
}

#[tokio::test]
async fn test_rejected_publish_marks_error_once() {
    init_tracing();
    let scenario = TestScenario::new()
        .with_publisher(MockPublisher::rejecting("label already used by another item"));
    let team = scenario.add_team(PlanTier::Pro);
    let id = scenario.add(crawled_record(team, "https://corner-cafe.test"));

    let err = PublishDecision::new(scenario.deps())
        .run(id)
        .await
        .unwrap_err();

    assert!(matches!(err, AutomationError::PublishRejected(_)));
    let record = scenario.store.record(id).unwrap();
    assert_eq!(record.status, RecordStatus::Error);
    assert_eq!(
        record.error_message.as_deref(),
        Some("label already used by another item")
    );
    assert!(record.external_entity_id.is_none());
    assert_eq!(
        scenario.store.status_history(id),
        vec![RecordStatus::Generating, RecordStatus::Error]
    );
    assert!(scenario.store.publications(id).is_empty());
    assert_eq!(scenario.store.fallback_count(id), 1);
}

#[tokio::test]
async fn test_assembler_failure_marks_error() {
    init_tracing();
    let scenario =
        TestScenario::new().with_assembler(MockAssembler::failing("search API timeout"));
    let team = scenario.add_team(PlanTier::Pro);
    let id = scenario.add(crawled_record(team, "https://corner-cafe.test"));

    let err = PublishDecision::new(scenario.deps())
        .run(id)
        .await
        .unwrap_err();

    assert!(matches!(err, AutomationError::Publish(_)));
    let record = scenario.store.record(id).unwrap();
    assert_eq!(record.status, RecordStatus::Error);
    assert_eq!(
        record.error_message.as_deref(),
        Some("The request timed out. Please try again later.")
    );
    assert!(scenario.publisher.calls().is_empty());
    assert_eq!(scenario.store.fallback_count(id), 0);
}

#[tokio::test]
async fn test_fallback_failure_is_swallowed() {
    init_tracing();
    let scenario = TestScenario::new();
    scenario.store.set_fail_fallback(true);
    let team = scenario.add_team(PlanTier::Pro);
    let id = scenario.add(crawled_record(team, "https://corner-cafe.test"));

    let disposition = PublishDecision::new(scenario.deps()).run(id).await.unwrap();

    assert!(disposition.is_published());
    assert_eq!(scenario.store.status(id), Some(RecordStatus::Published));
    assert_eq!(scenario.store.fallback_count(id), 0);
}

#[tokio::test]
async fn test_manual_trigger_publishes_error_record() {
    init_tracing();
    let scenario = TestScenario::new();
    let team = scenario.add_team(PlanTier::Free);
    let mut record = crawled_record(team, "https://corner-cafe.test");
    record.status = RecordStatus::Error;
    record.error_message = Some("publisher returned 502".to_string());
    let id = scenario.add(record);

    let decision = PublishDecision::new(scenario.deps());

    // The plan does not allow automatic publishing.
    assert_eq!(decision.run(id).await.unwrap(), PublishDisposition::Skipped);

    let disposition = decision.run_with(id, PublishTrigger::Manual).await.unwrap();
    assert!(disposition.is_published());

    let record = scenario.store.record(id).unwrap();
    assert_eq!(record.status, RecordStatus::Published);
    assert!(record.error_message.is_none());
    assert!(record.last_published_at.is_some());
    assert!(record.last_auto_published_at.is_none());
}

#[tokio::test]
async fn test_publish_target_comes_from_config() {
    init_tracing();
    let scenario = TestScenario::new()
        .with_config(AutomationConfig::default().with_publish_target(PublishTarget::Production));
    let team = scenario.add_team(PlanTier::Agency);
    let id = scenario.add(crawled_record(team, "https://corner-cafe.test"));

    PublishDecision::new(scenario.deps()).run(id).await.unwrap();

    assert_eq!(
        scenario.publisher.calls(),
        vec![MockPublishCall::Create {
            record_id: id,
            target: PublishTarget::Production,
        }]
    );
    assert_eq!(
        scenario.store.publications(id)[0].target,
        PublishTarget::Production
    );
}

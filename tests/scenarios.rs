//! End-to-end scenarios, driven through the public `Executor` + `Correlator` pair
//! exactly as `main.rs` wires them, rather than through any one module's internals.


use saga_orchestrator::bus::{EventSink, StatusEvent};
use saga_orchestrator::correlators::Correlator;
use saga_orchestrator::saga::{Action, StepStatus};
use std::sync::Arc;
use test_utils::*;
use uuid::Uuid;

#[tokio::test]
async fn happy_inventory_award_dispatches_and_completes() {
    let (executor, producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();

    executor
        .put(&tenant, award_asset_saga(tx, 1001, 2000))
        .await
        .unwrap();

    let commands = producer.commands().await;
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].action, Action::AwardAsset);

    let correlator = Correlator::new(executor.clone());
    correlator
        .handle(StatusEvent::new(
            tx,
            "Created",
            "1001",
            serde_json::json!({"character_id": 1001}),
        ))
        .await;

    assert!(executor.get_by_id(&tenant, tx).await.is_none());
    assert_eq!(producer.completed_count().await, 1);
}

#[tokio::test]
async fn compound_create_and_equip_succeeds_end_to_end() {
    let (executor, producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();

    executor
        .put(&tenant, create_and_equip_saga(tx, 2002, 1302000))
        .await
        .unwrap();

    let correlator = Correlator::new(executor.clone());
    correlator
        .handle(StatusEvent::new(
            tx,
            "Created",
            "2002",
            serde_json::json!({"character_id": 2002, "inventory_type": 1}),
        ))
        .await;

    let saga = executor.get_by_id(&tenant, tx).await.unwrap();
    assert_eq!(saga.steps.len(), 2);
    assert!(saga.steps[1].is_auto_equip_step());

    correlator
        .handle(StatusEvent::new(
            tx,
            "Equipped",
            "2002",
            serde_json::json!({"character_id": 2002}),
        ))
        .await;

    assert!(executor.get_by_id(&tenant, tx).await.is_none());
    assert_eq!(producer.completed_count().await, 1);
}

#[tokio::test]
async fn compound_create_and_equip_equip_failure_triggers_destroy_compensation() {
    let (executor, producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();

    executor
        .put(&tenant, create_and_equip_saga(tx, 2003, 1302000))
        .await
        .unwrap();

    let correlator = Correlator::new(executor.clone());
    correlator
        .handle(StatusEvent::new(
            tx,
            "Created",
            "2003",
            serde_json::json!({"character_id": 2003, "inventory_type": 1}),
        ))
        .await;
    correlator
        .handle(StatusEvent::new(
            tx,
            "Error",
            "2003",
            serde_json::json!({"character_id": 2003}),
        ))
        .await;

    let commands = producer.commands().await;
    assert!(commands.iter().any(|c| c.action == Action::DestroyAsset));

    let saga = executor.get_by_id(&tenant, tx).await.unwrap();
    assert_eq!(saga.steps[0].status, StepStatus::Completed);
    assert_eq!(saga.steps[1].status, StepStatus::Pending);
}

#[tokio::test]
async fn unknown_template_id_is_rejected_at_dispatch() {
    let (executor, producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();

    let result = executor.put(&tenant, award_asset_saga(tx, 3001, 0)).await;
    assert!(result.is_err());
    assert!(producer.commands().await.is_empty());
}

#[tokio::test]
async fn character_id_mismatch_on_correlated_event_fails_the_step() {
    let (executor, _producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();

    executor
        .put(&tenant, award_asset_saga(tx, 4001, 2000))
        .await
        .unwrap();

    let correlator = Correlator::new(executor.clone());
    correlator
        .handle(StatusEvent::new(
            tx,
            "Created",
            "9999",
            serde_json::json!({"character_id": 9999}),
        ))
        .await;

    let saga = executor.get_by_id(&tenant, tx).await.unwrap();
    assert_eq!(saga.steps[0].status, StepStatus::Failed);
}

#[tokio::test]
async fn duplicate_terminal_event_is_idempotent() {
    let (executor, producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();

    executor
        .put(&tenant, award_asset_saga(tx, 5001, 2000))
        .await
        .unwrap();

    let correlator = Arc::new(Correlator::new(executor.clone()));
    let event = StatusEvent::new(tx, "Created", "5001", serde_json::json!({"character_id": 5001}));
    correlator.handle(event.clone()).await;
    correlator.handle(event).await;

    assert_eq!(producer.completed_count().await, 1);
    assert!(executor.get_by_id(&tenant, tx).await.is_none());
}

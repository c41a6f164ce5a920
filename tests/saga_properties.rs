//! Property-based tests for the saga state machine's core invariants, plus targeted
//! integration tests for properties a generator doesn't fit as naturally.


use proptest::prelude::*;
use saga_orchestrator::saga::action::AwardAssetPayload;
use saga_orchestrator::saga::{Payload, Saga, SagaType, Step, StepStatus};
use saga_orchestrator::TransactionId;
use test_utils::*;
use uuid::Uuid;

fn arb_step_statuses(len: usize) -> impl Strategy<Value = Vec<StepStatus>> {
    prop::collection::vec(
        prop_oneof![
            Just(StepStatus::Pending),
            Just(StepStatus::Completed),
            Just(StepStatus::Failed),
        ],
        len,
    )
}

fn saga_with_statuses(statuses: &[StepStatus]) -> Option<Saga> {
    let steps: Vec<Step> = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let mut step = Step::new(
                format!("s{i}"),
                Payload::AwardAsset(AwardAssetPayload {
                    character_id: 1,
                    template_id: 2,
                    quantity: 1,
                }),
            );
            step.status = *status;
            step
        })
        .collect();
    Saga::new(Uuid::new_v4(), SagaType::QuestReward, "prop-test", steps).ok()
}

proptest! {
    /// Whenever `Saga::new`/`validate_state_consistency` accepts a step-status
    /// vector, Completed steps form a strict prefix (no Completed step follows a
    /// non-Completed one).
    #[test]
    fn completion_status_is_always_a_prefix(statuses in arb_step_statuses(6)) {
        if let Some(saga) = saga_with_statuses(&statuses) {
            let mut seen_non_completed = false;
            for step in &saga.steps {
                if step.status == StepStatus::Completed {
                    prop_assert!(!seen_non_completed);
                } else {
                    seen_non_completed = true;
                }
            }
        }
    }

    /// An accepted saga never has more than one Failed step.
    #[test]
    fn at_most_one_failed_step(statuses in arb_step_statuses(6)) {
        if let Some(saga) = saga_with_statuses(&statuses) {
            let failed_count = saga.steps.iter().filter(|s| s.status == StepStatus::Failed).count();
            prop_assert!(failed_count <= 1);
        }
    }

    /// `set_step_status` only ever succeeds for a pair present in the transition
    /// table; any pair not in that table is rejected without applying.
    #[test]
    fn transition_law_is_respected(
        from in prop_oneof![Just(StepStatus::Pending), Just(StepStatus::Completed), Just(StepStatus::Failed)],
        to in prop_oneof![Just(StepStatus::Pending), Just(StepStatus::Completed), Just(StepStatus::Failed)],
    ) {
        let mut step = Step::new(
            "s0",
            Payload::AwardAsset(AwardAssetPayload {
                character_id: 1,
                template_id: 2,
                quantity: 1,
            }),
        );
        step.status = from;
        let mut saga = Saga::new(Uuid::new_v4(), SagaType::QuestReward, "prop-test", vec![step]).unwrap();

        let allowed = from.can_transition_to(to);
        let result = saga.set_step_status(0, to);

        prop_assert_eq!(result.is_ok(), allowed);
        if !allowed {
            prop_assert_eq!(saga.steps[0].status, from);
        } else {
            prop_assert_eq!(saga.steps[0].status, to);
        }
    }
}

/// Two `StepCompleted(true)` calls for the same transaction in a row produce the
/// same end state as one (idempotent under at-least-once redelivery).
#[tokio::test]
async fn duplicate_step_completed_is_idempotent() {
    let (executor, producer) = test_executor();
    let tenant = test_tenant();
    let tx: TransactionId = Uuid::new_v4();
    executor
        .put(&tenant, award_asset_saga(tx, 1, 2))
        .await
        .unwrap();

    executor.step_completed(&tenant, tx, true).await.unwrap();
    assert!(executor.get_by_id(&tenant, tx).await.is_none());
    assert_eq!(producer.completed_count().await, 1);

    // Saga already removed; a redelivered completion event is a pure no-op.
    executor.step_completed(&tenant, tx, true).await.unwrap();
    assert_eq!(producer.completed_count().await, 1);
}

/// At most one synthesized auto-equip step is ever appended to a
/// `CreateAndEquipAsset` saga, even if the triggering `Created` event is redelivered.
#[tokio::test]
async fn auto_equip_step_synthesized_at_most_once() {
    use saga_orchestrator::bus::{EventSink, StatusEvent};
    use saga_orchestrator::correlators::Correlator;

    let (executor, _producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();
    executor
        .put(&tenant, create_and_equip_saga(tx, 7, 1302000))
        .await
        .unwrap();

    let correlator = Correlator::new(executor.clone());
    let created = StatusEvent::new(tx, "Created", "7", serde_json::json!({"character_id": 7, "inventory_type": 1}));
    correlator.handle(created.clone()).await;
    let saga = executor.get_by_id(&tenant, tx).await.unwrap();
    assert_eq!(saga.steps.len(), 2);

    // Saga is now sitting on the synthesized equip step (Pending), not the Created
    // one; but if the create event were redelivered it must not add a second equip step.
    correlator.handle(created).await;
    let saga = executor.get_by_id(&tenant, tx).await.unwrap();
    assert_eq!(saga.steps.iter().filter(|s| s.is_auto_equip_step()).count(), 1);
}

/// Every dispatched action emits exactly one command.
#[tokio::test]
async fn dispatch_emits_exactly_one_command() {
    let (executor, producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();
    executor
        .put(&tenant, award_asset_saga(tx, 10, 20))
        .await
        .unwrap();
    assert_eq!(producer.commands().await.len(), 1);
}

/// An absent-transaction call degrades to a no-op rather than an error surfaced to
/// the caller.
#[tokio::test]
async fn operations_on_absent_transaction_are_noop() {
    let (executor, producer) = test_executor();
    let tenant = test_tenant();
    let tx = Uuid::new_v4();

    executor.step(&tenant, tx).await.unwrap();
    executor.step_completed(&tenant, tx, true).await.unwrap();

    assert!(producer.sent().await.is_empty());
}

//! Saga data model: the saga itself, its steps and their statuses.

pub mod action;
pub mod step;

pub use action::{Action, Payload};
pub use step::{Step, StepStatus, AUTO_EQUIP_STEP_PREFIX};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::OrchestratorError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        TenantId(value.to_string())
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        TenantId(value)
    }
}

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaType {
    InventoryTransaction,
    QuestReward,
    TradeTransaction,
    CharacterCreation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Saga {
    pub transaction_id: TransactionId,
    pub saga_type: SagaType,
    pub initiated_by: String,
    pub steps: Vec<Step>,
}

impl Saga {
    pub fn new(
        transaction_id: TransactionId,
        saga_type: SagaType,
        initiated_by: impl Into<String>,
        steps: Vec<Step>,
    ) -> Result<Self, OrchestratorError> {
        let saga = Self {
            transaction_id,
            saga_type,
            initiated_by: initiated_by.into(),
            steps,
        };
        saga.validate_state_consistency()?;
        Ok(saga)
    }

    /// Whether any step is Failed.
    pub fn failing(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }

    /// The earliest Pending step, if any.
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Pending)
    }

    pub fn find_earliest_pending_step_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status == StepStatus::Pending)
    }

    /// The furthest (last) Completed step, searched from the tail.
    pub fn find_furthest_completed_step_index(&self) -> Option<usize> {
        self.steps
            .iter()
            .rposition(|s| s.status == StepStatus::Completed)
    }

    pub fn find_failed_step_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status == StepStatus::Failed)
    }

    pub fn has_auto_equip_step(&self) -> bool {
        self.steps.iter().any(|s| s.is_auto_equip_step())
    }

    /// Validates the requested transition against the allowed status transitions and, if valid,
    /// applies it and bumps `updated_at`. Rejects the mutation (leaving prior state
    /// untouched) on an invalid pair.
    pub fn set_step_status(
        &mut self,
        index: usize,
        new_status: StepStatus,
    ) -> Result<(), OrchestratorError> {
        let step = self
            .steps
            .get_mut(index)
            .ok_or(OrchestratorError::InvariantViolation {
                detail: format!("no step at index {index}"),
            })?;

        if !step.status.can_transition_to(new_status) {
            return Err(OrchestratorError::InvariantViolation {
                detail: format!(
                    "invalid transition {:?} -> {:?} for step {}",
                    step.status, new_status, step.step_id
                ),
            });
        }

        step.status = new_status;
        step.updated_at = Utc::now();
        Ok(())
    }

    /// Appends a step at the tail. The contract requires the appended step be Pending,
    /// which preserves the completion-prefix invariant given the existing prefix
    /// already satisfies it.
    pub fn add_step(&mut self, step: Step) -> Result<(), OrchestratorError> {
        if step.status != StepStatus::Pending {
            return Err(OrchestratorError::InvariantViolation {
                detail: "appended steps must start Pending".to_string(),
            });
        }
        if self.steps.iter().any(|s| s.step_id == step.step_id) {
            return Err(OrchestratorError::InvariantViolation {
                detail: format!("duplicate step id {}", step.step_id),
            });
        }
        self.steps.push(step);
        self.validate_state_consistency()
    }

    /// Verifies the saga's structural invariants: non-empty steps, unique step ids, at
    /// most one Failed step, and that Completed steps form a strict prefix.
    pub fn validate_state_consistency(&self) -> Result<(), OrchestratorError> {
        if self.steps.is_empty() {
            return Err(OrchestratorError::InvariantViolation {
                detail: "saga has no steps".to_string(),
            });
        }

        let mut seen_ids = HashSet::with_capacity(self.steps.len());
        for step in &self.steps {
            if !seen_ids.insert(step.step_id.as_str()) {
                return Err(OrchestratorError::InvariantViolation {
                    detail: format!("duplicate step id {}", step.step_id),
                });
            }
        }

        let failed_count = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count();
        if failed_count > 1 {
            return Err(OrchestratorError::InvariantViolation {
                detail: format!("{failed_count} steps Failed simultaneously"),
            });
        }

        // Once a non-Completed step appears, no later step may be Completed.
        let mut seen_non_completed = false;
        for step in &self.steps {
            match step.status {
                StepStatus::Completed => {
                    if seen_non_completed {
                        return Err(OrchestratorError::InvariantViolation {
                            detail: "completion prefix violated".to_string(),
                        });
                    }
                }
                StepStatus::Pending | StepStatus::Failed => seen_non_completed = true,
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaSnapshotMeta {
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saga::action::{AwardAssetPayload, CreateAndEquipAssetPayload};

    fn award_step(id: &str) -> Step {
        Step::new(
            id,
            Payload::AwardAsset(AwardAssetPayload {
                character_id: 123,
                template_id: 2000,
                quantity: 5,
            }),
        )
    }

    #[test]
    fn new_saga_requires_nonempty_steps() {
        let result = Saga::new(Uuid::new_v4(), SagaType::QuestReward, "test", vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn current_step_is_earliest_pending() {
        let mut saga =
            Saga::new(Uuid::new_v4(), SagaType::QuestReward, "test", vec![award_step("s1")])
                .unwrap();
        assert_eq!(saga.current_step().unwrap().step_id, "s1");
        saga.set_step_status(0, StepStatus::Completed).unwrap();
        assert!(saga.current_step().is_none());
    }

    #[test]
    fn rejects_invalid_transition_and_leaves_state_untouched() {
        let mut saga =
            Saga::new(Uuid::new_v4(), SagaType::QuestReward, "test", vec![award_step("s1")])
                .unwrap();
        saga.set_step_status(0, StepStatus::Completed).unwrap();
        let err = saga.set_step_status(0, StepStatus::Pending);
        assert!(err.is_err());
        assert_eq!(saga.steps[0].status, StepStatus::Completed);
    }

    #[test]
    fn at_most_one_failed_step_is_enforced() {
        let mut saga = Saga::new(
            Uuid::new_v4(),
            SagaType::QuestReward,
            "test",
            vec![award_step("s1"), award_step("s2")],
        )
        .unwrap();
        saga.set_step_status(0, StepStatus::Failed).unwrap();
        // Manually forcing a second Failed step must be caught by validate_state_consistency.
        saga.steps[1].status = StepStatus::Failed;
        assert!(saga.validate_state_consistency().is_err());
    }

    #[test]
    fn add_step_requires_pending_status() {
        let mut saga =
            Saga::new(Uuid::new_v4(), SagaType::QuestReward, "test", vec![award_step("s1")])
                .unwrap();
        let mut bad_step = award_step("s2");
        bad_step.status = StepStatus::Completed;
        assert!(saga.add_step(bad_step).is_err());
    }

    #[test]
    fn compound_action_is_flagged() {
        let step = Step::new(
            "s1",
            Payload::CreateAndEquipAsset(CreateAndEquipAssetPayload {
                character_id: 123,
                template_id: 1302000,
                quantity: 1,
            }),
        );
        assert!(step.action().is_compound());
    }
}

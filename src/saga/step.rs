//! A single dispatchable step within a saga.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::{Action, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
}

impl StepStatus {
    /// The allowed status transitions. All other pairs are invalid.
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Completed)
                | (StepStatus::Pending, StepStatus::Failed)
                | (StepStatus::Completed, StepStatus::Failed)
                | (StepStatus::Failed, StepStatus::Pending)
        )
    }
}

/// Prefix marking a step as the dynamically-synthesized equip half of a
/// `CreateAndEquipAsset` compound action. Load-bearing: the Compensator uses its
/// presence to distinguish "created but failed to equip" from "failed during creation".
pub const AUTO_EQUIP_STEP_PREFIX: &str = "auto_equip_step_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step_id: String,
    pub status: StepStatus,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Step {
    pub fn new(step_id: impl Into<String>, payload: Payload) -> Self {
        let now = Utc::now();
        Self {
            step_id: step_id.into(),
            status: StepStatus::Pending,
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn action(&self) -> Action {
        self.payload.action()
    }

    pub fn is_auto_equip_step(&self) -> bool {
        self.step_id.starts_with(AUTO_EQUIP_STEP_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saga::action::AwardAssetPayload;

    fn sample_step() -> Step {
        Step::new(
            "s1",
            Payload::AwardAsset(AwardAssetPayload {
                character_id: 123,
                template_id: 2000,
                quantity: 5,
            }),
        )
    }

    #[test]
    fn valid_transitions_are_accepted() {
        assert!(StepStatus::Pending.can_transition_to(StepStatus::Completed));
        assert!(StepStatus::Pending.can_transition_to(StepStatus::Failed));
        assert!(StepStatus::Completed.can_transition_to(StepStatus::Failed));
        assert!(StepStatus::Failed.can_transition_to(StepStatus::Pending));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        assert!(!StepStatus::Completed.can_transition_to(StepStatus::Pending));
        assert!(!StepStatus::Pending.can_transition_to(StepStatus::Pending));
        assert!(!StepStatus::Failed.can_transition_to(StepStatus::Failed));
        assert!(!StepStatus::Completed.can_transition_to(StepStatus::Completed));
    }

    #[test]
    fn auto_equip_prefix_is_detected() {
        let mut step = sample_step();
        assert!(!step.is_auto_equip_step());
        step.step_id = "auto_equip_step_1".to_string();
        assert!(step.is_auto_equip_step());
    }
}

//! Action Dispatch Table: maps each `Action` to a handler that validates the step's
//! payload and emits exactly one command.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::bus::{Command, CommandProducer};
use crate::error::OrchestratorError;
use crate::saga::{Action, Step, TransactionId};

/// One handler per `Action`. Implementations must not wait for the result event;
/// progression after dispatch is driven entirely by the Event Correlators (4.F).
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn dispatch(
        &self,
        producer: &dyn CommandProducer,
        transaction_id: TransactionId,
        step: &Step,
    ) -> Result<(), OrchestratorError>;
}

pub struct DispatchTable {
    handlers: HashMap<Action, Arc<dyn ActionHandler>>,
}

impl DispatchTable {
    pub fn handler_for(&self, action: Action) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&action).cloned()
    }

    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder {
            handlers: HashMap::new(),
        }
    }
}

pub struct DispatchTableBuilder {
    handlers: HashMap<Action, Arc<dyn ActionHandler>>,
}

impl DispatchTableBuilder {
    pub fn with_handler(mut self, action: Action, handler: Arc<dyn ActionHandler>) -> Self {
        self.handlers.insert(action, handler);
        self
    }

    pub fn build(self) -> DispatchTable {
        DispatchTable {
            handlers: self.handlers,
        }
    }
}

/// The standard dispatch table covering every action in the glossary, using the
/// straightforward handler (assert payload matches, no extra domain validation, emit
/// one command keyed by the subject id).
pub fn default_dispatch_table() -> DispatchTable {
    use Action::*;
    let mut builder = DispatchTable::builder();
    for action in [
        AwardAsset,
        AwardExperience,
        AwardLevel,
        AwardMesos,
        WarpToRandomPortal,
        WarpToPortal,
        DestroyAsset,
        EquipAsset,
        UnequipAsset,
        ChangeJob,
        CreateSkill,
        UpdateSkill,
        ValidateCharacterState,
        RequestGuildName,
        RequestGuildEmblem,
        RequestGuildDisband,
        RequestGuildCapacityIncrease,
        CreateInvite,
        CreateCharacter,
        CreateAndEquipAsset,
    ] {
        builder = builder.with_handler(action, Arc::new(GenericCommandHandler));
    }
    builder.build()
}

/// Handles the majority of actions: assert the payload matches, derive a subject id,
/// emit a single command. `AwardAsset` additionally validates the template id; other
/// actions have no extra domain pre-check in this core.
struct GenericCommandHandler;

#[async_trait]
impl ActionHandler for GenericCommandHandler {
    async fn dispatch(
        &self,
        producer: &dyn CommandProducer,
        transaction_id: TransactionId,
        step: &Step,
    ) -> Result<(), OrchestratorError> {
        use crate::saga::Payload::*;

        let subject_id = subject_id_for(step)?;

        if let AwardAsset(payload) = &step.payload {
            if payload.template_id <= 0 {
                return Err(OrchestratorError::ValidationFailure {
                    step_id: step.step_id.clone(),
                    reason: format!("invalid templateId {}", payload.template_id),
                });
            }
        }
        if let CreateAndEquipAsset(payload) = &step.payload {
            if payload.template_id <= 0 {
                return Err(OrchestratorError::ValidationFailure {
                    step_id: step.step_id.clone(),
                    reason: format!("invalid templateId {}", payload.template_id),
                });
            }
        }

        let body = serde_json::to_value(&step.payload).map_err(|e| {
            tracing::error!(error = %e, step_id = %step.step_id, "payload serialize failed");
            OrchestratorError::InvalidPayload {
                step_id: step.step_id.clone(),
                action: step.action(),
            }
        })?;

        let command = Command::new(transaction_id, subject_id, step.action(), body);
        producer
            .send_command(command)
            .await
            .map_err(|e| OrchestratorError::DispatchFailure {
                step_id: step.step_id.clone(),
                reason: e.to_string(),
            })
    }
}

/// Derives the partition-key subject id from the payload's primary id field.
fn subject_id_for(step: &Step) -> Result<String, OrchestratorError> {
    use crate::saga::Payload::*;
    let id = match &step.payload {
        AwardAsset(p) => p.character_id,
        AwardExperience(p) => p.character_id,
        AwardLevel(p) => p.character_id,
        AwardMesos(p) => p.character_id,
        WarpToRandomPortal(p) => p.character_id,
        WarpToPortal(p) => p.character_id,
        DestroyAsset(p) => p.character_id,
        EquipAsset(p) => p.character_id,
        UnequipAsset(p) => p.character_id,
        ChangeJob(p) => p.character_id,
        CreateSkill(p) => p.character_id,
        UpdateSkill(p) => p.character_id,
        ValidateCharacterState(p) => p.character_id,
        RequestGuildName(p) => p.guild_id,
        RequestGuildEmblem(p) => p.guild_id,
        RequestGuildDisband(p) => p.guild_id,
        RequestGuildCapacityIncrease(p) => p.guild_id,
        CreateInvite(p) => p.referrer_id,
        CreateCharacter(p) => p.account_id,
        CreateAndEquipAsset(p) => p.character_id,
    };
    Ok(id.to_string())
}

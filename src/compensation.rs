//! Compensator: per-action reverse operations, invoked by the Executor when a saga is
//! failing.

use crate::bus::{Command, CommandProducer};
use crate::error::OrchestratorError;
use crate::saga::action::{DestroyAssetPayload, EquipAssetPayload};
use crate::saga::{Action, Payload, Saga, Step, TransactionId};

/// Compensates the given failed step. Returns `Ok(true)` if a reverse command was
/// emitted, `Ok(false)` if compensation was a no-op.
pub async fn compensate(
    producer: &dyn CommandProducer,
    transaction_id: TransactionId,
    saga: &Saga,
    failed_step: &Step,
) -> Result<bool, OrchestratorError> {
    if failed_step.is_auto_equip_step() {
        return destroy_originating_asset(producer, transaction_id, saga, failed_step).await;
    }

    match &failed_step.payload {
        Payload::EquipAsset(payload) => {
            emit_swapped(
                producer,
                transaction_id,
                &failed_step.step_id,
                Action::UnequipAsset,
                payload,
            )
            .await?;
            Ok(true)
        }
        Payload::UnequipAsset(payload) => {
            emit_swapped(
                producer,
                transaction_id,
                &failed_step.step_id,
                Action::EquipAsset,
                payload,
            )
            .await?;
            Ok(true)
        }
        Payload::CreateCharacter(_) => Ok(false),
        Payload::CreateAndEquipAsset(_) => {
            if saga.has_auto_equip_step() {
                destroy_originating_asset(producer, transaction_id, saga, failed_step).await
            } else {
                // Failure happened during creation itself; nothing was created yet.
                Ok(false)
            }
        }
        _ => Ok(false),
    }
}

/// Emits `DestroyAsset` for the `CreateAndEquipAsset` step that originated the asset,
/// whether that step itself failed or its synthesized auto-equip step did.
async fn destroy_originating_asset(
    producer: &dyn CommandProducer,
    transaction_id: TransactionId,
    saga: &Saga,
    failed_step: &Step,
) -> Result<bool, OrchestratorError> {
    let originating = if let Payload::CreateAndEquipAsset(payload) = &failed_step.payload {
        payload
    } else {
        saga.steps
            .iter()
            .find_map(|s| match &s.payload {
                Payload::CreateAndEquipAsset(payload) => Some(payload),
                _ => None,
            })
            .ok_or_else(|| OrchestratorError::CompensationFailure {
                step_id: failed_step.step_id.clone(),
                reason: "no originating CreateAndEquipAsset step found for auto-equip step"
                    .to_string(),
            })?
    };

    let body = serde_json::to_value(DestroyAssetPayload {
        character_id: originating.character_id,
        template_id: originating.template_id,
        quantity: originating.quantity,
    })
    .map_err(|e| {
        tracing::error!(error = %e, step_id = %failed_step.step_id, "payload serialize failed");
        OrchestratorError::InvalidPayload {
            step_id: failed_step.step_id.clone(),
            action: Action::DestroyAsset,
        }
    })?;
    let command = Command::new(
        transaction_id,
        originating.character_id.to_string(),
        Action::DestroyAsset,
        body,
    );
    producer
        .send_command(command)
        .await
        .map_err(|e| OrchestratorError::CompensationFailure {
            step_id: failed_step.step_id.clone(),
            reason: e.to_string(),
        })?;
    Ok(true)
}

async fn emit_swapped(
    producer: &dyn CommandProducer,
    transaction_id: TransactionId,
    step_id: &str,
    reverse_action: Action,
    payload: &EquipAssetPayload,
) -> Result<(), OrchestratorError> {
    let swapped = EquipAssetPayload {
        character_id: payload.character_id,
        inventory_type: payload.inventory_type,
        source: payload.destination,
        destination: payload.source,
    };
    let body = serde_json::to_value(&swapped).map_err(|e| {
        tracing::error!(error = %e, step_id, "payload serialize failed");
        OrchestratorError::InvalidPayload {
            step_id: step_id.to_string(),
            action: reverse_action,
        }
    })?;
    let command = Command::new(transaction_id, payload.character_id.to_string(), reverse_action, body);
    producer
        .send_command(command)
        .await
        .map_err(|e| OrchestratorError::CompensationFailure {
            step_id: step_id.to_string(),
            reason: e.to_string(),
        })
}

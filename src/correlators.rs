//! Event Correlators: match inbound status events against live sagas by transaction id
//! and advance or fail the correlated step.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::bus::{EventSink, StatusEvent};
use crate::config::OrchestratorConfig;
use crate::executor::Executor;
use crate::saga::action::EquipAssetPayload;
use crate::saga::step::AUTO_EQUIP_STEP_PREFIX;
use crate::saga::{Action, Payload, Step, TenantId};

/// Which domain subsystem a status event originated from, used only to decide the
/// character-id field name to read from the event body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDomain {
    Compartment,
    Character,
    Skill,
    Guild,
    Invite,
}

pub struct Correlator {
    executor: Arc<Executor>,
    tenant_resolver: Box<dyn Fn(&StatusEvent) -> TenantId + Send + Sync>,
}

impl Correlator {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            tenant_resolver: Box::new(|_event| TenantId::from("default")),
        }
    }

    pub fn with_tenant_resolver(
        executor: Arc<Executor>,
        resolver: impl Fn(&StatusEvent) -> TenantId + Send + Sync + 'static,
    ) -> Self {
        Self {
            executor,
            tenant_resolver: Box::new(resolver),
        }
    }

    async fn handle_event(&self, domain: EventDomain, event: StatusEvent) {
        let tenant_id = (self.tenant_resolver)(&event);
        let transaction_id = event.transaction_id;

        let Some(saga) = self.executor.get_by_id(&tenant_id, transaction_id).await else {
            debug!(%transaction_id, event_type = %event.event_type, "correlator: saga absent, idempotent no-op");
            return;
        };

        let Some(current) = saga.current_step() else {
            debug!(%transaction_id, "correlator: no current step, ignoring");
            return;
        };

        if let Some(expected) = character_id_of(&current.payload) {
            if let Some(actual) = character_id_field(domain, &event.body) {
                if expected != actual {
                    warn!(%transaction_id, expected, actual, "correlator: character id mismatch");
                    let _ = self
                        .executor
                        .step_completed(&tenant_id, transaction_id, false)
                        .await;
                    return;
                }
            }
        }

        let success = is_success_event(&event.event_type);

        if success
            && current.action() == Action::CreateAndEquipAsset
            && event.event_type == "Created"
        {
            if !saga.has_auto_equip_step() {
                match synthesize_equip_step(&event, self.executor.config()) {
                    Ok(step) => {
                        if let Err(e) = self.executor.add_step(&tenant_id, transaction_id, step).await
                        {
                            warn!(%transaction_id, error = %e, "correlator: failed to synthesize equip step");
                            let _ = self
                                .executor
                                .step_completed(&tenant_id, transaction_id, false)
                                .await;
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(%transaction_id, error = %e, "correlator: failed to derive equip payload");
                        let _ = self
                            .executor
                            .step_completed(&tenant_id, transaction_id, false)
                            .await;
                        return;
                    }
                }
            }
            // Guarded above by has_auto_equip_step -- at most one synthesis per saga,
            // even if this Created event is redelivered.
        }

        let _ = self
            .executor
            .step_completed(&tenant_id, transaction_id, success)
            .await;
    }
}

#[async_trait]
impl EventSink for Correlator {
    async fn handle(&self, event: StatusEvent) {
        let domain = match event.event_type.as_str() {
            "Created" | "CreationFailed" | "Deleted" | "Equipped" | "Unequipped" | "Error" => {
                EventDomain::Compartment
            }
            other => {
                debug!(event_type = other, "correlator: unrecognized event type, ignoring");
                return;
            }
        };
        self.handle_event(domain, event).await;
    }
}

fn is_success_event(event_type: &str) -> bool {
    matches!(event_type, "Created" | "Deleted" | "Equipped" | "Unequipped")
}

fn character_id_of(payload: &Payload) -> Option<i64> {
    use Payload::*;
    match payload {
        AwardAsset(p) => Some(p.character_id),
        AwardExperience(p) => Some(p.character_id),
        AwardLevel(p) => Some(p.character_id),
        AwardMesos(p) => Some(p.character_id),
        WarpToRandomPortal(p) => Some(p.character_id),
        WarpToPortal(p) => Some(p.character_id),
        DestroyAsset(p) => Some(p.character_id),
        EquipAsset(p) => Some(p.character_id),
        UnequipAsset(p) => Some(p.character_id),
        ChangeJob(p) => Some(p.character_id),
        CreateSkill(p) => Some(p.character_id),
        UpdateSkill(p) => Some(p.character_id),
        ValidateCharacterState(p) => Some(p.character_id),
        CreateAndEquipAsset(p) => Some(p.character_id),
        RequestGuildName(_)
        | RequestGuildEmblem(_)
        | RequestGuildDisband(_)
        | RequestGuildCapacityIncrease(_)
        | CreateInvite(_)
        | CreateCharacter(_) => None,
    }
}

fn character_id_field(_domain: EventDomain, body: &serde_json::Value) -> Option<i64> {
    body.get("character_id").and_then(|v| v.as_i64())
}

/// Synthesizes the dynamically-inserted `EquipAsset` step for a `CreateAndEquipAsset`
/// compound action. Uses the event body's inventory type; falls back to
/// the configured default slot positions when the body is silent on slots.
fn synthesize_equip_step(
    event: &StatusEvent,
    config: &OrchestratorConfig,
) -> Result<Step, crate::error::OrchestratorError> {
    let character_id = character_id_field(EventDomain::Compartment, &event.body).ok_or_else(|| {
        crate::error::OrchestratorError::ValidationFailure {
            step_id: "<synthesized>".to_string(),
            reason: "Created event missing character_id".to_string(),
        }
    })?;
    let inventory_type = event
        .body
        .get("inventory_type")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| crate::error::OrchestratorError::ValidationFailure {
            step_id: "<synthesized>".to_string(),
            reason: "Created event missing inventory_type".to_string(),
        })? as i32;
    let source = event
        .body
        .get("slot")
        .and_then(|v| v.as_i64())
        .map(|v| v as i16)
        .unwrap_or(config.default_equip_source_slot);
    let destination = config.default_equip_destination_slot;

    let step_id = format!("{AUTO_EQUIP_STEP_PREFIX}{}", uuid::Uuid::new_v4().as_u128() as u64);
    Ok(Step::new(
        step_id,
        Payload::EquipAsset(EquipAssetPayload {
            character_id,
            inventory_type,
            source,
            destination,
        }),
    ))
}

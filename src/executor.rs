//! The Executor: the state machine driving a saga forward one dispatch at a time,
//! through discrete, callback-resumed entry points rather than a blocking run loop.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::bus::{CommandProducer, CompletedEvent};
use crate::compensation;
use crate::config::OrchestratorConfig;
use crate::dispatch::DispatchTable;
use crate::error::OrchestratorError;
use crate::persistence::{NoOpMirror, PersistenceMirror};
use crate::registry::Registry;
use crate::saga::{Saga, StepStatus, TenantId, TransactionId};

pub struct Executor {
    registry: Arc<Registry>,
    dispatch_table: DispatchTable,
    producer: Arc<dyn CommandProducer>,
    config: OrchestratorConfig,
    mirror: Arc<dyn PersistenceMirror>,
}

impl Executor {
    pub fn new(
        registry: Arc<Registry>,
        dispatch_table: DispatchTable,
        producer: Arc<dyn CommandProducer>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            dispatch_table,
            producer,
            config,
            mirror: Arc::new(NoOpMirror),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn PersistenceMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Registers a new saga and immediately drives it forward.
    pub async fn put(&self, tenant_id: &TenantId, saga: Saga) -> Result<(), OrchestratorError> {
        let transaction_id = saga.transaction_id;
        info!(%transaction_id, tenant = %tenant_id, "saga registered");
        self.registry.put(tenant_id, saga).await?;
        self.mirror_current(tenant_id, transaction_id).await;
        self.step(tenant_id, transaction_id).await
    }

    /// Writes the current saga state to the persistence mirror, if enabled. Best-effort:
    /// the mirror trait itself never returns an error.
    async fn mirror_current(&self, tenant_id: &TenantId, transaction_id: TransactionId) {
        if !self.config.enable_persistence_mirror {
            return;
        }
        if let Some(saga) = self.registry.get_by_id(tenant_id, transaction_id).await {
            self.mirror.mirror(tenant_id, &saga).await;
        }
    }

    /// Drives the saga forward one action dispatch.
    pub async fn step(
        &self,
        tenant_id: &TenantId,
        transaction_id: TransactionId,
    ) -> Result<(), OrchestratorError> {
        let Some(saga) = self.registry.get_by_id(tenant_id, transaction_id).await else {
            debug!(%transaction_id, "step: saga absent, no-op");
            return Ok(());
        };

        if saga.failing() {
            let failed_index = saga
                .find_failed_step_index()
                .expect("failing() implies a Failed step exists");
            let failed_step = saga.steps[failed_index].clone();
            debug!(%transaction_id, step_id = %failed_step.step_id, "step: saga failing, engaging compensator");
            let emitted = compensation::compensate(
                self.producer.as_ref(),
                transaction_id,
                &saga,
                &failed_step,
            )
            .await?;
            debug!(%transaction_id, emitted, "compensation dispatched");
            return self
                .registry
                .mutate(tenant_id, transaction_id, |saga| {
                    saga.set_step_status(failed_index, StepStatus::Pending)
                })
                .await
                .map(|_| ());
        }

        let Some(current) = saga.current_step().cloned() else {
            return self.emit_completed_and_remove(tenant_id, transaction_id).await;
        };

        let handler = self.dispatch_table.handler_for(current.action());
        let Some(handler) = handler else {
            warn!(%transaction_id, action = ?current.action(), "no handler registered for action");
            return Err(OrchestratorError::InvalidPayload {
                step_id: current.step_id.clone(),
                action: current.action(),
            });
        };

        handler
            .dispatch(self.producer.as_ref(), transaction_id, &current)
            .await
    }

    /// Called by an Event Correlator when a status event correlated to this saga
    /// arrives.
    pub async fn step_completed(
        &self,
        tenant_id: &TenantId,
        transaction_id: TransactionId,
        success: bool,
    ) -> Result<(), OrchestratorError> {
        let Some(saga) = self.registry.get_by_id(tenant_id, transaction_id).await else {
            debug!(%transaction_id, "step_completed: saga absent, no-op");
            return Ok(());
        };

        let result = if saga.failing() {
            self.mark_furthest_completed_step_failed(tenant_id, transaction_id).await
        } else {
            let target = if success {
                StepStatus::Completed
            } else {
                StepStatus::Failed
            };
            self.mark_earliest_pending_step(tenant_id, transaction_id, target).await
        };

        match result {
            Ok(()) | Err(OrchestratorError::Absent { .. }) => {}
            Err(err) if matches!(err, OrchestratorError::ValidationFailure { .. }) => {
                // "no pending step" is surfaced as ValidationFailure (see
                // mark_earliest_pending_step); this is a non-fatal degrade-to-no-op
                // case for idempotent redelivery, so step_completed still re-drives.
                debug!(%transaction_id, "step_completed: no pending step, idempotent no-op");
            }
            Err(err) => return Err(err),
        }

        self.step(tenant_id, transaction_id).await
    }

    /// Finds the earliest Pending step and applies the transition.
    pub async fn mark_earliest_pending_step(
        &self,
        tenant_id: &TenantId,
        transaction_id: TransactionId,
        status: StepStatus,
    ) -> Result<(), OrchestratorError> {
        let result = self
            .registry
            .mutate(tenant_id, transaction_id, |saga| {
                let Some(index) = saga.find_earliest_pending_step_index() else {
                    return Err(OrchestratorError::ValidationFailure {
                        step_id: "<none>".to_string(),
                        reason: "no pending step".to_string(),
                    });
                };
                saga.set_step_status(index, status)
            })
            .await;
        if result.is_ok() {
            self.mirror_current(tenant_id, transaction_id).await;
        }
        result
    }

    /// Finds the furthest (last) Completed step and transitions it Completed -> Failed.
    /// Used during compensation walk-back.
    pub async fn mark_furthest_completed_step_failed(
        &self,
        tenant_id: &TenantId,
        transaction_id: TransactionId,
    ) -> Result<(), OrchestratorError> {
        let result = self
            .registry
            .mutate(tenant_id, transaction_id, |saga| {
                let Some(index) = saga.find_furthest_completed_step_index() else {
                    return Err(OrchestratorError::ValidationFailure {
                        step_id: "<none>".to_string(),
                        reason: "no completed step to walk back".to_string(),
                    });
                };
                saga.set_step_status(index, StepStatus::Failed)
            })
            .await;
        if result.is_ok() {
            self.mirror_current(tenant_id, transaction_id).await;
        }
        result
    }

    /// Appends a step at the saga tail; used by Event Correlators for compound-action
    /// step synthesis.
    pub async fn add_step(
        &self,
        tenant_id: &TenantId,
        transaction_id: TransactionId,
        step: crate::saga::Step,
    ) -> Result<(), OrchestratorError> {
        let result = self
            .registry
            .mutate(tenant_id, transaction_id, |saga| saga.add_step(step))
            .await;
        if result.is_ok() {
            self.mirror_current(tenant_id, transaction_id).await;
        }
        result
    }

    pub async fn get_by_id(&self, tenant_id: &TenantId, transaction_id: TransactionId) -> Option<Saga> {
        self.registry.get_by_id(tenant_id, transaction_id).await
    }

    pub async fn get_all(&self, tenant_id: &TenantId) -> Vec<Saga> {
        self.registry.get_all(tenant_id).await
    }

    async fn emit_completed_and_remove(
        &self,
        tenant_id: &TenantId,
        transaction_id: TransactionId,
    ) -> Result<(), OrchestratorError> {
        info!(%transaction_id, "saga complete, emitting COMPLETED");
        if let Err(e) = self
            .producer
            .send_completed(CompletedEvent {
                transaction_id,
                completed_at: chrono::Utc::now(),
            })
            .await
        {
            error!(%transaction_id, error = %e, "failed to emit COMPLETED event");
        }
        self.registry.remove(tenant_id, transaction_id).await;
        Ok(())
    }
}

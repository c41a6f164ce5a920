//! Tenant-scoped Registry: the sole place holding saga state, process-wide, protected
//! by a reader/writer lock over a single `HashMap<(TenantId, TransactionId), Saga>`.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::OrchestratorError;
use crate::saga::{Saga, TenantId, TransactionId};

#[derive(Default)]
pub struct Registry {
    sagas: RwLock<HashMap<(TenantId, TransactionId), Saga>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sagas: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a new saga. Its invariants must already hold (checked at `Saga`
    /// construction); this only rejects a duplicate transaction id for the tenant.
    pub async fn put(&self, tenant_id: &TenantId, saga: Saga) -> Result<(), OrchestratorError> {
        let mut sagas = self.sagas.write().await;
        let key = (tenant_id.clone(), saga.transaction_id);
        if sagas.contains_key(&key) {
            return Err(OrchestratorError::InvariantViolation {
                detail: format!("transaction {} already registered", saga.transaction_id),
            });
        }
        sagas.insert(key, saga);
        Ok(())
    }

    pub async fn get_by_id(
        &self,
        tenant_id: &TenantId,
        transaction_id: TransactionId,
    ) -> Option<Saga> {
        self.sagas
            .read()
            .await
            .get(&(tenant_id.clone(), transaction_id))
            .cloned()
    }

    pub async fn get_all(&self, tenant_id: &TenantId) -> Vec<Saga> {
        self.sagas
            .read()
            .await
            .iter()
            .filter(|((t, _), _)| t == tenant_id)
            .map(|(_, saga)| saga.clone())
            .collect()
    }

    pub async fn remove(&self, tenant_id: &TenantId, transaction_id: TransactionId) {
        self.sagas
            .write()
            .await
            .remove(&(tenant_id.clone(), transaction_id));
    }

    /// Performs a full read-modify-write under the exclusive lock, so a single logical
    /// saga mutation (e.g. a `StepCompleted` call) cannot interleave with a concurrent
    /// one for the same transaction id.
    pub async fn mutate<F, T>(
        &self,
        tenant_id: &TenantId,
        transaction_id: TransactionId,
        f: F,
    ) -> Result<T, OrchestratorError>
    where
        F: FnOnce(&mut Saga) -> Result<T, OrchestratorError>,
    {
        let mut sagas = self.sagas.write().await;
        let key = (tenant_id.clone(), transaction_id);
        let saga = sagas.get_mut(&key).ok_or_else(|| OrchestratorError::Absent {
            tenant_id: tenant_id.0.clone(),
            transaction_id,
        })?;
        let snapshot = saga.clone();
        match f(saga) {
            Ok(value) => Ok(value),
            Err(err) => {
                // Invariant violations leave the registry untouched.
                *saga = snapshot;
                Err(err)
            }
        }
    }
}

/// Process-wide singleton, initialized exactly once.
pub static REGISTRY: once_cell::sync::Lazy<Arc<Registry>> =
    once_cell::sync::Lazy::new(|| Arc::new(Registry::new()));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saga::{action::AwardAssetPayload, Payload, SagaType, Step};
    use uuid::Uuid;

    fn saga_with_one_step(tx: TransactionId) -> Saga {
        Saga::new(
            tx,
            SagaType::QuestReward,
            "test",
            vec![Step::new(
                "s1",
                Payload::AwardAsset(AwardAssetPayload {
                    character_id: 123,
                    template_id: 2000,
                    quantity: 5,
                }),
            )],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let registry = Registry::new();
        let tenant = TenantId::from("t1");
        let tx = Uuid::new_v4();
        registry.put(&tenant, saga_with_one_step(tx)).await.unwrap();
        let fetched = registry.get_by_id(&tenant, tx).await;
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn duplicate_put_is_rejected() {
        let registry = Registry::new();
        let tenant = TenantId::from("t1");
        let tx = Uuid::new_v4();
        registry.put(&tenant, saga_with_one_step(tx)).await.unwrap();
        let err = registry.put(&tenant, saga_with_one_step(tx)).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn different_tenants_are_isolated() {
        let registry = Registry::new();
        let tenant_a = TenantId::from("a");
        let tenant_b = TenantId::from("b");
        let tx = Uuid::new_v4();
        registry.put(&tenant_a, saga_with_one_step(tx)).await.unwrap();
        assert!(registry.get_by_id(&tenant_b, tx).await.is_none());
    }

    #[tokio::test]
    async fn mutate_rolls_back_on_invariant_violation() {
        let registry = Registry::new();
        let tenant = TenantId::from("t1");
        let tx = Uuid::new_v4();
        registry.put(&tenant, saga_with_one_step(tx)).await.unwrap();
        registry
            .mutate(&tenant, tx, |saga| saga.set_step_status(0, crate::saga::StepStatus::Completed))
            .await
            .unwrap();

        // Completed -> Pending is not in the transition table; the mutation must fail
        // and the registry must retain the Completed state from before this call.
        let result = registry
            .mutate(&tenant, tx, |saga| saga.set_step_status(0, crate::saga::StepStatus::Pending))
            .await;
        assert!(result.is_err());

        let saga = registry.get_by_id(&tenant, tx).await.unwrap();
        assert_eq!(saga.steps[0].status, crate::saga::StepStatus::Completed);
    }

    #[tokio::test]
    async fn mutate_on_absent_transaction_is_absent_error() {
        let registry = Registry::new();
        let tenant = TenantId::from("t1");
        let result = registry
            .mutate(&tenant, Uuid::new_v4(), |saga| saga.validate_state_consistency())
            .await;
        assert!(matches!(result, Err(OrchestratorError::Absent { .. })));
    }
}

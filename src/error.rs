//! Error taxonomy: a single `thiserror`-derived enum with `severity()`/`category()`/
//! `is_retryable()` classifiers for logging and metrics.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    #[error("payload for step {step_id} does not match action {action:?}")]
    InvalidPayload {
        step_id: String,
        action: crate::saga::Action,
    },

    #[error("validation failed for step {step_id}: {reason}")]
    ValidationFailure { step_id: String, reason: String },

    #[error("failed to dispatch command for step {step_id}: {reason}")]
    DispatchFailure { step_id: String, reason: String },

    #[error("remote failure reported for step {step_id}: {reason}")]
    RemoteFailure { step_id: String, reason: String },

    #[error("compensation failed for step {step_id}: {reason}")]
    CompensationFailure { step_id: String, reason: String },

    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },

    #[error("transaction {transaction_id} not found for tenant {tenant_id}")]
    Absent {
        tenant_id: String,
        transaction_id: uuid::Uuid,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        }
    }
}

impl OrchestratorError {
    /// Invariant violations and compensation failures are the most serious
    /// (they leave the saga failing with no automatic recovery path); an absent
    /// transaction is the least, being an expected no-op under at-least-once delivery.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OrchestratorError::Absent { .. } => ErrorSeverity::Low,
            OrchestratorError::InvalidPayload { .. }
            | OrchestratorError::ValidationFailure { .. }
            | OrchestratorError::DispatchFailure { .. } => ErrorSeverity::Medium,
            OrchestratorError::RemoteFailure { .. } => ErrorSeverity::High,
            OrchestratorError::CompensationFailure { .. }
            | OrchestratorError::InvariantViolation { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            OrchestratorError::InvalidPayload { .. } => "invalid_payload",
            OrchestratorError::ValidationFailure { .. } => "validation_failure",
            OrchestratorError::DispatchFailure { .. } => "dispatch_failure",
            OrchestratorError::RemoteFailure { .. } => "remote_failure",
            OrchestratorError::CompensationFailure { .. } => "compensation_failure",
            OrchestratorError::InvariantViolation { .. } => "invariant_violation",
            OrchestratorError::Absent { .. } => "absent",
        }
    }

    /// No automatic retry with backoff exists anywhere in this core (explicit
    /// Non-goal); this predicate is exposed purely for caller-side observability.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestratorError::DispatchFailure { .. } | OrchestratorError::RemoteFailure { .. }
        )
    }

    /// Debug-level no-op; never surfaced to a REST caller as a failure.
    pub fn is_absent(&self) -> bool {
        matches!(self, OrchestratorError::Absent { .. })
    }
}

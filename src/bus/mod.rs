//! Command/event bus interface contracts.
//!
//! The core never speaks to a broker directly; it depends on these traits. `memory` is
//! the default, in-process implementation used by tests and by the crate when
//! `kafka-bus` is not enabled. `kafka` is a thin `rdkafka` adapter behind the
//! `kafka-bus` feature.

pub mod memory;
#[cfg(feature = "kafka-bus")]
pub mod kafka;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::saga::{Action, TransactionId};

/// A command emitted by an action handler, addressed to exactly one domain service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub transaction_id: TransactionId,
    pub subject_id: String,
    pub action: Action,
    pub body: serde_json::Value,
}

impl Command {
    pub fn new(transaction_id: TransactionId, subject_id: impl Into<String>, action: Action, body: serde_json::Value) -> Self {
        Self {
            transaction_id,
            subject_id: subject_id.into(),
            action,
            body,
        }
    }

    /// Partition key: the subject id, so messages for the same logical subject
    /// (e.g. characterId) land on the same partition.
    pub fn partition_key(&self) -> &str {
        &self.subject_id
    }
}

/// An inbound status event correlated to a saga by `transaction_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub transaction_id: TransactionId,
    pub event_type: String,
    pub subject_id: String,
    pub body: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(
        transaction_id: TransactionId,
        event_type: impl Into<String>,
        subject_id: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            transaction_id,
            event_type: event_type.into(),
            subject_id: subject_id.into(),
            body,
            timestamp: Utc::now(),
        }
    }
}

/// The terminal status event emitted when a saga exhausts its step list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedEvent {
    pub transaction_id: TransactionId,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish command: {0}")]
    Publish(String),
    #[error("failed to publish completion event: {0}")]
    PublishCompletion(String),
}

/// Command egress, depended on by the Action Dispatch Table and the Completion Emitter.
#[async_trait]
pub trait CommandProducer: Send + Sync {
    async fn send_command(&self, command: Command) -> Result<(), BusError>;
    async fn send_completed(&self, event: CompletedEvent) -> Result<(), BusError>;
}

/// Sink for inbound status events, implemented by the orchestrator's correlator
/// dispatch and handed to an `EventConsumer` at subscribe time.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn handle(&self, event: StatusEvent);
}

/// Event ingress, depended on by the Event Correlators.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    async fn run(&self, sink: std::sync::Arc<dyn EventSink>);
}

pub fn uuid_low_bits_key(id: Uuid) -> String {
    format!("{:016x}", id.as_u128() as u64)
}

//! `rdkafka`-backed bus adapter, gated behind the `kafka-bus` feature.
//!
//! Implements `CommandProducer`/`EventConsumer` against a real broker: same
//! `ClientConfig` settings, header and partition-key conventions as the in-memory
//! adapter's contract, so the Executor and correlators are unaffected by which adapter
//! is wired in.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::message::{Message, OwnedHeaders};
use std::sync::Arc;
use std::time::Duration;

use super::{BusError, Command, CompletedEvent, EventConsumer, EventSink, StatusEvent};

pub struct KafkaTopics;

impl KafkaTopics {
    pub const COMMANDS: &'static str = "saga.commands";
    pub const STATUS: &'static str = "saga.status";
}

#[derive(Debug, Clone)]
pub struct KafkaBusConfig {
    pub brokers: String,
    pub group_id: String,
    pub client_id: String,
}

pub struct KafkaCommandProducer {
    producer: FutureProducer,
}

impl KafkaCommandProducer {
    pub fn new(config: &KafkaBusConfig) -> Result<Self, BusError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .set("idempotence.enable", "true")
            .create()
            .map_err(|e| BusError::Publish(e.to_string()))?;
        Ok(Self { producer })
    }
}

#[async_trait]
impl super::CommandProducer for KafkaCommandProducer {
    async fn send_command(&self, command: Command) -> Result<(), BusError> {
        let payload = serde_json::to_string(&command)
            .map_err(|e| BusError::Publish(format!("serialize command: {e}")))?;
        let key = command.partition_key().to_string();
        let headers = OwnedHeaders::new()
            .insert(rdkafka::message::Header {
                key: "transaction-id",
                value: Some(command.transaction_id.to_string().as_bytes()),
            });
        let record = FutureRecord::to(KafkaTopics::COMMANDS)
            .key(&key)
            .payload(&payload)
            .headers(headers);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map(|_| ())
            .map_err(|(err, _)| BusError::Publish(err.to_string()))
    }

    async fn send_completed(&self, event: CompletedEvent) -> Result<(), BusError> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| BusError::PublishCompletion(format!("serialize event: {e}")))?;
        let key = super::uuid_low_bits_key(event.transaction_id);
        let record = FutureRecord::to(KafkaTopics::STATUS)
            .key(&key)
            .payload(&payload);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map(|_| ())
            .map_err(|(err, _)| BusError::PublishCompletion(err.to_string()))
    }
}

pub struct KafkaStatusEventConsumer {
    consumer: StreamConsumer,
}

impl KafkaStatusEventConsumer {
    pub fn new(config: &KafkaBusConfig) -> Result<Self, BusError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("client.id", &config.client_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| BusError::Publish(e.to_string()))?;
        consumer
            .subscribe(&[KafkaTopics::STATUS])
            .map_err(|e| BusError::Publish(e.to_string()))?;
        Ok(Self { consumer })
    }
}

#[async_trait]
impl EventConsumer for KafkaStatusEventConsumer {
    async fn run(&self, sink: Arc<dyn EventSink>) {
        use futures::StreamExt;

        let mut stream = self.consumer.stream();
        while let Some(message) = stream.next().await {
            let message = match message {
                Ok(m) => m,
                Err(e) => {
                    tracing::error!(error = %e, "kafka consumer error");
                    continue;
                }
            };
            let Some(payload) = message.payload() else {
                continue;
            };
            match serde_json::from_slice::<StatusEvent>(payload) {
                Ok(event) => {
                    sink.handle(event).await;
                    if let Err(e) = self
                        .consumer
                        .commit_message(&message, rdkafka::consumer::CommitMode::Async)
                    {
                        tracing::error!(error = %e, "failed to commit offset");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to decode status event, dropping");
                }
            }
        }
    }
}

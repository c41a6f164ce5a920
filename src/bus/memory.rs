//! In-process bus adapter used by default and by every test in this crate. It satisfies
//! the `CommandProducer`/`EventConsumer` traits with a `tokio::sync::mpsc` channel pair
//! instead of a real broker.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use super::{BusError, Command, CompletedEvent, EventConsumer, EventSink, StatusEvent};

#[derive(Debug, Clone)]
pub enum Published {
    Command(Command),
    Completed(CompletedEvent),
}

/// A producer that records every command/completion it is asked to send, for tests
/// that assert on the commands a scenario emits.
pub struct RecordingProducer {
    sent: Arc<Mutex<Vec<Published>>>,
}

impl RecordingProducer {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn sent(&self) -> Vec<Published> {
        self.sent.lock().await.clone()
    }

    pub async fn commands(&self) -> Vec<Command> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|p| match p {
                Published::Command(c) => Some(c.clone()),
                Published::Completed(_) => None,
            })
            .collect()
    }

    pub async fn completed_count(&self) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|p| matches!(p, Published::Completed(_)))
            .count()
    }
}

impl Default for RecordingProducer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl super::CommandProducer for RecordingProducer {
    async fn send_command(&self, command: Command) -> Result<(), BusError> {
        self.sent.lock().await.push(Published::Command(command));
        Ok(())
    }

    async fn send_completed(&self, event: CompletedEvent) -> Result<(), BusError> {
        self.sent.lock().await.push(Published::Completed(event));
        Ok(())
    }
}

/// An `mpsc`-backed consumer: `inject` is the test/dev-facing way to deliver an event as
/// if it had arrived from the bus; `run` drains the channel and calls the sink, mirroring
/// a real consumer's message loop.
pub struct ChannelEventConsumer {
    receiver: Mutex<mpsc::UnboundedReceiver<StatusEvent>>,
}

#[derive(Clone)]
pub struct ChannelEventInjector {
    sender: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelEventInjector {
    pub fn inject(&self, event: StatusEvent) {
        // An unbounded channel never blocks; a closed receiver only happens after the
        // consumer task has stopped, which only occurs at process shutdown in practice.
        let _ = self.sender.send(event);
    }
}

pub fn channel() -> (ChannelEventInjector, ChannelEventConsumer) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ChannelEventInjector { sender },
        ChannelEventConsumer {
            receiver: Mutex::new(receiver),
        },
    )
}

#[async_trait]
impl EventConsumer for ChannelEventConsumer {
    async fn run(&self, sink: Arc<dyn EventSink>) {
        let mut receiver = self.receiver.lock().await;
        while let Some(event) = receiver.recv().await {
            sink.handle(event).await;
        }
    }
}

//! Saga Orchestrator binary entrypoint.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saga_orchestrator::bus::memory::{channel, RecordingProducer};
use saga_orchestrator::bus::{CommandProducer, EventConsumer};
use saga_orchestrator::correlators::Correlator;
use saga_orchestrator::dispatch::default_dispatch_table;
use saga_orchestrator::http::{create_router, AppState};
use saga_orchestrator::{Executor, OrchestratorConfig, Registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting saga orchestrator");

    let config = OrchestratorConfig::from_env();
    let registry = Arc::new(Registry::new());
    let dispatch_table = default_dispatch_table();

    let (producer, consumer): (Arc<dyn CommandProducer>, Arc<dyn EventConsumer>) =
        build_bus(&config);

    let mut executor = Executor::new(registry, dispatch_table, producer, config.clone());
    executor = attach_mirror(executor).await;
    let executor = Arc::new(executor);

    let correlator = Arc::new(Correlator::new(executor.clone()));
    tokio::spawn(async move {
        consumer.run(correlator).await;
    });

    let app = create_router(AppState {
        executor: executor.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.http_port);
    info!(%addr, "saga orchestrator listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the command/event bus per `kafka-bus`. Without that feature the orchestrator
/// runs against the in-memory bus; nothing external can inject events, so it only
/// serves the REST surface (sagas never progress past their first dispatch).
#[cfg(feature = "kafka-bus")]
fn build_bus(
    config: &OrchestratorConfig,
) -> (
    Arc<dyn CommandProducer>,
    Arc<dyn EventConsumer>,
) {
    use saga_orchestrator::bus::kafka::{KafkaBusConfig, KafkaCommandProducer, KafkaStatusEventConsumer};

    let kafka_config = KafkaBusConfig {
        brokers: config.kafka_brokers.clone(),
        group_id: config.kafka_group_id.clone(),
        client_id: config.kafka_client_id.clone(),
    };
    let producer = KafkaCommandProducer::new(&kafka_config).expect("kafka producer init");
    let consumer = KafkaStatusEventConsumer::new(&kafka_config).expect("kafka consumer init");
    (Arc::new(producer), Arc::new(consumer))
}

#[cfg(not(feature = "kafka-bus"))]
fn build_bus(
    _config: &OrchestratorConfig,
) -> (
    Arc<dyn CommandProducer>,
    Arc<dyn EventConsumer>,
) {
    warn!("kafka-bus feature disabled, running with the in-memory bus: status events must be injected in-process");
    let (_injector, consumer) = channel();
    (Arc::new(RecordingProducer::new()), Arc::new(consumer))
}

/// Connects a Postgres-backed persistence mirror when `database-persistence` is enabled
/// and mirroring is turned on in config; otherwise the executor keeps its default no-op
/// mirror.
#[cfg(feature = "database-persistence")]
async fn attach_mirror(executor: Executor) -> Executor {
    use saga_orchestrator::persistence::database::{DatabaseConfig, DatabaseMirror};

    if !executor.config().enable_persistence_mirror {
        return executor;
    }
    match DatabaseMirror::connect(DatabaseConfig::default()).await {
        Ok(mirror) => executor.with_mirror(Arc::new(mirror)),
        Err(e) => {
            warn!(error = %e, "failed to connect persistence mirror, continuing without it");
            executor
        }
    }
}

#[cfg(not(feature = "database-persistence"))]
async fn attach_mirror(executor: Executor) -> Executor {
    executor
}

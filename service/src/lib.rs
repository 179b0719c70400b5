//! HTTP comment producer and multi-topic consumer.
//!
//! The producer accepts comments on `POST /api/v1/comments` and publishes each
//! one to the topic selected by its type. The consumer reads every partition
//! of its topics and hands records to the per-topic handlers in [`handlers`].

pub mod config;
pub mod handlers;
pub mod http;
mod signal;

use anyhow::Context;
use comments_kafka::{Consumer, Producer, Publisher};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use config::{ConsumerSettings, ProducerSettings};
pub use signal::shutdown_signal;

/// Installs the global tracing subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Serves the comments API until SIGINT/SIGTERM, then flushes the producer.
pub async fn run_producer(settings: ProducerSettings) -> anyhow::Result<()> {
    let producer = Arc::new(
        Producer::new(settings.producer_config()).context("Failed to create Kafka producer")?,
    );
    let router = settings.topic_router();
    info!("Routing comments by type: {}", router);

    let state = http::AppState::new(Arc::clone(&producer) as Arc<dyn Publisher>, router);
    let app = http::router(state);

    let listener = TcpListener::bind(&settings.listen)
        .await
        .with_context(|| format!("Failed to bind {}", settings.listen))?;
    info!("Listening on {}", settings.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Err(e) = producer.flush(Duration::from_secs(5)) {
        warn!("Failed to flush pending messages: {}", e);
    }
    info!("Producer shutdown complete.");
    Ok(())
}

/// Consumes every partition of the configured topics until SIGINT/SIGTERM.
pub async fn run_consumer(settings: ConsumerSettings) -> anyhow::Result<()> {
    let consumer =
        Consumer::new(settings.consumer_config()).context("Failed to create Kafka consumer")?;

    let shutdown = consumer.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.shutdown();
    });

    consumer
        .run(handlers::registry())
        .await
        .context("Consumer failed")?;

    info!("Consumer shutdown complete.");
    Ok(())
}

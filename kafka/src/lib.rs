//! Kafka producer and consumer plumbing for the comments pipeline.
//!
//! This crate builds on `rdkafka` and `tokio`.
//!
//! # Features
//!
//! - Long-lived [`Producer`] behind the [`Publisher`] trait, acknowledged by all
//!   in-sync replicas with client-side retries
//! - Typed `send<T: KafkaMessage>` routed through a `TopicRouter` ([`PublisherExt`])
//! - [`Consumer`] that discovers every partition of its topics and runs one
//!   reader task per partition, starting from the oldest offset
//! - Topic-based routing through a [`HandlerRegistry`], registered with the
//!   `topic_handlers!` macro
//! - Bounded handler concurrency on a fixed worker pool that keeps
//!   per-partition order
//! - Graceful shutdown through [`ShutdownHandle`]
//! - Integrated tracing
//!
//! # Example Producer
//!
//! ```no_run
//! use comments_kafka::{Producer, ProducerConfig, PublisherExt};
//! use comments_messages::{Comment, TopicRouter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let producer = Producer::new(ProducerConfig::new("localhost:29092"))?;
//!     let router = TopicRouter::default();
//!
//!     // Lands on topic1
//!     producer.send(&router, &Comment::new("first!", 1)).await?;
//!     Ok(())
//! }
//! ```

mod consumer;
mod dispatch;
mod error;
mod producer;
mod record;

pub use consumer::{read_partition, Consumer, ConsumerConfig, ShutdownHandle};
pub use dispatch::{
    DispatchConfig, DispatchStats, Dispatcher, HandlerBox, HandlerRegistry, WorkerPool,
};
pub use error::{KafkaError, Result};
pub use producer::{Delivery, Producer, ProducerConfig, Publisher, PublisherExt};
pub use record::Record;

/// Re-export the KafkaMessage trait for convenience
pub use comments_messages::KafkaMessage;

/// Macro to create a [`HandlerRegistry`] mapping topic names to handlers.
///
/// Each handler is an async function taking a [`Record`] and returning
/// `anyhow::Result<()>`.
///
/// # Example
///
/// ```
/// use comments_kafka::{topic_handlers, Record};
///
/// async fn handle_topic1(record: Record) -> anyhow::Result<()> {
///     println!("Handling message for topic1: {}", record.payload_str());
///     Ok(())
/// }
///
/// let handlers = topic_handlers![
///     "topic1" => handle_topic1,
/// ];
/// assert!(handlers.contains_key("topic1"));
/// ```
#[macro_export]
macro_rules! topic_handlers {
    ($($topic:expr => $handler:expr),* $(,)?) => {{
        let mut registry = $crate::HandlerRegistry::new();
        $(
            registry.register($topic, $handler);
        )*
        registry
    }};
}

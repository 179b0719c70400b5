//! Long-lived Kafka producer.

use crate::error::{KafkaError, Result};
use async_trait::async_trait;
use comments_messages::{KafkaMessage, TopicRouter};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer as RdProducer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, error, info};

/// Where the broker stored a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Anything that can publish a raw payload to a topic and wait for the
/// broker's acknowledgement.
///
/// The HTTP layer only sees this trait, so tests can swap in a recording
/// publisher instead of a broker.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `payload` to `topic` and resolves once the broker has
    /// acknowledged it.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<Delivery>;
}

/// Typed publishing on top of any [`Publisher`].
#[async_trait]
pub trait PublisherExt {
    /// Sends a typed message to Kafka.
    ///
    /// The message is serialized to JSON and sent to the topic `router` picks
    /// for it.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Serialization`] if the message cannot be encoded,
    /// or the publisher's error if the broker does not acknowledge it.
    async fn send<T: KafkaMessage>(&self, router: &TopicRouter, message: &T) -> Result<Delivery>;
}

#[async_trait]
impl<P: Publisher + ?Sized> PublisherExt for P {
    async fn send<T: KafkaMessage>(&self, router: &TopicRouter, message: &T) -> Result<Delivery> {
        let payload = message.encode()?;
        self.publish(message.topic(router), &payload).await
    }
}

/// Configuration for the Kafka producer.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Comma-separated list of Kafka brokers.
    pub brokers: String,

    /// How many times the client retries a failed send before giving up.
    pub retries: u32,

    /// Total time a message may spend in the client, retries included.
    pub message_timeout: Duration,
}

impl ProducerConfig {
    /// Creates a producer configuration with acknowledgement from all in-sync
    /// replicas and up to 5 retries.
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            retries: 5,
            message_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the maximum number of send retries.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the message delivery timeout.
    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    /// Builds the rdkafka client configuration for these settings.
    pub fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.brokers)
            .set("acks", "all")
            .set("retries", self.retries.to_string())
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            );
        client_config
    }
}

/// Kafka producer shared by every request for the lifetime of the process.
///
/// Sends are synchronous from the caller's point of view: [`Publisher::publish`]
/// only returns once the message is acknowledged by all in-sync replicas or
/// the client has exhausted its retries.
///
/// # Example
///
/// ```no_run
/// use comments_kafka::{Producer, ProducerConfig, Publisher};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let producer = Producer::new(ProducerConfig::new("localhost:29092"))?;
///     let delivery = producer
///         .publish("topic1", br#"{"text":"hi","type":1}"#)
///         .await?;
///     println!("stored at offset {}", delivery.offset);
///     Ok(())
/// }
/// ```
pub struct Producer {
    inner: FutureProducer,
    config: ProducerConfig,
}

impl Producer {
    /// Creates a new Kafka producer.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created from `config`.
    pub fn new(config: ProducerConfig) -> Result<Self> {
        info!(
            "Creating Kafka producer with brokers: {}, retries: {}",
            config.brokers, config.retries
        );

        let producer: FutureProducer = config.client_config().create()?;

        Ok(Self {
            inner: producer,
            config,
        })
    }

    /// Flushes any pending messages.
    ///
    /// # Errors
    ///
    /// Returns an error if outstanding messages are not delivered within `timeout`.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        info!("Flushing Kafka producer");
        RdProducer::flush(&self.inner, timeout)?;
        Ok(())
    }

    async fn send_record(&self, topic: &str, payload: &[u8]) -> Result<Delivery> {
        debug!(
            "Sending message to topic '{}' ({} bytes)",
            topic,
            payload.len()
        );

        let record = FutureRecord {
            topic,
            partition: None,
            payload: Some(payload),
            key: None::<&[u8]>,
            timestamp: None,
            headers: None,
        };

        match self
            .inner
            .send(record, Timeout::After(self.config.message_timeout))
            .await
        {
            Ok((partition, offset)) => {
                info!(
                    "Message is stored in topic ({})/partition({})/offset({})",
                    topic, partition, offset
                );
                Ok(Delivery { partition, offset })
            }
            Err((kafka_err, _msg)) => {
                error!("Failed to send message to topic '{}': {}", topic, kafka_err);
                Err(KafkaError::Publish {
                    topic: topic.to_string(),
                    reason: kafka_err.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl Publisher for Producer {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<Delivery> {
        self.send_record(topic, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_requires_all_acks() {
        let config = ProducerConfig::new("broker:29092")
            .with_retries(5)
            .with_message_timeout(Duration::from_millis(2500));
        let client = config.client_config();
        assert_eq!(client.get("bootstrap.servers"), Some("broker:29092"));
        assert_eq!(client.get("acks"), Some("all"));
        assert_eq!(client.get("retries"), Some("5"));
        assert_eq!(client.get("message.timeout.ms"), Some("2500"));
    }
}

//! Command line and environment configuration for both services.

use clap::Parser;
use comments_kafka::{ConsumerConfig, ProducerConfig};
use comments_messages::{Route, TopicRouter, DEFAULT_TOPIC, TOPIC1, TOPIC2, TOPIC3};
use std::time::Duration;

/// Settings for the HTTP comment producer.
#[derive(Debug, Clone, Parser)]
#[command(name = "comments-producer", about = "Publishes comments posted over HTTP to Kafka")]
pub struct ProducerSettings {
    /// Comma-separated list of Kafka brokers
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:29092")]
    pub brokers: String,

    /// Address the HTTP server listens on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen: String,

    /// Send retries before a publish fails
    #[arg(long, env = "KAFKA_PRODUCER_RETRIES", default_value_t = 5)]
    pub retries: u32,

    /// Delivery timeout per message, in milliseconds
    #[arg(long, env = "KAFKA_MESSAGE_TIMEOUT_MS", default_value_t = 5000)]
    pub message_timeout_ms: u64,

    /// Comment type to topic routes as TYPE=TOPIC (default 1=topic1,2=topic2,3=topic3)
    #[arg(long = "route", env = "COMMENT_ROUTES", value_delimiter = ',')]
    pub routes: Vec<Route>,

    /// Topic for comment types without a route
    #[arg(long, env = "COMMENT_DEFAULT_TOPIC", default_value = DEFAULT_TOPIC)]
    pub default_topic: String,
}

impl ProducerSettings {
    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig::new(&self.brokers)
            .with_retries(self.retries)
            .with_message_timeout(Duration::from_millis(self.message_timeout_ms))
    }

    pub fn topic_router(&self) -> TopicRouter {
        let routes = if self.routes.is_empty() {
            Route::defaults()
        } else {
            self.routes.clone()
        };
        TopicRouter::from_routes(&self.default_topic, routes)
    }
}

/// Settings for the multi-topic consumer.
#[derive(Debug, Clone, Parser)]
#[command(name = "comments-consumer", about = "Reads every partition of the comment topics")]
pub struct ConsumerSettings {
    /// Comma-separated list of Kafka brokers
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:29092")]
    pub brokers: String,

    /// Consumer group ID
    #[arg(long, env = "KAFKA_GROUP_ID", default_value = "comments-consumer")]
    pub group_id: String,

    /// Topics to consume
    #[arg(
        long = "topic",
        env = "COMMENT_TOPICS",
        value_delimiter = ',',
        default_values = [TOPIC1, TOPIC2, TOPIC3]
    )]
    pub topics: Vec<String>,

    /// Handler workers
    #[arg(long, env = "CONSUMER_WORKERS", default_value_t = 4)]
    pub workers: usize,

    /// Records queued per worker before partition readers wait
    #[arg(long, env = "CONSUMER_QUEUE_CAPACITY", default_value_t = 64)]
    pub queue_capacity: usize,

    /// Timeout for partition metadata at startup, in milliseconds
    #[arg(long, env = "KAFKA_METADATA_TIMEOUT_MS", default_value_t = 10_000)]
    pub metadata_timeout_ms: u64,
}

impl ConsumerSettings {
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig::new(&self.brokers, &self.topics)
            .with_group_id(&self.group_id)
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_metadata_timeout(Duration::from_millis(self.metadata_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_defaults() {
        let settings = ProducerSettings::parse_from(["comments-producer"]);
        assert_eq!(settings.brokers, "localhost:29092");
        assert_eq!(settings.listen, "0.0.0.0:3000");
        assert_eq!(settings.topic_router(), TopicRouter::default());

        let config = settings.producer_config();
        assert_eq!(config.retries, 5);
        assert_eq!(config.message_timeout, Duration::from_secs(5));
    }

    #[test]
    fn producer_custom_routes() {
        let settings = ProducerSettings::parse_from([
            "comments-producer",
            "--route",
            "1=urgent,2=normal",
            "--default-topic",
            "comments",
        ]);
        let router = settings.topic_router();
        assert_eq!(router.topic_for_type(1), "urgent");
        assert_eq!(router.topic_for_type(2), "normal");
        assert_eq!(router.topic_for_type(3), "comments");
    }

    #[test]
    fn producer_rejects_bad_route() {
        assert!(ProducerSettings::try_parse_from(["comments-producer", "--route", "x=y"]).is_err());
    }

    #[test]
    fn consumer_defaults() {
        let settings = ConsumerSettings::parse_from(["comments-consumer"]);
        let config = settings.consumer_config();
        assert_eq!(config.topics, vec!["topic1", "topic2", "topic3"]);
        assert_eq!(config.group_id, "comments-consumer");
        assert_eq!(config.dispatch.workers, 4);
        assert_eq!(config.dispatch.queue_capacity, 64);
    }

    #[test]
    fn consumer_single_topic() {
        let settings =
            ConsumerSettings::parse_from(["comments-consumer", "--topic", "comments", "--workers", "1"]);
        let config = settings.consumer_config();
        assert_eq!(config.topics, vec!["comments"]);
        assert_eq!(config.dispatch.workers, 1);
    }
}

//! Message types shared by the comments producer and consumer.
//!
//! This crate provides the [`Comment`] payload, the [`TopicRouter`] that maps a
//! comment type to its Kafka topic, and the [`KafkaMessage`] trait tying the
//! two together.

mod comment;
mod topic;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use comment::Comment;
pub use topic::{Route, RouteParseError, TopicRouter, DEFAULT_TOPIC, TOPIC1, TOPIC2, TOPIC3};

/// Trait for types that can be sent as Kafka messages.
///
/// Implementors pick their destination topic from a [`TopicRouter`], so the
/// same message type can land on different topics depending on its contents.
/// Messages travel as JSON.
///
/// # Example
///
/// ```
/// use comments_messages::{KafkaMessage, TopicRouter};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Audit {
///     entry: String,
/// }
///
/// impl KafkaMessage for Audit {
///     fn topic<'r>(&self, router: &'r TopicRouter) -> &'r str {
///         router.default_topic()
///     }
/// }
///
/// let router = TopicRouter::default();
/// let audit = Audit { entry: "login".into() };
/// assert_eq!(audit.topic(&router), "defaultTopic");
/// assert_eq!(audit.encode().unwrap(), br#"{"entry":"login"}"#);
/// ```
pub trait KafkaMessage: Serialize + DeserializeOwned + Send + Sync {
    /// The Kafka topic this message should be sent to.
    fn topic<'r>(&self, router: &'r TopicRouter) -> &'r str;

    /// Encodes the message as a JSON payload.
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes a message from a JSON payload.
    fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

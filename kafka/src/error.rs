//! Error types for the comments Kafka library.

use thiserror::Error;

/// Result type alias for Kafka operations.
pub type Result<T> = std::result::Result<T, KafkaError>;

/// Errors that can occur during Kafka operations.
#[derive(Error, Debug)]
pub enum KafkaError {
    /// Error from the underlying rdkafka library.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Error serializing a message to JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker did not accept a message.
    #[error("Failed to publish to topic '{topic}': {reason}")]
    Publish { topic: String, reason: String },

    /// Partition metadata for a topic could not be obtained.
    #[error("Failed to enumerate partitions of topic '{topic}': {reason}")]
    Metadata { topic: String, reason: String },

    /// Error from a message handler.
    #[error("Handler error: {0}")]
    Handler(String),

    /// Error during consumer shutdown.
    #[error("Shutdown error: {0}")]
    Shutdown(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

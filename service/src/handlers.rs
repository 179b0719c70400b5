//! Per-topic comment handlers.
//!
//! These only log what they receive; business logic for each topic goes here.

use comments_kafka::{topic_handlers, HandlerRegistry, Record};
use comments_messages::{TOPIC1, TOPIC2, TOPIC3};
use tracing::info;

pub async fn handle_topic1(record: Record) -> anyhow::Result<()> {
    info!("Handling message for topic1: {}", record.payload_str());
    Ok(())
}

pub async fn handle_topic2(record: Record) -> anyhow::Result<()> {
    info!("Handling message for topic2: {}", record.payload_str());
    Ok(())
}

pub async fn handle_topic3(record: Record) -> anyhow::Result<()> {
    info!("Handling message for topic3: {}", record.payload_str());
    Ok(())
}

/// Handlers for `topic1`, `topic2` and `topic3`. Records from any other topic
/// are logged and dropped by the dispatcher.
pub fn registry() -> HandlerRegistry {
    topic_handlers![
        TOPIC1 => handle_topic1,
        TOPIC2 => handle_topic2,
        TOPIC3 => handle_topic3,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(topic: &str, payload: &[u8]) -> Record {
        Record {
            topic: topic.to_string(),
            partition: 0,
            offset: 7,
            key: None,
            payload: Some(payload.to_vec()),
        }
    }

    #[tokio::test]
    async fn registry_covers_numbered_topics() {
        let handlers = registry();
        assert_eq!(handlers.len(), 3);
        assert!(handlers.contains_key("topic1"));
        assert!(handlers.contains_key("topic2"));
        assert!(handlers.contains_key("topic3"));
        assert!(!handlers.contains_key("defaultTopic"));

        let handler = handlers.get("topic2").unwrap();
        assert!(handler(record("topic2", br#"{"text":"hi","type":2}"#))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn handlers_log_any_payload() {
        let handlers = registry();
        let handler = handlers.get("topic1").unwrap();
        assert!(handler(record("topic1", b"not json at all")).await.is_ok());

        let mut empty = record("topic3", b"");
        empty.payload = None;
        assert!(handlers.get("topic3").unwrap()(empty).await.is_ok());
    }
}

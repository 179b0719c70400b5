use serde::{Deserialize, Deserializer, Serialize};

use crate::{KafkaMessage, TopicRouter};

/// A user comment submitted over HTTP and published to Kafka.
///
/// Missing or `null` fields decode to their zero values, so `{}` and `null`
/// are both a comment with empty text and type `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Comment {
    pub fn new(text: impl Into<String>, kind: i64) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

impl KafkaMessage for Comment {
    fn topic<'r>(&self, router: &'r TopicRouter) -> &'r str {
        router.topic_for_type(self.kind)
    }

    fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(serde_json::from_slice::<Option<Self>>(payload)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_text_then_type() {
        let comment = Comment::new("hello", 1);
        assert_eq!(comment.encode().unwrap(), br#"{"text":"hello","type":1}"#);
    }

    #[test]
    fn missing_fields_default() {
        let comment = Comment::decode(b"{}").unwrap();
        assert_eq!(comment, Comment::new("", 0));

        let comment = Comment::decode(br#"{"text":"only text"}"#).unwrap();
        assert_eq!(comment.kind, 0);
    }

    #[test]
    fn null_decodes_to_zero_values() {
        assert_eq!(Comment::decode(b"null").unwrap(), Comment::default());
        assert_eq!(
            Comment::decode(br#"{"text":null,"type":null}"#).unwrap(),
            Comment::default()
        );
        assert_eq!(
            Comment::decode(br#"{"text":null,"type":2}"#).unwrap(),
            Comment::new("", 2)
        );
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        assert!(Comment::decode(br#"{"text":"x","type":"one"}"#).is_err());
        assert!(Comment::decode(br#"{"text":5,"type":1}"#).is_err());
    }
}

//! Comment type to topic routing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const TOPIC1: &str = "topic1";
pub const TOPIC2: &str = "topic2";
pub const TOPIC3: &str = "topic3";
pub const DEFAULT_TOPIC: &str = "defaultTopic";

/// Error parsing a `TYPE=TOPIC` route.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteParseError {
    #[error("route '{0}' is not of the form TYPE=TOPIC")]
    Malformed(String),

    #[error("route '{0}' has a non-integer type")]
    InvalidType(String),

    #[error("route '{0}' has an empty topic")]
    EmptyTopic(String),
}

/// Static, total mapping from a comment type code to a topic name.
///
/// Every type code maps to exactly one topic: codes without an explicit route
/// fall through to the default topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRouter {
    routes: BTreeMap<i64, String>,
    default_topic: String,
}

impl Default for TopicRouter {
    /// `1 → topic1`, `2 → topic2`, `3 → topic3`, anything else → `defaultTopic`.
    fn default() -> Self {
        Self::from_routes(DEFAULT_TOPIC, Route::defaults())
    }
}

impl TopicRouter {
    /// Creates a router with no explicit routes.
    pub fn new(default_topic: impl Into<String>) -> Self {
        Self {
            routes: BTreeMap::new(),
            default_topic: default_topic.into(),
        }
    }

    /// Routes `kind` to `topic`, replacing any earlier route for it.
    pub fn with_route(mut self, kind: i64, topic: impl Into<String>) -> Self {
        self.routes.insert(kind, topic.into());
        self
    }

    /// Returns the topic a comment of type `kind` is published to.
    pub fn topic_for_type(&self, kind: i64) -> &str {
        self.routes
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(&self.default_topic)
    }

    pub fn default_topic(&self) -> &str {
        &self.default_topic
    }

    /// All topics this router can produce, explicit routes first, deduplicated.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::with_capacity(self.routes.len() + 1);
        for topic in self
            .routes
            .values()
            .map(String::as_str)
            .chain(std::iter::once(self.default_topic.as_str()))
        {
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
        topics
    }
}

impl fmt::Display for TopicRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, topic) in &self.routes {
            write!(f, "{kind}={topic},")?;
        }
        write!(f, "*={}", self.default_topic)
    }
}

/// A single `TYPE=TOPIC` route, as accepted on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub kind: i64,
    pub topic: String,
}

impl Route {
    pub fn new(kind: i64, topic: impl Into<String>) -> Self {
        Self {
            kind,
            topic: topic.into(),
        }
    }

    /// `1=topic1`, `2=topic2`, `3=topic3`.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(1, TOPIC1),
            Self::new(2, TOPIC2),
            Self::new(3, TOPIC3),
        ]
    }
}

impl FromStr for Route {
    type Err = RouteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, topic) = s
            .split_once('=')
            .ok_or_else(|| RouteParseError::Malformed(s.to_string()))?;
        let kind = kind
            .trim()
            .parse()
            .map_err(|_| RouteParseError::InvalidType(s.to_string()))?;
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(RouteParseError::EmptyTopic(s.to_string()));
        }
        Ok(Self::new(kind, topic))
    }
}

impl TopicRouter {
    /// Builds a router from parsed routes. Later routes for the same type win.
    pub fn from_routes(
        default_topic: impl Into<String>,
        routes: impl IntoIterator<Item = Route>,
    ) -> Self {
        routes.into_iter().fold(Self::new(default_topic), |router, route| {
            router.with_route(route.kind, route.topic)
        })
    }
}

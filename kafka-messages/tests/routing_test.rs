//! Tests for comment type to topic routing.

use comments_messages::{
    Comment, KafkaMessage, Route, RouteParseError, TopicRouter, DEFAULT_TOPIC,
};

#[test]
fn test_known_types_map_to_fixed_topics() {
    let router = TopicRouter::default();
    assert_eq!(router.topic_for_type(1), "topic1");
    assert_eq!(router.topic_for_type(2), "topic2");
    assert_eq!(router.topic_for_type(3), "topic3");
}

#[test]
fn test_other_types_map_to_default_topic() {
    let router = TopicRouter::default();
    for kind in [0, 4, -1, 42, i64::MIN, i64::MAX] {
        assert_eq!(router.topic_for_type(kind), DEFAULT_TOPIC, "type {kind}");
    }
}

#[test]
fn test_comment_topic_follows_router() {
    let router = TopicRouter::default();
    assert_eq!(Comment::new("a", 2).topic(&router), "topic2");
    assert_eq!(Comment::new("b", 9).topic(&router), "defaultTopic");

    let custom = TopicRouter::new("misc").with_route(9, "nines");
    assert_eq!(Comment::new("b", 9).topic(&custom), "nines");
    assert_eq!(Comment::new("a", 2).topic(&custom), "misc");
}

#[test]
fn test_router_topics_are_deduplicated() {
    let router = TopicRouter::new("comments")
        .with_route(1, "comments")
        .with_route(2, "urgent");
    assert_eq!(router.topics(), vec!["comments", "urgent"]);

    assert_eq!(
        TopicRouter::default().topics(),
        vec!["topic1", "topic2", "topic3", "defaultTopic"]
    );
}

#[test]
fn test_route_parsing() {
    let route: Route = "7 = seven".parse().unwrap();
    assert_eq!(route.kind, 7);
    assert_eq!(route.topic, "seven");

    assert_eq!(
        "nope".parse::<Route>(),
        Err(RouteParseError::Malformed("nope".into()))
    );
    assert_eq!(
        "x=topic".parse::<Route>(),
        Err(RouteParseError::InvalidType("x=topic".into()))
    );
    assert_eq!(
        "1=".parse::<Route>(),
        Err(RouteParseError::EmptyTopic("1=".into()))
    );
}

#[test]
fn test_router_from_routes_last_wins() {
    let routes = ["1=first", "1=second", "2=two"]
        .iter()
        .map(|r| r.parse::<Route>().unwrap());
    let router = TopicRouter::from_routes("fallback", routes);
    assert_eq!(router.topic_for_type(1), "second");
    assert_eq!(router.topic_for_type(2), "two");
    assert_eq!(router.topic_for_type(3), "fallback");
    assert_eq!(router.to_string(), "1=second,2=two,*=fallback");
}

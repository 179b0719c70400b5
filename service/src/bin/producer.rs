//! HTTP server publishing comments to Kafka.
//!
//! ```bash
//! KAFKA_BROKERS=localhost:29092 cargo run --bin comments-producer
//! curl -X POST localhost:3000/api/v1/comments \
//!     -H 'Content-Type: application/json' -d '{"text":"hello","type":1}'
//! ```

use clap::Parser;
use comments_service::{init_tracing, run_producer, ProducerSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    run_producer(ProducerSettings::parse()).await
}

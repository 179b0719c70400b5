//! Consumer reading every partition of the comment topics.
//!
//! ```bash
//! KAFKA_BROKERS=localhost:29092 cargo run --bin comments-consumer
//! ```
//!
//! Press Ctrl+C to stop.

use clap::Parser;
use comments_service::{init_tracing, run_consumer, ConsumerSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    run_consumer(ConsumerSettings::parse()).await
}

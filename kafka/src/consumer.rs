//! Kafka consumer reading every partition of a set of topics concurrently.

use crate::dispatch::{DispatchConfig, Dispatcher, HandlerRegistry};
use crate::error::{KafkaError, Result};
use crate::record::Record;
use futures::{Stream, StreamExt};
use rdkafka::consumer::{Consumer as RdConsumer, StreamConsumer};
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Configuration for the Kafka consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Comma-separated list of Kafka brokers.
    pub brokers: String,

    /// Consumer group ID. Offsets are never committed, the group only
    /// identifies the client to the broker.
    pub group_id: String,

    /// Topics whose partitions are all read.
    pub topics: Vec<String>,

    /// How long to wait for partition metadata at startup.
    pub metadata_timeout: Duration,

    /// Sizing of the handler worker pool.
    pub dispatch: DispatchConfig,
}

impl ConsumerConfig {
    /// Creates a new consumer configuration.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Comma-separated list of Kafka brokers
    /// * `topics` - Topics to read
    pub fn new<I, S>(brokers: impl Into<String>, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            brokers: brokers.into(),
            group_id: "comments-consumer".to_string(),
            topics: topics.into_iter().map(Into::into).collect(),
            metadata_timeout: Duration::from_secs(10),
            dispatch: DispatchConfig::default(),
        }
    }

    /// Sets the consumer group ID.
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    /// Sets the metadata timeout.
    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Sets the number of handler workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.dispatch.workers = workers;
        self
    }

    /// Sets how many records may wait per worker before readers block.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.dispatch.queue_capacity = capacity;
        self
    }

    /// Builds the rdkafka client configuration for these settings.
    ///
    /// Reading always starts from the oldest retained offset and nothing is
    /// committed back, so a restart re-reads every partition from the start.
    pub fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false");
        client_config
    }
}

/// Kafka consumer that fans out one reader task per topic partition.
///
/// Every reader waits on three events: a broker error (logged, reading
/// continues), a message (logged and handed to the [`Dispatcher`]), or
/// shutdown. The underlying client is shared by all readers.
///
/// # Example
///
/// ```no_run
/// use comments_kafka::{topic_handlers, Consumer, ConsumerConfig, Record};
///
/// async fn handle_topic1(record: Record) -> anyhow::Result<()> {
///     println!("topic1: {}", record.payload_str());
///     Ok(())
/// }
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ConsumerConfig::new("localhost:29092", ["topic1"]);
/// let consumer = Consumer::new(config)?;
/// let handlers = topic_handlers![
///     "topic1" => handle_topic1,
/// ];
/// consumer.run(handlers).await?;
/// # Ok(())
/// # }
/// ```
pub struct Consumer {
    inner: Arc<StreamConsumer>,
    config: ConsumerConfig,
    shutdown: CancellationToken,
}

impl Consumer {
    /// Creates the Kafka client shared by all partition readers.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(config: ConsumerConfig) -> Result<Self> {
        info!(
            "Creating Kafka consumer with brokers: {}, group: {}",
            config.brokers, config.group_id
        );

        if config.topics.is_empty() {
            return Err(KafkaError::Other("no topics configured".to_string()));
        }

        let consumer: StreamConsumer = config.client_config().create()?;

        Ok(Self {
            inner: Arc::new(consumer),
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Returns the partition ids of `topic`, as reported by the broker.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Metadata`] if the broker cannot be reached, reports
    /// an error for the topic, or the topic has no partitions.
    pub async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        let consumer = Arc::clone(&self.inner);
        let name = topic.to_string();
        let timeout = self.config.metadata_timeout;

        let metadata = tokio::task::spawn_blocking(move || {
            consumer.fetch_metadata(Some(name.as_str()), timeout)
        })
        .await
        .map_err(|e| KafkaError::Other(format!("metadata task failed: {e}")))?
        .map_err(|e| KafkaError::Metadata {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;

        let meta_topic = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .ok_or_else(|| KafkaError::Metadata {
                topic: topic.to_string(),
                reason: "topic missing from metadata".to_string(),
            })?;

        if let Some(err) = meta_topic.error() {
            return Err(KafkaError::Metadata {
                topic: topic.to_string(),
                reason: format!("{err:?}"),
            });
        }

        let partitions: Vec<i32> = meta_topic.partitions().iter().map(|p| p.id()).collect();
        if partitions.is_empty() {
            return Err(KafkaError::Metadata {
                topic: topic.to_string(),
                reason: "topic has no partitions".to_string(),
            });
        }

        debug!("Topic '{}' has partitions {:?}", topic, partitions);
        Ok(partitions)
    }

    /// Reads every partition of every configured topic until shutdown.
    ///
    /// Returns once all partition readers have stopped and every record they
    /// handed over has been processed by its handler.
    ///
    /// # Errors
    ///
    /// Returns an error if partitions cannot be enumerated or assigned.
    /// Errors reported while reading are logged and do not stop consumption.
    pub async fn run(&self, handlers: HandlerRegistry) -> Result<()> {
        let mut assignment = TopicPartitionList::new();
        let mut targets = Vec::new();
        for topic in &self.config.topics {
            if !handlers.contains_key(topic) {
                warn!("No handler registered for topic '{}'", topic);
            }
            for partition in self.partitions(topic).await? {
                assignment.add_partition_offset(topic, partition, Offset::Beginning)?;
                targets.push((topic.clone(), partition));
            }
        }

        info!(
            "Assigning {} partitions across topics {:?}",
            targets.len(),
            self.config.topics
        );
        self.inner.assign(&assignment)?;

        let mut queues = Vec::with_capacity(targets.len());
        for (topic, partition) in targets {
            let queue = self
                .inner
                .split_partition_queue(&topic, partition)
                .ok_or_else(|| {
                    KafkaError::Other(format!(
                        "cannot split queue for topic {topic} partition {partition}"
                    ))
                })?;
            queues.push((topic, partition, queue));
        }

        let (dispatcher, workers) = Dispatcher::spawn(handlers, self.config.dispatch);

        let mut readers = JoinSet::new();
        for (topic, partition, queue) in queues {
            let dispatcher = dispatcher.clone();
            let shutdown = self.shutdown.clone();
            readers.spawn(async move {
                let messages = queue.stream().map(|message| -> Result<Record> {
                    Ok(Record::from_message(&message?))
                });
                let messages = pin!(messages);
                read_partition(&topic, partition, messages, dispatcher, shutdown).await;
            });
        }

        let driver = tokio::spawn(poll_main_queue(
            Arc::clone(&self.inner),
            dispatcher,
            self.shutdown.clone(),
        ));

        while let Some(result) = readers.join_next().await {
            if let Err(e) = result {
                error!("Partition reader panicked: {}", e);
            }
        }
        if let Err(e) = driver.await {
            error!("Main queue task panicked: {}", e);
        }

        workers.join().await;
        info!("Consumer stopped");
        Ok(())
    }

    /// Requests a graceful shutdown of the consumer.
    pub fn shutdown(&self) {
        info!("Requesting consumer shutdown");
        self.shutdown.cancel();
    }

    /// Returns a shutdown handle that can be used to signal shutdown from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Handle for requesting consumer shutdown from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: CancellationToken,
}

impl ShutdownHandle {
    /// Requests a graceful shutdown of the consumer.
    pub fn shutdown(&self) {
        info!("Requesting consumer shutdown via handle");
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Reads one partition until shutdown or the end of `messages`.
///
/// Errors from the stream are logged and reading continues. Shutdown is
/// observed whenever the reader waits for the next event, so a record is
/// never abandoned between being read and being handed to `dispatcher`.
pub async fn read_partition<S>(
    topic: &str,
    partition: i32,
    messages: S,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) where
    S: Stream<Item = Result<Record>> + Unpin,
{
    info!("Started consuming topic {} partition {}", topic, partition);
    let source = format!("topic {topic} partition {partition}");
    forward_records(&source, messages, dispatcher, shutdown).await;
    info!("Stopped consuming topic {} partition {}", topic, partition);
}

/// Keeps the consumer's main queue polled so client events are served while
/// partition queues are split off. Messages that reach it before their
/// partition queue was split are dispatched like any other.
async fn poll_main_queue(
    consumer: Arc<StreamConsumer>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) {
    let messages = consumer.stream().map(|message| -> Result<Record> {
        Ok(Record::from_message(&message?))
    });
    let messages = pin!(messages);
    forward_records("main queue", messages, dispatcher, shutdown).await;
}

async fn forward_records<S>(
    source: &str,
    mut messages: S,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) where
    S: Stream<Item = Result<Record>> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("Shutdown signal received for {}", source);
                break;
            }
            next = messages.next() => match next {
                Some(Ok(record)) => {
                    info!(
                        "Received message | Topic: {} | Partition: {} | Offset: {} | Message: {}",
                        record.topic,
                        record.partition,
                        record.offset,
                        record.payload_str()
                    );
                    if let Err(e) = dispatcher.dispatch(record).await {
                        error!("Stopping reader for {}: {}", source, e);
                        break;
                    }
                }
                Some(Err(e)) => {
                    error!("Error on {}: {}", source, e);
                }
                None => {
                    debug!("Stream ended for {}", source);
                    break;
                }
            }
        }
    }
}

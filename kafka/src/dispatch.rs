//! Topic-based dispatch of consumed records onto a fixed worker pool.

use crate::error::{KafkaError, Result};
use crate::record::Record;
use comments_messages::KafkaMessage;
use futures::FutureExt;
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Type alias for message handlers.
///
/// Handlers are async functions that take an owned record and return a Result.
pub type HandlerBox =
    Box<dyn Fn(Record) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Lookup table from topic name to its handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerBox>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every record read from `topic`.
    ///
    /// A second registration for the same topic replaces the first.
    pub fn register<F, Fut>(
        &mut self,
        topic: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.handlers.insert(
            topic.into(),
            Box::new(move |record: Record| {
                let fut = handler(record);
                Box::pin(async move {
                    fut.await
                        .map_err(|e| KafkaError::Handler(format!("{e:#}")))
                }) as Pin<Box<dyn Future<Output = Result<()>> + Send>>
            }),
        );
        self
    }

    /// Registers a handler that receives the record payload decoded as `T`.
    ///
    /// Records without a payload, or whose payload is not valid JSON for `T`,
    /// fail with [`KafkaError::Handler`] without reaching `handler`.
    pub fn register_json<T, F, Fut>(
        &mut self,
        topic: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        T: KafkaMessage + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.register(topic, move |record: Record| {
            let handler = Arc::clone(&handler);
            async move {
                let payload = record.payload.as_deref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "record {}/{}/{} has no payload",
                        record.topic,
                        record.partition,
                        record.offset
                    )
                })?;
                let message = T::decode(payload)?;
                handler(message).await
            }
        })
    }

    /// Builder form of [`HandlerRegistry::register_json`].
    pub fn with_json<T, F, Fut>(mut self, topic: impl Into<String>, handler: F) -> Self
    where
        T: KafkaMessage + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_json(topic, handler);
        self
    }

    pub fn get(&self, topic: &str) -> Option<&HandlerBox> {
        self.handlers.get(topic)
    }

    pub fn contains_key(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Counters shared by every reader and worker.
#[derive(Debug, Default)]
pub struct DispatchStats {
    received: AtomicU64,
    handled: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    /// Records accepted by [`Dispatcher::dispatch`], dropped ones included.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Records whose handler returned `Ok`.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Records whose handler returned an error.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Records for topics with no registered handler.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Sizing of the handler worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Number of worker tasks running handlers.
    pub workers: usize,

    /// Records each worker may have queued before readers wait.
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
        }
    }
}

/// Routes records to their topic handler on a fixed set of workers.
///
/// Records of one partition always go to the same worker, so handlers see
/// them in partition order. A handler that panics is counted as failed; its
/// worker keeps running. Handler concurrency is bounded by the number of
/// workers, and a full worker queue makes [`Dispatcher::dispatch`] wait.
///
/// Cloning is cheap; workers exit once every clone has been dropped and their
/// queues are drained.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    queues: Arc<[mpsc::Sender<Record>]>,
    stats: Arc<DispatchStats>,
}

/// Join handles of the workers spawned by [`Dispatcher::spawn`].
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawns the worker pool and returns the dispatcher feeding it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(registry: HandlerRegistry, config: DispatchConfig) -> (Self, WorkerPool) {
        let registry = Arc::new(registry);
        let stats = Arc::new(DispatchStats::default());
        let workers = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);

        let mut queues = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let (tx, rx) = mpsc::channel(capacity);
            queues.push(tx);
            handles.push(tokio::spawn(run_worker(
                id,
                rx,
                Arc::clone(&registry),
                Arc::clone(&stats),
            )));
        }

        info!(
            "Started {} dispatch workers (queue capacity {})",
            workers, capacity
        );

        let dispatcher = Self {
            registry,
            queues: queues.into(),
            stats,
        };
        (dispatcher, WorkerPool { workers: handles })
    }

    /// Hands `record` to the worker owning its partition.
    ///
    /// Records for topics without a handler are logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Shutdown`] if the worker has already exited.
    pub async fn dispatch(&self, record: Record) -> Result<()> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        if !self.registry.contains_key(&record.topic) {
            warn!("Unknown topic: {}", record.topic);
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let worker = self.worker_for(&record.topic, record.partition);
        self.queues[worker]
            .send(record)
            .await
            .map_err(|_| KafkaError::Shutdown(format!("dispatch worker {worker} has exited")))
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    fn worker_for(&self, topic: &str, partition: i32) -> usize {
        let mut hasher = DefaultHasher::new();
        topic.hash(&mut hasher);
        partition.hash(&mut hasher);
        (hasher.finish() % self.queues.len() as u64) as usize
    }
}

impl WorkerPool {
    /// Waits for every worker to drain its queue and exit.
    ///
    /// Workers only exit after all [`Dispatcher`] clones are dropped.
    pub async fn join(self) {
        for (id, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!("Dispatch worker {} panicked: {}", id, e);
            }
        }
        debug!("All dispatch workers stopped");
    }
}

async fn run_worker(
    id: usize,
    mut rx: mpsc::Receiver<Record>,
    registry: Arc<HandlerRegistry>,
    stats: Arc<DispatchStats>,
) {
    while let Some(record) = rx.recv().await {
        let Some(handler) = registry.get(&record.topic) else {
            continue;
        };

        let topic = record.topic.clone();
        let (partition, offset) = (record.partition, record.offset);
        let outcome = AssertUnwindSafe(async move { handler(record).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => {
                stats.handled.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Failed to process message from topic '{}' (partition: {}, offset: {}): {}",
                    topic, partition, offset, e
                );
            }
            Err(panic) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Handler panicked on message from topic '{}' (partition: {}, offset: {}): {}",
                    topic,
                    partition,
                    offset,
                    panic_message(panic.as_ref())
                );
            }
        }
    }
    debug!("Dispatch worker {} stopped", id);
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

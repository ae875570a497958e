//! Substrate wiring and worker lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `logsift-daemon`.
//! It builds the substrate (in-memory by default), creates the
//! notification channels, spawns the ingest/processing/monitor workers,
//! and manages startup/shutdown ordering.
//!
//! # Data Flow
//!
//! ```text
//! raw-store put --ObjectEvent--> key filter --> IngestNotifier --> task queue
//! task queue --> ProcessingWorker pool --> summary put / dead-letter
//! summary put --ObjectEvent--> MonitorWorker --> alert channel
//! ```
//!
//! # Shutdown
//!
//! A broadcast channel signals all worker loops; `stop` waits for each
//! loop to finish its current task before returning. Producers are
//! started before consumers and stopped in the same order so that
//! consumers can drain in-flight work.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use metrics::counter;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use logsift_core::config::LogsiftConfig;
use logsift_core::message::ObjectEvent;
use logsift_core::metrics as m;
use logsift_core::substrate::TaskQueue;
use logsift_pipeline::{IngestNotifier, MonitorWorker, PipelineConfig, ProcessingWorker};
use logsift_substrate::{
    MemoryAlertPublisher, MemoryObjectStore, MemoryTaskQueue, RecordingMetricsSink,
};

/// Channel capacity for object-created notifications.
const OBJECT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum messages fetched from the task queue per poll.
const RECEIVE_BATCH_SIZE: usize = 10;

/// The main daemon orchestrator.
///
/// Owns the substrate handles and the spawned worker tasks. The default
/// wiring runs on the in-memory substrate; a deployment against a real
/// object store / queue / pub-sub replaces the construction here while
/// the workers stay unchanged.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LogsiftConfig,
    /// Shared object store (raw and processed buckets).
    store: Arc<MemoryObjectStore>,
    /// Processing task queue.
    task_queue: Arc<MemoryTaskQueue>,
    /// Dead-letter channel for failed processing tasks.
    dead_letters: Arc<MemoryTaskQueue>,
    /// Alert notification channel.
    publisher: Arc<MemoryAlertPublisher>,
    /// Business metrics sink.
    metrics_sink: Arc<RecordingMetricsSink>,
    /// Object-created notifications from the raw bucket.
    raw_events: Option<mpsc::Receiver<ObjectEvent>>,
    /// Summary-created notifications from the processed bucket.
    summary_events: Option<mpsc::Receiver<ObjectEvent>>,
    /// Shutdown broadcast sender (signals all worker loops).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
    /// Spawned worker task handles.
    tasks: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    /// Build the orchestrator from an already-loaded configuration.
    pub fn build_from_config(config: LogsiftConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        tracing::debug!("building in-memory substrate");

        let store = Arc::new(MemoryObjectStore::new());
        let task_queue = Arc::new(
            MemoryTaskQueue::new(
                config.queue.visibility_timeout_secs,
                config.queue.max_receive_count,
            )
            .with_capacity(config.queue.capacity),
        );
        // The dead-letter channel is an inspection sink; no capacity cap.
        let dead_letters = Arc::new(MemoryTaskQueue::new(
            config.queue.visibility_timeout_secs,
            config.queue.max_receive_count,
        ));
        let publisher = Arc::new(MemoryAlertPublisher::new());
        let metrics_sink = Arc::new(RecordingMetricsSink::new());

        let (raw_tx, raw_rx) = mpsc::channel(OBJECT_EVENT_CHANNEL_CAPACITY);
        store.watch_bucket(config.ingest.raw_bucket.clone(), raw_tx);

        let (summary_tx, summary_rx) = mpsc::channel(OBJECT_EVENT_CHANNEL_CAPACITY);
        store.watch_bucket(config.processing.processed_bucket.clone(), summary_tx);

        let (shutdown_tx, _) = broadcast::channel(16);

        Ok(Self {
            config,
            store,
            task_queue,
            dead_letters,
            publisher,
            metrics_sink,
            raw_events: Some(raw_rx),
            summary_events: Some(summary_rx),
            shutdown_tx,
            start_time: Instant::now(),
            tasks: Vec::new(),
        })
    }

    /// Spawn all worker loops.
    ///
    /// Producers are spawned before consumers: ingest first, then the
    /// processing worker pool, then the monitor.
    pub fn start(&mut self) -> Result<()> {
        if !self.tasks.is_empty() {
            return Err(anyhow::anyhow!("orchestrator already started"));
        }

        let pipeline_config = PipelineConfig::from_core(&self.config);

        // Ingest: raw-bucket notifications -> key filter -> task queue
        let raw_rx = self
            .raw_events
            .take()
            .ok_or_else(|| anyhow::anyhow!("raw event channel already consumed"))?;
        let notifier = IngestNotifier::new(self.store.clone(), self.task_queue.clone());
        self.tasks.push(spawn_ingest_loop(
            notifier,
            raw_rx,
            self.config.ingest.key_prefix.clone(),
            self.config.ingest.key_suffix.clone(),
            self.shutdown_tx.subscribe(),
        ));

        // Processing worker pool
        let worker = Arc::new(ProcessingWorker::new(
            self.store.clone(),
            self.task_queue.clone(),
            self.dead_letters.clone(),
            self.metrics_sink.clone(),
            &pipeline_config,
        ));
        let poll_interval = Duration::from_millis(self.config.processing.poll_interval_ms);
        for worker_id in 0..self.config.processing.worker_concurrency {
            self.tasks.push(spawn_processing_loop(
                worker_id,
                worker.clone(),
                self.task_queue.clone(),
                poll_interval,
                self.shutdown_tx.subscribe(),
            ));
        }

        // Monitor: summary-bucket notifications -> alert channel
        let summary_rx = self
            .summary_events
            .take()
            .ok_or_else(|| anyhow::anyhow!("summary event channel already consumed"))?;
        let monitor = MonitorWorker::new(self.store.clone(), self.publisher.clone(), &pipeline_config);
        self.tasks
            .push(spawn_monitor_loop(monitor, summary_rx, self.shutdown_tx.subscribe()));

        // Uptime updater (metrics endpoint only)
        if self.config.metrics.enabled {
            self.tasks.push(spawn_uptime_updater(
                self.start_time,
                self.shutdown_tx.subscribe(),
            ));
        }

        tracing::info!(
            workers = self.config.processing.worker_concurrency,
            raw_bucket = %self.config.ingest.raw_bucket,
            processed_bucket = %self.config.processing.processed_bucket,
            "orchestrator started"
        );
        Ok(())
    }

    /// Signal all worker loops to stop and wait for them to finish.
    pub async fn stop(&mut self) {
        tracing::info!("broadcasting shutdown signal to all workers");
        let _ = self.shutdown_tx.send(());

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "worker task panicked during shutdown");
            }
        }
        tracing::info!("all workers stopped");
    }

    /// Start all workers and block until a shutdown signal is received.
    pub async fn run(&mut self) -> Result<()> {
        self.start()?;

        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        self.stop().await;
        Ok(())
    }

    /// The object store backing this daemon.
    ///
    /// Putting an object under the configured raw bucket and key filter
    /// triggers the full pipeline.
    pub fn store(&self) -> Arc<MemoryObjectStore> {
        self.store.clone()
    }

    /// The alert channel backing this daemon.
    pub fn publisher(&self) -> Arc<MemoryAlertPublisher> {
        self.publisher.clone()
    }

    /// The dead-letter channel backing this daemon.
    pub fn dead_letters(&self) -> Arc<MemoryTaskQueue> {
        self.dead_letters.clone()
    }

    /// The business metrics sink backing this daemon.
    pub fn metrics_sink(&self) -> Arc<RecordingMetricsSink> {
        self.metrics_sink.clone()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &LogsiftConfig {
        &self.config
    }
}

/// Whether an object key passes the configured trigger filter.
///
/// Mirrors the prefix/suffix notification filter an object store trigger
/// would apply; the ingest component itself never filters.
fn key_matches_filter(key: &str, prefix: &str, suffix: &str) -> bool {
    key.starts_with(prefix) && key.ends_with(suffix)
}

/// Spawn the ingest loop: object-created events to processing tasks.
fn spawn_ingest_loop(
    notifier: IngestNotifier,
    mut raw_rx: mpsc::Receiver<ObjectEvent>,
    key_prefix: String,
    key_suffix: String,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = raw_rx.recv() => {
                    match event {
                        Some(event) => {
                            if !key_matches_filter(&event.key, &key_prefix, &key_suffix) {
                                counter!(m::INGEST_FILTERED_TOTAL).increment(1);
                                tracing::debug!(key = %event.key, "object ignored by key filter");
                                continue;
                            }
                            // Extraction failures are logged by the notifier;
                            // the object is simply not enqueued.
                            let _ = notifier
                                .on_object_created(&event.bucket, &event.key)
                                .await;
                        }
                        None => {
                            tracing::debug!("raw event channel closed, exiting ingest loop");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("ingest loop shutting down");
                    break;
                }
            }
        }
    })
}

/// Spawn one processing worker loop polling the task queue.
fn spawn_processing_loop(
    worker_id: usize,
    worker: Arc<ProcessingWorker>,
    task_queue: Arc<MemoryTaskQueue>,
    poll_interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let messages = match task_queue.receive(RECEIVE_BATCH_SIZE).await {
                        Ok(messages) => messages,
                        Err(e) => {
                            tracing::error!(worker_id, error = %e, "task queue receive failed");
                            continue;
                        }
                    };
                    for message in messages {
                        worker.handle(message).await;
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!(worker_id, "processing loop shutting down");
                    break;
                }
            }
        }
    })
}

/// Spawn the monitor loop: summary-created events to alert checks.
fn spawn_monitor_loop(
    monitor: MonitorWorker,
    mut summary_rx: mpsc::Receiver<ObjectEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = summary_rx.recv() => {
                    match event {
                        Some(event) => {
                            // handle_batch logs and skips failures
                            monitor.handle_batch(std::slice::from_ref(&event)).await;
                        }
                        None => {
                            tracing::debug!("summary event channel closed, exiting monitor loop");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("monitor loop shutting down");
                    break;
                }
            }
        }
    })
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_filter_requires_prefix_and_suffix() {
        assert!(key_matches_filter("logs/access.log", "logs/", ".log"));
        assert!(!key_matches_filter("other/access.log", "logs/", ".log"));
        assert!(!key_matches_filter("logs/access.txt", "logs/", ".log"));
        assert!(key_matches_filter("anything", "", ""));
    }

    #[test]
    fn build_from_default_config() {
        let orchestrator = Orchestrator::build_from_config(LogsiftConfig::default()).unwrap();
        assert_eq!(orchestrator.config().processing.worker_concurrency, 4);
        assert!(orchestrator.publisher().published().is_empty());
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = LogsiftConfig::default();
        config.processing.worker_concurrency = 0;
        assert!(Orchestrator::build_from_config(config).is_err());
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let mut orchestrator = Orchestrator::build_from_config(LogsiftConfig::default()).unwrap();
        orchestrator.start().unwrap();
        assert!(orchestrator.start().is_err());
        orchestrator.stop().await;
    }
}

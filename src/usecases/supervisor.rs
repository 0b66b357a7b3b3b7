//! Poll Supervisor - Lifecycle Owner of All Series Pollers
//!
//! Builds one `SeriesPoller` per series, spawns each as an independent
//! tokio task and exposes the only control surface the UI layer uses:
//! pause, resume, toggle, snapshot and shutdown. Pollers never talk to
//! each other; the supervisor coordinates lifecycle only.
//!
//! Dropping the supervisor closes the shutdown channel, which pollers
//! treat as a stop signal, so tasks never outlive it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use super::provider_chain::ProviderChain;
use super::series_poller::{PollSettings, PollerHandle, PollerState, SeriesPoller};
use crate::adapters::metrics::MetricsRegistry;
use crate::domain::{Sample, SeriesKey};

/// Configuration problems detected before any polling begins.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No series keys were given.
    #[error("at least one series must be configured")]
    NoSeries,
    /// The same key appears twice.
    #[error("series {0} is configured more than once")]
    DuplicateSeries(SeriesKey),
    /// A series has no providers to fetch from.
    #[error("series {0} has an empty provider chain")]
    EmptyProviderChain(SeriesKey),
    /// The chain factory rejected a series.
    #[error("failed to build provider chain for {key}: {reason}")]
    ChainConstruction {
        /// Series being built.
        key: SeriesKey,
        /// Factory error, rendered with its context chain.
        reason: String,
    },
    /// Metrics could not be registered.
    #[error("failed to register metrics: {0}")]
    Metrics(String),
    /// `start` was called outside a Tokio runtime.
    #[error("poll supervisor must be started inside a Tokio runtime")]
    NoRuntime,
}

/// Result of a `shutdown` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Pollers that reached `Cancelled` within the timeout.
    pub cancelled: usize,
    /// Poller tasks that panicked before stopping.
    pub failed: usize,
    /// Pollers forcibly aborted after the timeout.
    pub aborted: usize,
}

/// Owns every series poller and their shared stop signal.
pub struct PollSupervisor {
    /// Keys in configuration order.
    order: Vec<SeriesKey>,
    /// Registry of per-series control handles.
    pollers: HashMap<SeriesKey, PollerHandle>,
    /// Stop signal broadcaster.
    shutdown_tx: broadcast::Sender<()>,
    /// Running poller tasks; drained by the first `shutdown`.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Upper bound on how long `shutdown` waits.
    shutdown_timeout: Duration,
    /// Whether the stop signal has been sent.
    stopping: AtomicBool,
    /// Engine metrics.
    metrics: Arc<MetricsRegistry>,
}

impl PollSupervisor {
    /// Build one poller per key and start them concurrently.
    ///
    /// Every chain is built and validated before the first task is
    /// spawned, so a configuration error leaves nothing running.
    ///
    /// # Errors
    /// Returns a [`SupervisorError`] for empty, duplicate or
    /// chain-less series, a failing factory, or a missing runtime.
    #[instrument(skip_all)]
    pub fn start<K, F>(
        settings: PollSettings,
        keys: K,
        mut chain_factory: F,
    ) -> Result<Self, SupervisorError>
    where
        K: IntoIterator<Item = SeriesKey>,
        F: FnMut(&SeriesKey) -> anyhow::Result<ProviderChain>,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SupervisorError::NoRuntime)?;
        let metrics = Arc::new(
            MetricsRegistry::new().map_err(|e| SupervisorError::Metrics(e.to_string()))?,
        );

        let mut order = Vec::new();
        let mut pollers = HashMap::new();
        let mut staged = Vec::new();

        for key in keys {
            if pollers.contains_key(&key) {
                return Err(SupervisorError::DuplicateSeries(key));
            }

            let chain = chain_factory(&key).map_err(|e| SupervisorError::ChainConstruction {
                key: key.clone(),
                reason: format!("{e:#}"),
            })?;
            if chain.is_empty() {
                return Err(SupervisorError::EmptyProviderChain(key));
            }

            let (poller, handle) =
                SeriesPoller::new(key.clone(), chain, &settings, Arc::clone(&metrics));
            metrics.paused.with_label_values(&[key.as_str()]).set(0.0);
            pollers.insert(key.clone(), handle);
            order.push(key);
            staged.push(poller);
        }

        if staged.is_empty() {
            return Err(SupervisorError::NoSeries);
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let tasks = staged
            .into_iter()
            .map(|poller| runtime.spawn(poller.run(shutdown_tx.subscribe())))
            .collect();

        info!(
            series = order.len(),
            poll_interval_ms = u64::try_from(settings.poll_interval.as_millis()).unwrap_or(u64::MAX),
            capacity = settings.buffer_capacity,
            "Poll supervisor started"
        );

        Ok(Self {
            order,
            pollers,
            shutdown_tx,
            tasks: Mutex::new(tasks),
            shutdown_timeout: settings.shutdown_timeout,
            stopping: AtomicBool::new(false),
            metrics,
        })
    }

    /// Tracked keys in configuration order.
    pub fn keys(&self) -> &[SeriesKey] {
        &self.order
    }

    /// Shared engine metrics.
    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Pause a series. Unknown keys are ignored.
    pub fn pause(&self, key: &SeriesKey) {
        self.set_paused(key, true);
    }

    /// Resume a series. Unknown keys are ignored.
    pub fn resume(&self, key: &SeriesKey) {
        self.set_paused(key, false);
    }

    /// Flip a series' pause flag. Returns the new state, or `None` for
    /// an unknown key.
    pub fn toggle(&self, key: &SeriesKey) -> Option<bool> {
        let handle = self.pollers.get(key)?;
        let paused = handle.toggle();
        self.publish_paused(key, paused);
        Some(paused)
    }

    /// Whether a series is paused (`None` for an unknown key).
    pub fn is_paused(&self, key: &SeriesKey) -> Option<bool> {
        self.pollers.get(key).map(PollerHandle::is_paused)
    }

    /// Ordered copy of a series buffer; empty for an unknown key.
    pub fn snapshot(&self, key: &SeriesKey) -> Vec<Sample> {
        self.pollers
            .get(key)
            .map(PollerHandle::snapshot)
            .unwrap_or_default()
    }

    /// Newest sample of a series.
    pub fn latest(&self, key: &SeriesKey) -> Option<Sample> {
        self.pollers.get(key).and_then(PollerHandle::latest)
    }

    /// Current poller state of a series.
    pub fn state(&self, key: &SeriesKey) -> Option<PollerState> {
        self.pollers.get(key).map(PollerHandle::state)
    }

    /// Handle for observing a series' state changes.
    pub fn handle(&self, key: &SeriesKey) -> Option<&PollerHandle> {
        self.pollers.get(key)
    }

    /// Whether `shutdown` has been called.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Signal every poller to stop and wait, up to the configured
    /// timeout, for all of them to finish. Stragglers are aborted.
    ///
    /// Idempotent: later calls wait for the first one to complete and
    /// then return an empty report.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> ShutdownReport {
        if !self.stopping.swap(true, Ordering::AcqRel) {
            info!(series = self.order.len(), "Shutdown signal broadcast to all pollers");
            // No receivers left means every poller already exited.
            let _ = self.shutdown_tx.send(());
        }

        let mut tasks = self.tasks.lock().await;
        let mut report = ShutdownReport::default();
        if tasks.is_empty() {
            return report;
        }

        let deadline = Instant::now() + self.shutdown_timeout;
        for mut task in tasks.drain(..) {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => report.cancelled += 1,
                Ok(Err(e)) => {
                    error!(error = %e, "Poller task failed");
                    report.failed += 1;
                }
                Err(_) => {
                    warn!("Poller did not stop in time, aborting");
                    task.abort();
                    report.aborted += 1;
                }
            }
        }

        info!(
            cancelled = report.cancelled,
            failed = report.failed,
            aborted = report.aborted,
            "Poll supervisor stopped"
        );
        report
    }

    fn set_paused(&self, key: &SeriesKey, paused: bool) {
        if let Some(handle) = self.pollers.get(key) {
            handle.set_paused(paused);
            self.publish_paused(key, paused);
        }
    }

    fn publish_paused(&self, key: &SeriesKey, paused: bool) {
        self.metrics
            .paused
            .with_label_values(&[key.as_str()])
            .set(if paused { 1.0 } else { 0.0 });
        info!(series = %key, paused, "Series pause state changed");
    }
}

//! Series Poller - Per-Series Fetch/Wait State Machine
//!
//! One poller runs per tracked series in its own tokio task:
//!
//! ```text
//!   Waiting --tick, paused--------------------------> Waiting (after poll interval)
//!   Waiting --tick----> Fetching --ok---------------> Waiting (after poll interval)
//!                                --all failed-------> BackingOff --delay--> Waiting
//!   any state --shutdown----------------------------> Cancelled
//! ```
//!
//! Every suspension point (the fetch itself, the poll-interval wait and
//! the backoff wait) races the shutdown signal, so cancellation never
//! waits out a full interval. An abandoned fetch future is dropped and
//! its result never reaches the buffer.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, trace, warn};

use super::provider_chain::{AllProvidersFailed, ChainQuote, ProviderChain};
use crate::adapters::metrics::MetricsRegistry;
use crate::domain::{BackoffState, DEFAULT_CAPACITY, Sample, SampleBuffer, SeriesKey};

/// Lifecycle state of a series poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Idle until the next tick.
    Waiting,
    /// Provider chain call in flight.
    Fetching,
    /// Waiting out a post-failure delay.
    BackingOff,
    /// Terminal; entered only via the shutdown signal.
    Cancelled,
}

/// Timing and sizing shared by all pollers of a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Cadence of ticks, paused or not.
    pub poll_interval: Duration,
    /// Samples retained per series.
    pub buffer_capacity: usize,
    /// First backoff delay after a failure.
    pub backoff_base: Duration,
    /// Backoff ceiling.
    pub backoff_max: Duration,
    /// How long `shutdown` waits for pollers before aborting them.
    pub shutdown_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            buffer_capacity: DEFAULT_CAPACITY,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(11),
        }
    }
}

/// Control and read side of a poller, held by the supervisor.
#[derive(Debug, Clone)]
pub struct PollerHandle {
    buffer: Arc<SampleBuffer>,
    paused: Arc<AtomicBool>,
    state_rx: watch::Receiver<PollerState>,
}

impl PollerHandle {
    /// Ordered copy of the series buffer.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.buffer.snapshot()
    }

    /// Newest sample, if any.
    pub fn latest(&self) -> Option<Sample> {
        self.buffer.latest()
    }

    /// Set the pause flag; the poller honours it on its next tick.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Flip the pause flag and return the new value.
    pub fn toggle(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    /// Current pause flag.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Last state published by the poller.
    pub fn state(&self) -> PollerState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<PollerState> {
        self.state_rx.clone()
    }
}

/// Owns one series' backoff, buffer (write side) and provider chain.
pub struct SeriesPoller {
    key: SeriesKey,
    chain: ProviderChain,
    buffer: Arc<SampleBuffer>,
    paused: Arc<AtomicBool>,
    backoff: BackoffState,
    poll_interval: Duration,
    state_tx: watch::Sender<PollerState>,
    metrics: Arc<MetricsRegistry>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl SeriesPoller {
    /// Create a poller in `Waiting` and its control handle.
    pub fn new(
        key: SeriesKey,
        chain: ProviderChain,
        settings: &PollSettings,
        metrics: Arc<MetricsRegistry>,
    ) -> (Self, PollerHandle) {
        let buffer = Arc::new(SampleBuffer::new(settings.buffer_capacity));
        let paused = Arc::new(AtomicBool::new(false));
        let (state_tx, state_rx) = watch::channel(PollerState::Waiting);

        let handle = PollerHandle {
            buffer: Arc::clone(&buffer),
            paused: Arc::clone(&paused),
            state_rx,
        };

        let poller = Self {
            key,
            chain,
            buffer,
            paused,
            backoff: BackoffState::new(settings.backoff_base, settings.backoff_max),
            poll_interval: settings.poll_interval,
            state_tx,
            metrics,
            last_timestamp: None,
        };

        (poller, handle)
    }

    /// Series this poller tracks.
    pub const fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// Run the cycle until the shutdown signal fires.
    ///
    /// A closed shutdown channel counts as a stop signal too.
    #[instrument(skip_all, fields(series = %self.key))]
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(providers = ?self.chain, "Series poller started");

        loop {
            if self.paused.load(Ordering::Acquire) {
                trace!("Paused, skipping fetch");
                if cancellable_sleep(self.poll_interval, &mut shutdown_rx).await.is_break() {
                    break;
                }
                continue;
            }

            self.set_state(PollerState::Fetching);
            let result = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                result = self.chain.fetch(&self.key) => result,
            };

            let delay = match result {
                Ok(quote) => {
                    self.record_success(&quote);
                    self.set_state(PollerState::Waiting);
                    self.poll_interval
                }
                Err(err) => {
                    let delay = self.record_failure(&err);
                    self.set_state(PollerState::BackingOff);
                    delay
                }
            };

            if cancellable_sleep(delay, &mut shutdown_rx).await.is_break() {
                break;
            }
            self.set_state(PollerState::Waiting);
        }

        self.set_state(PollerState::Cancelled);
        info!("Series poller cancelled");
    }

    fn record_success(&mut self, quote: &ChainQuote) {
        let series = self.key.as_str();

        let timestamp = next_timestamp(Utc::now(), self.last_timestamp);
        self.last_timestamp = Some(timestamp);

        self.buffer.append(Sample::new(timestamp, quote.value));
        self.backoff.on_success();

        for (provider, error) in quote.fallbacks() {
            self.metrics
                .provider_failures
                .with_label_values(&[series, provider, error.kind()])
                .inc();
        }
        self.metrics.fetches.with_label_values(&[series, "success"]).inc();
        self.metrics.backoff_delay_seconds.with_label_values(&[series]).set(0.0);
        self.metrics
            .buffer_samples
            .with_label_values(&[series])
            .set(self.buffer.len() as f64);
        self.metrics.last_value.with_label_values(&[series]).set(quote.value);

        trace!(value = quote.value, provider = %quote.provider, "Sample appended");
    }

    fn record_failure(&mut self, err: &AllProvidersFailed) -> Duration {
        let series = self.key.as_str();
        let delay = self.backoff.on_failure();

        for failure in &err.failures {
            self.metrics
                .provider_failures
                .with_label_values(&[series, &failure.provider, failure.error.kind()])
                .inc();
        }
        self.metrics.fetches.with_label_values(&[series, "failure"]).inc();
        self.metrics
            .backoff_delay_seconds
            .with_label_values(&[series])
            .set(delay.as_secs_f64());

        warn!(
            error = %err,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Fetch failed, backing off"
        );
        delay
    }

    fn set_state(&self, state: PollerState) {
        self.state_tx.send_replace(state);
    }
}

/// Stamp for the next sample: `now`, or 1µs past `last` when the clock
/// has not moved forward. Fetches are serial per series, so only clock
/// skew can repeat a stamp.
fn next_timestamp(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match last {
        Some(last) if now <= last => last + TimeDelta::microseconds(1),
        _ => now,
    }
}

/// Sleep for `delay` unless the shutdown signal fires first.
pub async fn cancellable_sleep(
    delay: Duration,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> ControlFlow<()> {
    tokio::select! {
        biased;
        _ = shutdown_rx.recv() => ControlFlow::Break(()),
        () = tokio::time::sleep(delay) => ControlFlow::Continue(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FetchError, QuoteProvider};
    use async_trait::async_trait;
    use chrono::TimeZone;

    #[test]
    fn test_next_timestamp_stays_strictly_increasing() {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let tick = TimeDelta::microseconds(1);

        assert_eq!(next_timestamp(t0, None), t0);

        // Clock stuck on the same reading.
        let first = next_timestamp(t0, Some(t0));
        let second = next_timestamp(t0, Some(first));
        assert_eq!(first, t0 + tick);
        assert_eq!(second, t0 + tick + tick);

        // Clock stepped backwards.
        assert_eq!(next_timestamp(t0 - TimeDelta::seconds(5), Some(t0)), t0 + tick);

        // Clock moved forward: used as is.
        let later = t0 + TimeDelta::seconds(2);
        assert_eq!(next_timestamp(later, Some(t0)), later);
    }

    struct Constant(f64);

    #[async_trait]
    impl QuoteProvider for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        async fn fetch_quote(&self, _key: &SeriesKey) -> Result<f64, FetchError> {
            Ok(self.0)
        }
    }

    fn poller(value: f64) -> (SeriesPoller, PollerHandle) {
        let chain = ProviderChain::new(vec![Arc::new(Constant(value))]);
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        SeriesPoller::new(SeriesKey::new("K"), chain, &PollSettings::default(), metrics)
    }

    #[test]
    fn test_handle_toggle_flips_flag() {
        let (_poller, handle) = poller(1.0);
        assert!(!handle.is_paused());
        assert!(handle.toggle());
        assert!(handle.is_paused());
        assert!(!handle.toggle());
        handle.set_paused(true);
        assert!(handle.is_paused());
    }

    #[test]
    fn test_new_poller_starts_waiting() {
        let (poller, handle) = poller(1.0);
        assert_eq!(handle.state(), PollerState::Waiting);
        assert_eq!(poller.key().as_str(), "K");
        assert!(handle.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_sleep_breaks_on_signal() {
        let (tx, mut rx) = broadcast::channel(1);
        tx.send(()).unwrap();
        let flow = cancellable_sleep(Duration::from_secs(3600), &mut rx).await;
        assert!(flow.is_break());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_sleep_completes() {
        let (_tx, mut rx) = broadcast::channel::<()>(1);
        let flow = cancellable_sleep(Duration::from_secs(2), &mut rx).await;
        assert!(flow.is_continue());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_appends_and_stops() {
        let (poller, handle) = poller(7.0);
        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(poller.run(rx));

        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send(()).unwrap();
        task.await.unwrap();

        let snap = handle.snapshot();
        assert!(snap.len() >= 2, "expected several samples, got {}", snap.len());
        assert!(snap.iter().all(|s| s.value == 7.0));
        assert!(snap.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(handle.state(), PollerState::Cancelled);
    }
}

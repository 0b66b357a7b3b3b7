//! Prometheus Metrics Registry - Polling Observability
//!
//! Per-series counters and gauges for fetch outcomes, provider
//! failures, backoff delay, buffer fill and pause state. Each
//! supervisor owns its own `Registry`; nothing is process-global.

use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Polling engine metrics, all labelled by `series`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Chain fetches by outcome (`success` / `failure`).
    pub fetches: IntCounterVec,
    /// Individual provider failures by provider and error kind.
    pub provider_failures: IntCounterVec,
    /// Delay applied after the latest failure, in seconds (0 after success).
    pub backoff_delay_seconds: GaugeVec,
    /// Samples currently held in the series buffer.
    pub buffer_samples: GaugeVec,
    /// Pause flag (1 = paused).
    pub paused: GaugeVec,
    /// Most recently observed value.
    pub last_value: GaugeVec,
}

impl MetricsRegistry {
    /// Create and register all metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let fetches = IntCounterVec::new(
            Opts::new("ticker_poller_fetches_total", "Provider chain fetches by outcome"),
            &["series", "outcome"],
        )?;

        let provider_failures = IntCounterVec::new(
            Opts::new(
                "ticker_poller_provider_failures_total",
                "Failed provider attempts by provider and error kind",
            ),
            &["series", "provider", "kind"],
        )?;

        let backoff_delay_seconds = GaugeVec::new(
            Opts::new(
                "ticker_poller_backoff_delay_seconds",
                "Backoff delay applied after the latest failure",
            ),
            &["series"],
        )?;

        let buffer_samples = GaugeVec::new(
            Opts::new("ticker_poller_buffer_samples", "Samples held in the series buffer"),
            &["series"],
        )?;

        let paused = GaugeVec::new(
            Opts::new("ticker_poller_paused", "Whether the series is paused (1=yes, 0=no)"),
            &["series"],
        )?;

        let last_value = GaugeVec::new(
            Opts::new("ticker_poller_last_value", "Most recently observed value"),
            &["series"],
        )?;

        registry.register(Box::new(fetches.clone()))?;
        registry.register(Box::new(provider_failures.clone()))?;
        registry.register(Box::new(backoff_delay_seconds.clone()))?;
        registry.register(Box::new(buffer_samples.clone()))?;
        registry.register(Box::new(paused.clone()))?;
        registry.register(Box::new(last_value.clone()))?;

        Ok(Self {
            registry,
            fetches,
            provider_failures,
            backoff_delay_seconds,
            buffer_samples,
            paused,
            last_value,
        })
    }

    /// Encode all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

//! Configuration Module - TOML-based Engine Configuration
//!
//! Loads and validates configuration from `config.toml`. Endpoints,
//! field paths and timings are externalized here; nothing about a
//! particular quote API is hardcoded in the engine.

pub mod chains;
pub mod loader;

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::usecases::PollSettings;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application identity and logging.
    #[serde(default)]
    pub app: AppSection,
    /// Poller timing and buffer sizing.
    #[serde(default)]
    pub polling: PollingConfig,
    /// HTTP client settings shared by all providers.
    #[serde(default)]
    pub http: HttpConfig,
    /// Metrics and health endpoints.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Tracked series, in display order.
    pub series: Vec<SeriesConfig>,
}

/// Application identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// Human-readable application name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-field lines.
    Pretty,
}

/// Poller timing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Seconds between ticks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,
    /// Samples retained per series.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// First retry delay after a failed fetch (seconds).
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: f64,
    /// Retry delay ceiling (seconds).
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: f64,
    /// Upper bound on shutdown wait (seconds).
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: f64,
    /// How often the console renderer logs the latest values (seconds).
    #[serde(default = "default_poll_interval")]
    pub render_interval_secs: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            buffer_capacity: default_buffer_capacity(),
            backoff_base_secs: default_backoff_base(),
            backoff_max_secs: default_backoff_max(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            render_interval_secs: default_poll_interval(),
        }
    }
}

impl PollingConfig {
    /// Engine settings derived from this section. Call after validation.
    pub fn settings(&self) -> PollSettings {
        PollSettings {
            poll_interval: Duration::from_secs_f64(self.poll_interval_secs),
            buffer_capacity: self.buffer_capacity,
            backoff_base: Duration::from_secs_f64(self.backoff_base_secs),
            backoff_max: Duration::from_secs_f64(self.backoff_max_secs),
            shutdown_timeout: Duration::from_secs_f64(self.shutdown_timeout_secs),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Default per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: f64,
    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Serve /live, /ready and /metrics.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bind address for the health server.
    #[serde(default = "default_metrics_addr")]
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_metrics_addr(),
        }
    }
}

/// One tracked series.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesConfig {
    /// Series key, also bound to `{symbol}` in templates.
    pub key: String,
    /// Extra template values, e.g. `base = "USD"`, `quote = "EUR"`.
    #[serde(default)]
    pub params: HashMap<String, String>,
    /// Providers in fallback order.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// One quote endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider name for logs and metrics.
    pub name: String,
    /// Endpoint URL template.
    pub endpoint: String,
    /// Dot-separated JSON field path template.
    pub field: String,
    /// Per-provider timeout override (seconds).
    pub timeout_secs: Option<f64>,
}

// Default value functions for serde

fn default_name() -> String {
    "ticker-poller".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_poll_interval() -> f64 {
    2.0
}

const fn default_buffer_capacity() -> usize {
    crate::domain::DEFAULT_CAPACITY
}

const fn default_backoff_base() -> f64 {
    2.0
}

const fn default_backoff_max() -> f64 {
    10.0
}

const fn default_shutdown_timeout() -> f64 {
    11.0
}

const fn default_request_timeout() -> f64 {
    crate::adapters::quotes::http::DEFAULT_REQUEST_TIMEOUT.as_secs_f64()
}

fn default_user_agent() -> String {
    crate::adapters::quotes::http::DEFAULT_USER_AGENT.to_string()
}

fn default_metrics_addr() -> String {
    "127.0.0.1:9090".to_string()
}

//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;
use crate::adapters::quotes::FieldPath;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    info!(
        series = config.series.len(),
        poll_interval_secs = config.polling.poll_interval_secs,
        capacity = config.polling.buffer_capacity,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Parse and validate configuration from TOML text.
///
/// # Errors
/// Returns an error on malformed TOML or failed validation.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("Failed to parse config TOML")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive timings and capacity
/// - Backoff base not above its ceiling
/// - At least one series, unique keys, non-empty provider chains
fn validate_config(config: &AppConfig) -> Result<()> {
    let polling = &config.polling;

    anyhow::ensure!(
        is_positive(polling.poll_interval_secs),
        "poll_interval_secs must be positive, got {}",
        polling.poll_interval_secs
    );
    anyhow::ensure!(polling.buffer_capacity > 0, "buffer_capacity must be positive");
    anyhow::ensure!(
        is_positive(polling.backoff_base_secs),
        "backoff_base_secs must be positive, got {}",
        polling.backoff_base_secs
    );
    anyhow::ensure!(
        is_positive(polling.backoff_max_secs) && polling.backoff_max_secs >= polling.backoff_base_secs,
        "backoff_max_secs ({}) must be >= backoff_base_secs ({})",
        polling.backoff_max_secs,
        polling.backoff_base_secs
    );
    anyhow::ensure!(
        is_positive(polling.shutdown_timeout_secs),
        "shutdown_timeout_secs must be positive, got {}",
        polling.shutdown_timeout_secs
    );
    anyhow::ensure!(
        is_positive(polling.render_interval_secs),
        "render_interval_secs must be positive, got {}",
        polling.render_interval_secs
    );
    anyhow::ensure!(
        is_positive(config.http.request_timeout_secs),
        "request_timeout_secs must be positive, got {}",
        config.http.request_timeout_secs
    );

    anyhow::ensure!(!config.series.is_empty(), "At least one series must be configured");

    let mut seen = HashSet::new();
    for (i, series) in config.series.iter().enumerate() {
        anyhow::ensure!(!series.key.trim().is_empty(), "Series {i} has an empty key");
        anyhow::ensure!(
            seen.insert(series.key.as_str()),
            "Series {} is configured more than once",
            series.key
        );
        anyhow::ensure!(
            !series.providers.is_empty(),
            "Series {} has no providers",
            series.key
        );

        for provider in &series.providers {
            anyhow::ensure!(
                !provider.endpoint.is_empty(),
                "Provider {} of series {} has an empty endpoint",
                provider.name,
                series.key
            );
            FieldPath::parse(&provider.field).with_context(|| {
                format!("Provider {} of series {}", provider.name, series.key)
            })?;
            if let Some(timeout) = provider.timeout_secs {
                anyhow::ensure!(
                    is_positive(timeout),
                    "Provider {} of series {} has non-positive timeout_secs {}",
                    provider.name,
                    series.key,
                    timeout
                );
            }
        }
    }

    Ok(())
}

/// Positive and representable as a `Duration`.
fn is_positive(value: f64) -> bool {
    value > 0.0 && Duration::try_from_secs_f64(value).is_ok()
}

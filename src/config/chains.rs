//! Provider chain construction from configuration.
//!
//! Binds each series' provider list to HTTP quote providers sharing a
//! single connection pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use super::{AppConfig, SeriesConfig};
use crate::adapters::quotes::{HttpQuoteProvider, ProviderDescriptor, build_http_client};
use crate::domain::SeriesKey;
use crate::ports::QuoteProvider;
use crate::usecases::ProviderChain;

/// Builds provider chains for the series declared in an [`AppConfig`].
pub struct ConfiguredChains {
    http: reqwest::Client,
    default_timeout: Duration,
    series: HashMap<SeriesKey, SeriesConfig>,
}

impl ConfiguredChains {
    /// Prepare the shared HTTP client and index series by key.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = build_http_client(&config.http.user_agent)?;
        let series = config
            .series
            .iter()
            .map(|s| (SeriesKey::new(&s.key), s.clone()))
            .collect();

        Ok(Self {
            http,
            default_timeout: Duration::from_secs_f64(config.http.request_timeout_secs),
            series,
        })
    }

    /// Series keys in configuration order.
    pub fn keys(config: &AppConfig) -> Vec<SeriesKey> {
        config.series.iter().map(|s| SeriesKey::new(&s.key)).collect()
    }

    /// Build the chain for one series.
    ///
    /// # Errors
    /// Fails for an unknown key or a template that does not render.
    pub fn chain_for(&self, key: &SeriesKey) -> Result<ProviderChain> {
        let series = self
            .series
            .get(key)
            .with_context(|| format!("Series {key} is not configured"))?;

        let providers = series
            .providers
            .iter()
            .map(|p| {
                let descriptor = ProviderDescriptor {
                    name: p.name.clone(),
                    endpoint: p.endpoint.clone(),
                    field: p.field.clone(),
                    timeout: p
                        .timeout_secs
                        .map_or(self.default_timeout, Duration::from_secs_f64),
                };
                HttpQuoteProvider::bind(self.http.clone(), &descriptor, key, &series.params)
                    .map(|provider| Arc::new(provider) as Arc<dyn QuoteProvider>)
                    .with_context(|| format!("Provider {}", p.name))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ProviderChain::new(providers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;

    const FX: &str = r#"
        [http]
        request_timeout_secs = 5.0

        [[series]]
        key = "USD/EUR"
        params = { base = "USD", quote = "EUR" }

        [[series.providers]]
        name = "frankfurter"
        endpoint = "https://api.frankfurter.app/latest?from={base}&to={quote}"
        field = "rates.{quote}"

        [[series.providers]]
        name = "er-api"
        endpoint = "https://open.er-api.com/v6/latest/{base}"
        field = "rates.{quote}"
        timeout_secs = 3.0
    "#;

    #[test]
    fn test_chain_preserves_provider_order() {
        let config = parse_config(FX).unwrap();
        let chains = ConfiguredChains::new(&config).unwrap();
        let chain = chains.chain_for(&SeriesKey::new("USD/EUR")).unwrap();
        assert_eq!(chain.provider_names(), vec!["frankfurter", "er-api"]);
        assert_eq!(ConfiguredChains::keys(&config), vec![SeriesKey::new("USD/EUR")]);
    }

    #[test]
    fn test_unknown_series_fails() {
        let config = parse_config(FX).unwrap();
        let chains = ConfiguredChains::new(&config).unwrap();
        assert!(chains.chain_for(&SeriesKey::new("BTCUSDT")).is_err());
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let config = parse_config(&FX.replace("{base}&to", "{nope}&to")).unwrap();
        let chains = ConfiguredChains::new(&config).unwrap();
        let err = chains.chain_for(&SeriesKey::new("USD/EUR")).unwrap_err();
        assert!(format!("{err:#}").contains("frankfurter"));
    }
}

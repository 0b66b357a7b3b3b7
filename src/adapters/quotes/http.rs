//! HTTP Quote Provider - JSON REST Endpoint Adapter
//!
//! Issues `GET <endpoint>` with a per-provider timeout, checks the
//! status, parses the JSON body and extracts one numeric field.
//! Works for spot tickers (`{"price": "109345.12"}`) and exchange-rate
//! APIs (`{"rates": {"EUR": 0.92}}`) alike.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::template::{FieldPath, TemplateError, render_template, render_url};
use crate::domain::SeriesKey;
use crate::ports::{FetchError, QuoteProvider};

/// Default `User-Agent` sent with every quote request.
pub const DEFAULT_USER_AGENT: &str = "DualTicker/1.0";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the shared HTTP client used by all quote providers.
///
/// Per-request timeouts are applied by each provider; the client only
/// carries connection pooling and the user agent.
pub fn build_http_client(user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .pool_max_idle_per_host(2)
        .build()
        .context("Failed to build HTTP client")
}

/// Declarative description of one quote endpoint, before binding to a
/// series.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Provider name for logs and metrics.
    pub name: String,
    /// Endpoint template, e.g. `https://api.binance.com/api/v3/ticker/price?symbol={symbol}`.
    pub endpoint: String,
    /// Field path template, e.g. `price` or `rates.{quote}`.
    pub field: String,
    /// Bound on the whole request, body included.
    pub timeout: Duration,
}

/// A provider descriptor bound to one series.
#[derive(Debug, Clone)]
pub struct HttpQuoteProvider {
    /// Underlying HTTP client (shared connection pool).
    http: Client,
    /// Provider name.
    name: String,
    /// Fully rendered request URL.
    url: String,
    /// Where the value lives in the response.
    field: FieldPath,
    /// Request timeout.
    timeout: Duration,
}

impl HttpQuoteProvider {
    /// Bind `descriptor` to a series, rendering its templates.
    ///
    /// # Errors
    /// Fails on unknown placeholders, an endpoint that is not a URL or
    /// an invalid field path.
    pub fn bind(
        http: Client,
        descriptor: &ProviderDescriptor,
        key: &SeriesKey,
        params: &HashMap<String, String>,
    ) -> Result<Self, TemplateError> {
        let url = render_url(&descriptor.endpoint, key.as_str(), params)?.into();
        let field = FieldPath::parse(&render_template(&descriptor.field, key.as_str(), params)?)?;

        Ok(Self {
            http,
            name: descriptor.name.clone(),
            url,
            field,
            timeout: descriptor.timeout,
        })
    }

    /// Rendered request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn classify(err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Network(format!("request timed out: {err}"))
    } else if err.is_decode() {
        FetchError::Parse(format!("invalid JSON body: {err}"))
    } else {
        FetchError::Network(err.to_string())
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn fetch_quote(&self, key: &SeriesKey) -> Result<f64, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Protocol {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| classify(&e))?;
        let value = self.field.extract(&body)?;

        debug!(series = %key, value, "Quote received");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(endpoint: &str, field: &str) -> ProviderDescriptor {
        ProviderDescriptor {
            name: "test".to_string(),
            endpoint: endpoint.to_string(),
            field: field.to_string(),
            timeout: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_bind_renders_url_and_field() {
        let http = build_http_client(DEFAULT_USER_AGENT).unwrap();
        let mut params = HashMap::new();
        params.insert("base".to_string(), "USD".to_string());
        params.insert("quote".to_string(), "EUR".to_string());

        let provider = HttpQuoteProvider::bind(
            http,
            &descriptor("https://fx.example/latest?from={base}&to={quote}", "rates.{quote}"),
            &SeriesKey::new("USD/EUR"),
            &params,
        )
        .unwrap();

        assert_eq!(provider.url(), "https://fx.example/latest?from=USD&to=EUR");
        assert_eq!(provider.field.as_dotted(), "rates.EUR");
        assert_eq!(provider.timeout(), Duration::from_secs(3));
        assert_eq!(provider.name(), "test");
    }

    #[test]
    fn test_bind_rejects_unknown_placeholder() {
        let http = build_http_client(DEFAULT_USER_AGENT).unwrap();
        let result = HttpQuoteProvider::bind(
            http,
            &descriptor("https://x/{nope}", "price"),
            &SeriesKey::new("BTCUSDT"),
            &HashMap::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bind_encodes_key_into_query() {
        let http = build_http_client(DEFAULT_USER_AGENT).unwrap();
        let provider = HttpQuoteProvider::bind(
            http,
            &descriptor("https://x.example/price?symbol={symbol}", "price"),
            &SeriesKey::new("USD/EUR"),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(provider.url(), "https://x.example/price?symbol=USD%2FEUR");
    }
}

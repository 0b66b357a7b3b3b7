//! Quote Provider Port - Single Data Source Interface
//!
//! A provider turns a series key into one fresh numeric value.
//! Providers are stateless and interchangeable; ordering, fallback
//! and retry live in the use-case layer.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::SeriesKey;

/// Why a single provider attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection failure, DNS error or request timeout.
    #[error("network error: {0}")]
    Network(String),
    /// The endpoint answered with a non-success status.
    #[error("unexpected HTTP status {status}")]
    Protocol {
        /// HTTP status code returned.
        status: u16,
    },
    /// The body was not JSON, or the expected field was missing,
    /// null or not a finite number.
    #[error("parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Short label used for metrics and structured logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Protocol { .. } => "protocol",
            Self::Parse(_) => "parse",
        }
    }
}

/// Trait for quote data sources.
///
/// Implementors must bound their own request time; callers rely on it
/// to keep cancellation latency finite.
#[async_trait]
pub trait QuoteProvider: Send + Sync + 'static {
    /// Human-readable provider name for diagnostics.
    fn name(&self) -> &str;

    /// Fetch the current value for `key`.
    ///
    /// # Errors
    /// Returns a [`FetchError`] describing the first failure encountered.
    async fn fetch_quote(&self, key: &SeriesKey) -> Result<f64, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(FetchError::Network("refused".into()).kind(), "network");
        assert_eq!(FetchError::Protocol { status: 503 }.kind(), "protocol");
        assert_eq!(FetchError::Parse("missing".into()).kind(), "parse");
    }

    #[test]
    fn test_protocol_error_display() {
        let e = FetchError::Protocol { status: 429 };
        assert_eq!(e.to_string(), "unexpected HTTP status 429");
    }
}

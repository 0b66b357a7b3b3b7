//! Quote Provider Chain - Ordered Fallback Across Data Sources
//!
//! Tries each provider in declared order until one yields a value.
//! Every attempt is recorded, so callers get the full picture whether
//! the chain succeeds on a fallback or fails outright. The chain never
//! retries; pacing and backoff belong to the series poller.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::SeriesKey;
use crate::ports::{FetchError, QuoteProvider};

/// Outcome of one provider attempt within a chain fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAttempt {
    /// Provider name.
    pub provider: String,
    /// Value on success, reason on failure.
    pub outcome: Result<f64, FetchError>,
}

/// A successful chain fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainQuote {
    /// Value extracted by the first succeeding provider.
    pub value: f64,
    /// Name of the provider that produced the value.
    pub provider: String,
    /// Every attempt made, in order; the last one is the success.
    pub attempts: Vec<ProviderAttempt>,
}

impl ChainQuote {
    /// Failed attempts that preceded the success.
    pub fn fallbacks(&self) -> impl Iterator<Item = (&str, &FetchError)> {
        self.attempts.iter().filter_map(|a| match &a.outcome {
            Err(e) => Some((a.provider.as_str(), e)),
            Ok(_) => None,
        })
    }
}

/// One provider's failure inside an aggregate error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Provider name.
    pub provider: String,
    /// Why it failed.
    pub error: FetchError,
}

/// Every provider in the chain failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("all {} providers failed for {key}: {}", .failures.len(), FailureList(.failures))]
pub struct AllProvidersFailed {
    /// Series that was being fetched.
    pub key: SeriesKey,
    /// Failures in attempt order.
    pub failures: Vec<ProviderFailure>,
}

struct FailureList<'a>(&'a [ProviderFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.provider, failure.error)?;
        }
        Ok(())
    }
}

/// Ordered, immutable list of providers for one series.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Arc<[Arc<dyn QuoteProvider>]>,
}

impl fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ProviderChain {
    /// Create a chain from providers in fallback order.
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        Self {
            providers: providers.into(),
        }
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers (rejected at supervisor start).
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Try each provider in order and return the first value.
    ///
    /// # Errors
    /// Returns [`AllProvidersFailed`] carrying each provider's reason
    /// when no provider succeeds.
    pub async fn fetch(&self, key: &SeriesKey) -> Result<ChainQuote, AllProvidersFailed> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in self.providers.iter() {
            let outcome = provider.fetch_quote(key).await;
            let name = provider.name().to_string();

            match outcome {
                Ok(value) => {
                    attempts.push(ProviderAttempt {
                        provider: name.clone(),
                        outcome: Ok(value),
                    });
                    return Ok(ChainQuote {
                        value,
                        provider: name,
                        attempts,
                    });
                }
                Err(error) => {
                    debug!(series = %key, provider = %name, error = %error, "Provider failed, trying next");
                    attempts.push(ProviderAttempt {
                        provider: name,
                        outcome: Err(error),
                    });
                }
            }
        }

        let failures = attempts
            .into_iter()
            .filter_map(|a| {
                a.outcome.err().map(|error| ProviderFailure {
                    provider: a.provider,
                    error,
                })
            })
            .collect();

        Err(AllProvidersFailed {
            key: key.clone(),
            failures,
        })
    }
}

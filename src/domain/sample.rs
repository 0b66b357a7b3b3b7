//! Series identity and observed samples.
//!
//! A `SeriesKey` names one independently polled quantity (a symbol
//! pair such as "BTCUSDT" or "USD/EUR"). A `Sample` is one observed
//! value for that series, produced only by a successful fetch.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a tracked series.
///
/// Cheap to clone; the underlying string is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey(Arc<str>);

impl SeriesKey {
    /// Create a key from any string-like value.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SeriesKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl Serialize for SeriesKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SeriesKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// One timestamped observation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock instant (UTC) at which the value was observed.
    pub timestamp: DateTime<Utc>,
    /// Observed value.
    pub value: f64,
}

impl Sample {
    /// Create a sample at an explicit instant.
    pub const fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Create a sample stamped with the current UTC time.
    pub fn now(value: f64) -> Self {
        Self::new(Utc::now(), value)
    }
}

//! Metrics and Monitoring Adapters
//!
//! Prometheus metrics for the polling engine and the /live, /ready,
//! /metrics endpoints served via axum 0.7.

pub mod health;
pub mod prometheus;

pub use health::{HealthServer, HealthState};
pub use prometheus::MetricsRegistry;

//! Ticker Poller — Library Root
//!
//! Concurrent multi-series quote polling engine: one independent
//! poller per series, per-series pause/resume, bounded exponential
//! backoff, ordered provider fallback, fixed-capacity sample buffers
//! and cooperative, bounded shutdown.
//!
//! Re-exports all modules for integration tests and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;

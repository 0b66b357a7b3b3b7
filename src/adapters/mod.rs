//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, metrics export).
//!
//! Adapter categories:
//! - `quotes`: JSON REST quote providers and field extraction
//! - `metrics`: Prometheus metrics export and health checks

pub mod metrics;
pub mod quotes;

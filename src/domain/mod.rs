//! Domain layer - Series samples, bounded buffers and backoff.
//!
//! Pure data structures with no I/O or runtime dependency.
//! Everything here is testable in isolation.

pub mod backoff;
pub mod buffer;
pub mod sample;

// Re-export core types for convenience
pub use backoff::BackoffState;
pub use buffer::{DEFAULT_CAPACITY, SampleBuffer};
pub use sample::{Sample, SeriesKey};

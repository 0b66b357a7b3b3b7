//! Fixed-capacity, time-ordered sample buffer.
//!
//! Written by exactly one series poller, read by any number of
//! snapshot callers. Appends take the write side of a std `RwLock`
//! and readers share the read side, so a snapshot never observes a
//! half-applied append and never holds the writer for longer than one
//! copy.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use super::sample::Sample;

/// Default number of samples kept per series.
pub const DEFAULT_CAPACITY: usize = 300;

/// Bounded FIFO of samples, oldest first.
#[derive(Debug)]
pub struct SampleBuffer {
    /// Maximum number of samples retained.
    capacity: usize,
    /// Samples in insertion order.
    samples: RwLock<VecDeque<Sample>>,
}

impl SampleBuffer {
    /// Create an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of samples this buffer retains.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample as the newest element, evicting the oldest one
    /// first when the buffer is full.
    pub fn append(&self, sample: Sample) {
        let mut samples = self.samples.write().unwrap_or_else(PoisonError::into_inner);
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Ordered copy of the current contents (oldest to newest).
    pub fn snapshot(&self) -> Vec<Sample> {
        let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
        samples.iter().copied().collect()
    }

    /// Newest sample, if any.
    pub fn latest(&self) -> Option<Sample> {
        let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
        samples.back().copied()
    }

    /// Current number of samples.
    pub fn len(&self) -> usize {
        self.samples.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no sample has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that the sample buffer and backoff
//! state keep their invariants across random inputs.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use ticker_poller::domain::{BackoffState, Sample, SampleBuffer};

fn sample(i: usize, value: f64) -> Sample {
    Sample::new(Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(), value)
}

// ── Sample Buffer Properties ────────────────────────────────

proptest! {
    /// Length never exceeds capacity, whatever the append count.
    #[test]
    fn buffer_length_bounded_by_capacity(
        capacity in 1usize..64,
        values in prop::collection::vec(-1e6f64..1e6, 0..256),
    ) {
        let buffer = SampleBuffer::new(capacity);
        for (i, v) in values.iter().enumerate() {
            buffer.append(sample(i, *v));
            prop_assert!(buffer.len() <= capacity);
        }
        prop_assert_eq!(buffer.len(), values.len().min(capacity));
    }

    /// Once full, each append evicts exactly the oldest element.
    #[test]
    fn buffer_evicts_exactly_oldest(
        capacity in 1usize..32,
        extra in 1usize..32,
    ) {
        let buffer = SampleBuffer::new(capacity);
        for i in 0..capacity {
            buffer.append(sample(i, i as f64));
        }
        for i in capacity..capacity + extra {
            let before = buffer.snapshot();
            buffer.append(sample(i, i as f64));
            let after = buffer.snapshot();
            prop_assert_eq!(after.len(), capacity);
            prop_assert_eq!(&after[..capacity - 1], &before[1..]);
            prop_assert_eq!(after[capacity - 1].value, i as f64);
        }
    }

    /// Snapshots keep insertion order (oldest to newest).
    #[test]
    fn buffer_snapshot_is_time_ordered(
        capacity in 1usize..64,
        count in 0usize..200,
    ) {
        let buffer = SampleBuffer::new(capacity);
        for i in 0..count {
            buffer.append(sample(i, i as f64));
        }
        let snap = buffer.snapshot();
        prop_assert!(snap.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}

// ── Backoff Properties ──────────────────────────────────────

proptest! {
    /// Delays double on each failure and saturate at the ceiling.
    #[test]
    fn backoff_doubles_until_capped(
        base_ms in 1u64..5_000,
        factor in 1u64..64,
        failures in 1usize..40,
    ) {
        let base = Duration::from_millis(base_ms);
        let max = Duration::from_millis(base_ms * factor);
        let mut backoff = BackoffState::new(base, max);

        let mut expected = base;
        for _ in 0..failures {
            let delay = backoff.on_failure();
            prop_assert_eq!(delay, expected.min(max));
            prop_assert!(backoff.current() >= base && backoff.current() <= max);
            expected = (expected * 2).min(max);
        }
    }

    /// One success resets to base regardless of history.
    #[test]
    fn backoff_success_resets(
        base_ms in 1u64..5_000,
        factor in 1u64..64,
        failures in 0usize..40,
    ) {
        let base = Duration::from_millis(base_ms);
        let mut backoff = BackoffState::new(base, Duration::from_millis(base_ms * factor));
        for _ in 0..failures {
            backoff.on_failure();
        }
        backoff.on_success();
        prop_assert_eq!(backoff.current(), base);
        prop_assert_eq!(backoff.on_failure(), base);
    }
}

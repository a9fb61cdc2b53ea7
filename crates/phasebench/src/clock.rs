use std::time::Instant;

/// Failure modes of the monotonic counter backing a [`Clock`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("monotonic counter reports a frequency of zero ticks per second")]
    ZeroFrequency,
    #[error("monotonic counter could not be read: {0}")]
    Unreadable(String),
}

/// Abstraction over a free-running high resolution counter.
///
/// Implementations report raw ticks; the counter is allowed to wrap once it
/// passes [`TickSource::max_ticks`].
pub trait TickSource: Send {
    /// Ticks per second. Queried once when the owning [`Clock`] is built.
    fn frequency(&self) -> u64;
    /// Reads the current raw counter value.
    fn ticks(&self) -> Result<u64, ClockError>;
    /// Largest value the counter reaches before rolling over.
    fn max_ticks(&self) -> u64 {
        u64::MAX
    }
}

/// Convenient alias for owning tick sources behind trait objects.
pub type BoxedTickSource = Box<dyn TickSource>;

const NANOS_PER_SECOND: u64 = 1_000_000_000;
const MICROS_PER_SECOND: u128 = 1_000_000;

/// Nanosecond counter anchored at the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTicks {
    origin: Instant,
}

impl MonotonicTicks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for MonotonicTicks {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TickSource for MonotonicTicks {
    fn frequency(&self) -> u64 {
        NANOS_PER_SECOND
    }

    fn ticks(&self) -> Result<u64, ClockError> {
        // Truncation wraps the same way a 64-bit hardware counter would.
        Ok(self.origin.elapsed().as_nanos() as u64)
    }
}

/// A raw counter reading together with the counter's cached characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    ticks: u64,
    frequency: u64,
    max_ticks: u64,
}

impl ClockSample {
    /// Builds a sample from raw parts, mainly for simulated timelines.
    pub fn from_parts(ticks: u64, frequency: u64, max_ticks: u64) -> Self {
        Self {
            ticks: ticks.min(max_ticks),
            frequency,
            max_ticks,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Microseconds elapsed between `earlier` and this sample.
    pub fn elapsed_micros_since(&self, earlier: ClockSample) -> u64 {
        elapsed_microseconds(*self, earlier)
    }

    /// Returns the sample `micros` later, rolling over past `max_ticks`.
    pub fn offset_micros(self, micros: u64) -> Self {
        let range = u128::from(self.max_ticks) + 1;
        let delta = u128::from(micros) * u128::from(self.frequency) / MICROS_PER_SECOND;
        let ticks = (u128::from(self.ticks) + delta) % range;
        Self {
            ticks: ticks as u64,
            ..self
        }
    }
}

/// Elapsed microseconds from `earlier` to `later`.
///
/// A later reading that is numerically smaller than the earlier one is treated
/// as a single counter rollover: `(max - earlier) + later` ticks have passed.
pub fn elapsed_microseconds(later: ClockSample, earlier: ClockSample) -> u64 {
    let elapsed_ticks = if later.ticks >= earlier.ticks {
        later.ticks - earlier.ticks
    } else {
        later.max_ticks - earlier.ticks + later.ticks
    };
    let frequency = u128::from(later.frequency.max(1));
    let micros = u128::from(elapsed_ticks) * MICROS_PER_SECOND / frequency;
    u64::try_from(micros).unwrap_or(u64::MAX)
}

/// Monotonic clock with a frequency cached for the process lifetime.
pub struct Clock {
    source: BoxedTickSource,
    frequency: u64,
    max_ticks: u64,
}

impl Clock {
    /// Wraps `source`, caching its frequency and range.
    pub fn new(source: impl TickSource + 'static) -> Result<Self, ClockError> {
        let frequency = source.frequency();
        if frequency == 0 {
            return Err(ClockError::ZeroFrequency);
        }
        let max_ticks = source.max_ticks();
        tracing::debug!(frequency, max_ticks, "monotonic clock ready");
        Ok(Self {
            source: Box::new(source),
            frequency,
            max_ticks,
        })
    }

    /// Clock backed by the platform monotonic counter.
    pub fn monotonic() -> Result<Self, ClockError> {
        Self::new(MonotonicTicks::new())
    }

    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn now(&self) -> Result<ClockSample, ClockError> {
        let ticks = self.source.ticks()?;
        Ok(ClockSample::from_parts(ticks, self.frequency, self.max_ticks))
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("frequency", &self.frequency)
            .field("max_ticks", &self.max_ticks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct ManualTicks {
        value: Arc<AtomicU64>,
        frequency: u64,
        max_ticks: u64,
    }

    impl TickSource for ManualTicks {
        fn frequency(&self) -> u64 {
            self.frequency
        }

        fn ticks(&self) -> Result<u64, ClockError> {
            Ok(self.value.load(Ordering::SeqCst))
        }

        fn max_ticks(&self) -> u64 {
            self.max_ticks
        }
    }

    struct BrokenTicks;

    impl TickSource for BrokenTicks {
        fn frequency(&self) -> u64 {
            1_000
        }

        fn ticks(&self) -> Result<u64, ClockError> {
            Err(ClockError::Unreadable("counter offline".into()))
        }
    }

    fn sample(ticks: u64, frequency: u64) -> ClockSample {
        ClockSample::from_parts(ticks, frequency, u64::MAX)
    }

    #[test]
    fn forward_elapsed_scales_by_frequency() {
        let earlier = sample(1_000, 10_000_000);
        let later = sample(21_000, 10_000_000);
        assert_eq!(elapsed_microseconds(later, earlier), 2_000);
    }

    #[test]
    fn rollover_uses_full_counter_range() {
        let start = u64::MAX - 10;
        let now = 5;
        let elapsed = elapsed_microseconds(sample(now, 1_000_000), sample(start, 1_000_000));
        assert_eq!(elapsed, (u64::MAX - start) + now);
    }

    #[test]
    fn rollover_on_narrow_counter() {
        let max = u64::from(u32::MAX);
        let earlier = ClockSample::from_parts(max - 999, 1_000, max);
        let later = ClockSample::from_parts(1_000, 1_000, max);
        // 999 ticks to the top plus 1000 after the wrap, at 1 kHz.
        assert_eq!(later.elapsed_micros_since(earlier), 1_999_000);
    }

    #[test]
    fn large_spans_do_not_overflow() {
        let elapsed = elapsed_microseconds(sample(u64::MAX, 1), sample(0, 1));
        assert_eq!(elapsed, u64::MAX);
    }

    #[test]
    fn offset_wraps_past_counter_maximum() {
        let max = 1_000_000u64;
        let base = ClockSample::from_parts(max - 100, 1_000_000, max);
        let shifted = base.offset_micros(300);
        assert_eq!(shifted.ticks(), 199);
        assert_eq!(shifted.elapsed_micros_since(base), 299);
    }

    #[test]
    fn clock_reads_source_and_caches_frequency() {
        let value = Arc::new(AtomicU64::new(42));
        let clock = Clock::new(ManualTicks {
            value: value.clone(),
            frequency: 1_000,
            max_ticks: u64::MAX,
        })
        .unwrap();
        assert_eq!(clock.frequency(), 1_000);
        let first = clock.now().unwrap();
        value.store(1_042, Ordering::SeqCst);
        let second = clock.now().unwrap();
        assert_eq!(second.elapsed_micros_since(first), 1_000_000);
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let err = Clock::new(ManualTicks {
            value: Arc::new(AtomicU64::new(0)),
            frequency: 0,
            max_ticks: u64::MAX,
        })
        .unwrap_err();
        assert_eq!(err, ClockError::ZeroFrequency);
    }

    #[test]
    fn unreadable_counter_surfaces_error() {
        let clock = Clock::new(BrokenTicks).unwrap();
        assert!(matches!(clock.now(), Err(ClockError::Unreadable(_))));
    }

    #[test]
    fn monotonic_clock_moves_forward() {
        let clock = Clock::monotonic().unwrap();
        let first = clock.now().unwrap();
        let second = clock.now().unwrap();
        assert!(second.ticks() >= first.ticks());
    }
}

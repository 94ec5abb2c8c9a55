use rand::Rng;
use std::time::Duration;

/// Randomized pause between two submissions
///
/// The sleep happens on the submitting thread, so it throttles how fast
/// requests are handed to the pool rather than how fast they complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    /// Creates a range, swapping the bounds if given in the wrong order
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    /// A range that never sleeps
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn is_none(&self) -> bool {
        self.max.is_zero()
    }

    /// Picks a duration uniformly within the range
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Blocks the current thread for a sampled duration
    pub fn sleep(&self) {
        if self.is_none() {
            return;
        }
        let pause = self.sample();
        tracing::trace!("Sleeping {:?} before next request", pause);
        std::thread::sleep(pause);
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::from_millis(500, 1000)
    }
}

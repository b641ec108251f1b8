//! Randomised wait between retries

use rand::Rng;
use std::time::Duration;

/// Uniformly random wait drawn from `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffWindow {
    min: Duration,
    max: Duration,
}

impl BackoffWindow {
    /// Create a window; bounds given in the wrong order are swapped
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A window that never waits
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw the next wait
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let nanos = rand::thread_rng().gen_range(self.min.as_nanos()..=self.max.as_nanos());
        Duration::from_nanos(nanos as u64)
    }
}

use std::time::Duration;

use monitor_core::{MonitorError, Result};
use rand::Rng;

/// Randomised delay between poll cycles, drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(MonitorError::Config(format!(
                "jitter min {min:?} exceeds max {max:?}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let ms = rng.gen_range(millis(self.min)..=millis(self.max));
        Duration::from_millis(ms).clamp(self.min, self.max)
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

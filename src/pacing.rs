//! Randomized pacing for scrolling and waits.
//!
//! Scroll distances, inter-scroll delays and the user agent are drawn from a
//! [`RandomSource`] so tests can script them. Production code uses
//! [`ThreadRandom`].

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Source of uniformly distributed integers.
pub trait RandomSource: Send + Sync {
    /// Value in `low..high`. Returns `low` when the range is empty.
    fn next_in_range(&self, low: u64, high: u64) -> u64;
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_in_range(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::rng().random_range(low..high)
    }
}

/// Bounds for scroll distance and settle delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Minimum scroll distance in pixels (inclusive).
    pub scroll_min: u32,
    /// Maximum scroll distance in pixels (exclusive).
    pub scroll_max: u32,
    /// Minimum wait after a scroll, in milliseconds (inclusive).
    pub delay_min_ms: u64,
    /// Maximum wait after a scroll, in milliseconds (exclusive).
    pub delay_max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            scroll_min: 500,
            scroll_max: 1500,
            delay_min_ms: 3500,
            delay_max_ms: 12500,
        }
    }
}

impl PacingConfig {
    /// Both ranges must be non-empty; a fixed delay is a detectable pattern.
    pub fn validate(&self) -> Result<(), String> {
        if self.scroll_min >= self.scroll_max {
            return Err(format!(
                "scroll_min ({}) must be less than scroll_max ({})",
                self.scroll_min, self.scroll_max
            ));
        }
        if self.delay_min_ms >= self.delay_max_ms {
            return Err(format!(
                "delay_min_ms ({}) must be less than delay_max_ms ({})",
                self.delay_min_ms, self.delay_max_ms
            ));
        }
        Ok(())
    }
}

/// Draws scroll offsets and delays from a random source.
pub struct Pacer<'a> {
    config: PacingConfig,
    rng: &'a dyn RandomSource,
}

impl<'a> Pacer<'a> {
    pub fn new(config: PacingConfig, rng: &'a dyn RandomSource) -> Self {
        Self { config, rng }
    }

    pub fn scroll_offset(&self) -> u32 {
        self.rng
            .next_in_range(self.config.scroll_min as u64, self.config.scroll_max as u64)
            as u32
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(
            self.rng
                .next_in_range(self.config.delay_min_ms, self.config.delay_max_ms),
        )
    }
}

/// Random source that replays a fixed sequence, clamped into the requested
/// range. Cycles when exhausted.
#[cfg(test)]
pub(crate) struct ScriptedRandom {
    values: Vec<u64>,
    cursor: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedRandom {
    pub(crate) fn new(values: Vec<u64>) -> Self {
        Self {
            values,
            cursor: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn next_in_range(&self, low: u64, high: u64) -> u64 {
        if self.values.is_empty() || low >= high {
            return low;
        }
        let idx = self
            .cursor
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % self.values.len();
        self.values[idx].clamp(low, high - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_stays_in_range() {
        let rng = ThreadRandom;
        for _ in 0..200 {
            let v = rng.next_in_range(3500, 12500);
            assert!((3500..12500).contains(&v));
        }
        assert_eq!(rng.next_in_range(7, 7), 7);
    }

    #[test]
    fn test_pacer_uses_source() {
        let rng = ScriptedRandom::new(vec![900, 4000]);
        let pacer = Pacer::new(PacingConfig::default(), &rng);
        assert_eq!(pacer.scroll_offset(), 900);
        assert_eq!(pacer.settle_delay(), Duration::from_millis(4000));
    }

    #[test]
    fn test_scripted_values_are_clamped() {
        let rng = ScriptedRandom::new(vec![0, u64::MAX]);
        let pacer = Pacer::new(PacingConfig::default(), &rng);
        assert_eq!(pacer.scroll_offset(), 500);
        assert_eq!(pacer.settle_delay(), Duration::from_millis(12499));
    }

    #[test]
    fn test_validate_rejects_fixed_delay() {
        let config = PacingConfig {
            delay_min_ms: 5000,
            delay_max_ms: 5000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(PacingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_scroll() {
        let config = PacingConfig {
            scroll_min: 2000,
            scroll_max: 1000,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("scroll_min"));
    }
}

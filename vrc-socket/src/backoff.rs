//! Reconnect delay schedule.

use std::time::Duration;

use vrc_core::config::StreamConfig;

/// Exponential backoff between consecutive failed dials.
///
/// The first retry waits `base`; every failed dial multiplies the delay by
/// `multiplier`, clamped to `max`. A successful dial resets it to `base`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    multiplier: u32,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, multiplier: u32) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            multiplier: multiplier.max(1),
            current: base,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.base_delay(), config.max_delay(), config.multiplier)
    }

    /// Delay before the next attempt.
    pub fn delay(&self) -> Duration {
        self.current
    }

    /// Grow the delay after a failed dial and return the new value.
    pub fn record_failure(&mut self) -> Duration {
        self.current = self
            .current
            .checked_mul(self.multiplier)
            .map_or(self.max, |next| next.min(self.max));
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&StreamConfig::default())
    }
}

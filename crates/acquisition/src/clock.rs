//! Local system clock.
//!
//! Seconds since the first call in this process, from a monotonic source.
//! Every buffer's filtered timestamps live in this domain.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic process time in seconds
pub fn system_time() -> f64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Simulated device clock with a constant offset and a linear drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceClock {
    /// Device time at system time zero (seconds)
    pub offset: f64,
    /// Relative rate error, parts per million
    pub drift_ppm: f64,
}

impl DeviceClock {
    pub const IDEAL: Self = Self {
        offset: 0.0,
        drift_ppm: 0.0,
    };

    /// Device reading for a given system time
    pub fn at(&self, system_time: f64) -> f64 {
        self.offset + system_time * (1.0 + self.drift_ppm * 1e-6)
    }

    pub fn now(&self) -> f64 {
        self.at(system_time())
    }
}

impl Default for DeviceClock {
    fn default() -> Self {
        Self::IDEAL
    }
}

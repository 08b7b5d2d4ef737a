//! Timestamp filtering.
//!
//! Turns the raw timing of an acquisition into a filtered, system-clock
//! aligned timestamp. Three strategies, selected by [`FilterMode`]:
//!
//! - `None`: receive time plus local offset
//! - `FrameRegression`: least-squares line of receive time over frame number
//!   across the last `averaged_items` samples, evaluated at the newest frame.
//!   Removes the jitter of the host receiving the frames.
//! - `ClockDrift`: Kalman estimate of the device-to-host clock offset, applied
//!   to the device timestamp

use contracts::{FilterMode, TimestampFilterConfig, TimingSample};
use nalgebra::{Matrix2, Vector2};
use ringbuf::{traits::*, HeapRb};

use crate::kalman::ClockDriftEstimator;

/// Samples required before a regression line is trusted
const MIN_REGRESSION_SAMPLES: usize = 3;

/// Output of one filter step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredTimestamp {
    /// Timestamp to store as `filtered_timestamp`
    pub filtered: f64,

    /// Filtered minus raw estimate (seconds); 0 when no model was applied
    pub residual: f64,

    /// Current clock offset estimate (`ClockDrift` only)
    pub clock_offset: Option<f64>,

    /// The regression rejected this sample as an outlier and restarted
    pub window_reset: bool,
}

impl FilteredTimestamp {
    fn raw(filtered: f64) -> Self {
        Self {
            filtered,
            residual: 0.0,
            clock_offset: None,
            window_reset: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RegressionSample {
    frame: i64,
    receive_time: f64,
}

/// Per-buffer timestamp filter state.
pub struct TimestampFilter {
    config: TimestampFilterConfig,
    window: HeapRb<RegressionSample>,
    last: Option<(i64, f64)>,
    clock: ClockDriftEstimator,
}

impl std::fmt::Debug for TimestampFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampFilter")
            .field("mode", &self.config.mode)
            .field("window", &self.window.occupied_len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for TimestampFilter {
    fn default() -> Self {
        Self::new(TimestampFilterConfig::default())
    }
}

impl TimestampFilter {
    pub fn new(config: TimestampFilterConfig) -> Self {
        Self {
            window: HeapRb::new(config.averaged_items.max(MIN_REGRESSION_SAMPLES)),
            last: None,
            clock: ClockDriftEstimator::new(&config.clock),
            config,
        }
    }

    pub fn config(&self) -> &TimestampFilterConfig {
        &self.config
    }

    /// Replace the configuration and drop all accumulated state
    pub fn set_config(&mut self, config: TimestampFilterConfig) {
        *self = Self::new(config);
    }

    /// Drop accumulated state, keeping the configuration
    pub fn reset(&mut self) {
        self.window.clear();
        self.last = None;
        self.clock = ClockDriftEstimator::new(&self.config.clock);
    }

    /// Number of samples in the regression window
    pub fn window_len(&self) -> usize {
        self.window.occupied_len()
    }

    /// Filter one acquisition.
    ///
    /// `local_time_offset` is the buffer's configured additive offset and is
    /// applied in every mode. A repeated frame number yields the previous
    /// output unchanged, so re-delivered frames collide in the buffer instead
    /// of disturbing the filter state.
    pub fn filter(&mut self, sample: &TimingSample, local_time_offset: f64) -> FilteredTimestamp {
        if let (Some(frame), Some((last_frame, last_filtered))) =
            (sample.frame_number, self.last)
        {
            if frame == last_frame {
                return FilteredTimestamp::raw(last_filtered);
            }
        }

        let out = match self.config.mode {
            FilterMode::None => FilteredTimestamp::raw(sample.receive_time + local_time_offset),
            FilterMode::FrameRegression => self.regress(sample, local_time_offset),
            FilterMode::ClockDrift => {
                let observation = sample.receive_time - sample.unfiltered;
                let innovation = self.clock.update(observation, sample.unfiltered);
                let offset = self.clock.offset();
                FilteredTimestamp {
                    filtered: sample.unfiltered + offset + local_time_offset,
                    residual: innovation,
                    clock_offset: Some(offset),
                    window_reset: false,
                }
            }
        };
        if let Some(frame) = sample.frame_number {
            self.last = Some((frame, out.filtered));
        }
        out
    }

    fn regress(&mut self, sample: &TimingSample, local_time_offset: f64) -> FilteredTimestamp {
        let raw = FilteredTimestamp::raw(sample.receive_time + local_time_offset);
        let Some(frame) = sample.frame_number else {
            return raw;
        };

        if self.last.is_some_and(|(last, _)| frame < last) {
            self.window.clear();
        }
        self.window.push_overwrite(RegressionSample {
            frame,
            receive_time: sample.receive_time,
        });

        if self.window.occupied_len() < MIN_REGRESSION_SAMPLES {
            return raw;
        }
        let Some(fitted) = self.fit_at(frame) else {
            return raw;
        };

        let residual = fitted - sample.receive_time;
        if residual.abs() > self.config.max_allowed_deviation_s {
            self.window.clear();
            self.window.push_overwrite(RegressionSample {
                frame,
                receive_time: sample.receive_time,
            });
            return FilteredTimestamp {
                residual,
                window_reset: true,
                ..raw
            };
        }

        FilteredTimestamp {
            filtered: fitted + local_time_offset,
            residual,
            clock_offset: None,
            window_reset: false,
        }
    }

    /// Evaluate the least-squares line through the window at `frame`.
    ///
    /// Frame numbers are centered on `frame` so the normal equations stay
    /// well conditioned for large counters.
    fn fit_at(&self, frame: i64) -> Option<f64> {
        let (mut sx, mut sxx, mut sy, mut sxy) = (0.0, 0.0, 0.0, 0.0);
        let n = self.window.occupied_len() as f64;
        for s in self.window.iter() {
            let x = (s.frame - frame) as f64;
            sx += x;
            sxx += x * x;
            sy += s.receive_time;
            sxy += x * s.receive_time;
        }

        let normal = Matrix2::new(n, sx, sx, sxx);
        if normal.determinant().abs() < f64::EPSILON {
            return None;
        }
        let coefficients = normal.try_inverse()? * Vector2::new(sy, sxy);
        let intercept = coefficients[0];
        intercept.is_finite().then_some(intercept)
    }
}

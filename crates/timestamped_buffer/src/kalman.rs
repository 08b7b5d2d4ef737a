//! Device clock offset estimation.
//!
//! Two-state Kalman filter over `x = [offset, drift]^T` where `offset` is
//! `receive_time - device_time` and `drift` its first-order rate of change.
//! Measurement noise follows an EWMA of squared innovations, clamped to one
//! decade around the configured baseline.

use contracts::ClockEstimatorConfig;
use nalgebra::{Matrix2, RowVector2, Vector2};
use ringbuf::{traits::*, HeapRb};

const MIN_DT: f64 = 1e-3;
const DEFAULT_INTERVAL: f64 = 0.05;
const EWMA_ALPHA: f64 = 0.85;

/// Offset/drift estimator for one device clock.
///
/// Transition `F = [[1, dt], [0, 1]]`, observation `H = [1, 0]`.
pub struct ClockDriftEstimator {
    state: Vector2<f64>,
    covariance: Matrix2<f64>,
    q_offset: f64,
    q_drift: f64,
    base_r: f64,
    r: f64,
    ewma_variance: f64,
    expected_interval: f64,
    last_device_time: Option<f64>,
    residuals: HeapRb<f64>,
}

impl std::fmt::Debug for ClockDriftEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockDriftEstimator")
            .field("offset", &self.offset())
            .field("drift", &self.drift())
            .field("r", &self.r)
            .finish()
    }
}

impl ClockDriftEstimator {
    pub fn new(config: &ClockEstimatorConfig) -> Self {
        let base_r = config.measurement_noise.max(1e-9);
        Self {
            state: Vector2::new(config.initial_offset, 0.0),
            covariance: Matrix2::identity(),
            q_offset: config.process_noise.max(1e-9),
            q_drift: (config.process_noise * 0.1).max(1e-9),
            base_r,
            r: base_r,
            ewma_variance: base_r,
            expected_interval: config
                .expected_interval
                .unwrap_or(DEFAULT_INTERVAL)
                .max(MIN_DT),
            last_device_time: None,
            residuals: HeapRb::new(config.residual_window.max(3)),
        }
    }

    /// Feed one observation of `receive_time - device_time`.
    ///
    /// The first observation seeds the offset. After that `device_time`
    /// drives the prediction interval; a non-advancing device clock falls
    /// back to the expected interval. Returns the innovation.
    pub fn update(&mut self, observation: f64, device_time: f64) -> f64 {
        let Some(last) = self.last_device_time else {
            // first observation seeds the offset
            let innovation = observation - self.state[0];
            self.state[0] = observation;
            self.last_device_time = Some(device_time);
            self.residuals.push_overwrite(innovation);
            return innovation;
        };

        let dt = if device_time.is_finite() && device_time > last {
            device_time - last
        } else {
            self.expected_interval
        }
        .max(MIN_DT);
        self.last_device_time = Some(device_time);

        // predict
        let f = Matrix2::new(1.0, dt, 0.0, 1.0);
        let q = Matrix2::new(self.q_offset, 0.0, 0.0, self.q_drift);
        let state = f * self.state;
        let covariance = f * self.covariance * f.transpose() + q;

        // update
        let h = RowVector2::new(1.0, 0.0);
        let innovation = observation - (h * state)[0];
        let s = (h * covariance * h.transpose())[0] + self.r;
        let gain: Vector2<f64> = covariance * h.transpose() / s;

        self.state = state + gain * innovation;
        self.covariance = (Matrix2::identity() - gain * h) * covariance;
        self.covariance[(0, 0)] = self.covariance[(0, 0)].max(0.0);
        self.covariance[(1, 1)] = self.covariance[(1, 1)].max(0.0);

        self.residuals.push_overwrite(innovation);
        self.ewma_variance =
            EWMA_ALPHA * self.ewma_variance + (1.0 - EWMA_ALPHA) * innovation.powi(2);
        self.r = self
            .ewma_variance
            .clamp(self.base_r * 0.1, self.base_r * 10.0);

        innovation
    }

    /// Current offset estimate (seconds)
    #[inline]
    pub fn offset(&self) -> f64 {
        self.state[0]
    }

    /// Current drift estimate (seconds per second)
    #[inline]
    pub fn drift(&self) -> f64 {
        self.state[1]
    }

    /// Variance of the offset component
    pub fn uncertainty(&self) -> f64 {
        self.covariance[(0, 0)]
    }

    /// Root mean square of the recent innovations
    pub fn residual_rms(&self) -> Option<f64> {
        let n = self.residuals.occupied_len();
        if n == 0 {
            return None;
        }
        let sum: f64 = self.residuals.iter().map(|r| r * r).sum();
        Some((sum / n as f64).sqrt())
    }
}

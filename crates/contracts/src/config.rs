//! AcquisitionConfig - Config Loader output
//!
//! Describes every device, the buffer behind it and how its timestamps are
//! filtered.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{FrameFormat, SourceId};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete acquisition setup
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AcquisitionConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Devices, each owning one buffer (trackers: one buffer per tool)
    #[validate(nested)]
    pub devices: Vec<DeviceConfig>,
}

/// One acquisition device
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeviceConfig {
    /// Device id, also used as buffer id prefix
    #[validate(custom(function = "validate_source_id"))]
    pub id: SourceId,

    /// Nominal acquisition rate (Hz)
    #[validate(range(exclusive_min = 0.0))]
    pub rate_hz: f64,

    /// Device specific settings
    pub kind: DeviceKind,

    #[serde(default)]
    #[validate(nested)]
    pub buffer: BufferConfig,

    #[serde(default)]
    #[validate(nested)]
    pub filter: TimestampFilterConfig,
}

/// Device variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceKind {
    /// Imaging device producing fixed-format frames
    Video {
        format: FrameFormat,
        /// Extra bytes at the end of every source row
        #[serde(default)]
        row_padding: usize,
        /// Header bytes in front of every source frame
        #[serde(default)]
        skip_bytes: usize,
    },

    /// Pose tracker producing one transform per tool
    Tracker {
        /// Reference coordinate frame (e.g. "Tracker")
        reference: SourceId,
        /// Tracked tool names
        tools: Vec<SourceId>,
    },
}

impl DeviceKind {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Video { .. } => "video",
            DeviceKind::Tracker { .. } => "tracker",
        }
    }
}

/// Circular buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BufferConfig {
    /// Number of slots
    #[validate(range(min = 1))]
    pub capacity: usize,

    /// Additive correction applied to filtered timestamps (seconds)
    #[serde(default)]
    pub local_time_offset: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 150,
            local_time_offset: 0.0,
        }
    }
}

/// Timestamp filtering strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Use the receive time as is
    None,
    /// Line fit of receive time over frame number
    #[default]
    FrameRegression,
    /// Kalman estimate of device-to-system clock offset and drift
    ClockDrift,
}

/// Timestamp filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TimestampFilterConfig {
    pub mode: FilterMode,

    /// Regression window length (items)
    #[validate(range(min = 2))]
    pub averaged_items: usize,

    /// Largest accepted gap between filtered and raw time before the
    /// filter is reset (seconds)
    #[validate(range(min = 0.0))]
    pub max_allowed_deviation_s: f64,

    #[validate(nested)]
    pub clock: ClockEstimatorConfig,
}

impl Default for TimestampFilterConfig {
    fn default() -> Self {
        Self {
            mode: FilterMode::default(),
            averaged_items: 20,
            max_allowed_deviation_s: 0.5,
            clock: ClockEstimatorConfig::default(),
        }
    }
}

/// Clock offset/drift Kalman filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClockEstimatorConfig {
    /// Initial offset estimate (seconds)
    pub initial_offset: f64,
    /// Process noise (Q)
    #[validate(range(min = 0.0))]
    pub process_noise: f64,
    /// Measurement noise (R)
    #[validate(range(min = 0.0))]
    pub measurement_noise: f64,
    /// Residual history length kept for diagnostics
    pub residual_window: usize,
    /// Expected sample interval (seconds), used when Δt is unusable
    pub expected_interval: Option<f64>,
}

impl Default for ClockEstimatorConfig {
    fn default() -> Self {
        Self {
            initial_offset: 0.0,
            process_noise: 0.0001,
            measurement_noise: 0.001,
            residual_window: 20,
            expected_interval: None,
        }
    }
}

fn validate_source_id(id: &SourceId) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::new("empty_id"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_device(capacity: usize) -> DeviceConfig {
        DeviceConfig {
            id: "probe".into(),
            rate_hz: 30.0,
            kind: DeviceKind::Video {
                format: FrameFormat::planar(8, 8, 8),
                row_padding: 0,
                skip_bytes: 0,
            },
            buffer: BufferConfig {
                capacity,
                local_time_offset: 0.0,
            },
            filter: TimestampFilterConfig::default(),
        }
    }

    #[test]
    fn test_defaults() {
        let filter = TimestampFilterConfig::default();
        assert_eq!(filter.mode, FilterMode::FrameRegression);
        assert_eq!(filter.averaged_items, 20);
        assert_eq!(BufferConfig::default().capacity, 150);
    }

    #[test]
    fn test_zero_capacity_fails_validation() {
        assert!(video_device(10).validate().is_ok());
        assert!(video_device(0).validate().is_err());
    }

    #[test]
    fn test_empty_id_fails_validation() {
        let mut device = video_device(10);
        device.id = "  ".into();
        assert!(device.validate().is_err());
    }

    #[test]
    fn test_device_kind_serde_tag() {
        let kind = DeviceKind::Tracker {
            reference: "Tracker".into(),
            tools: vec!["Probe".into()],
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"type\":\"tracker\""));
        let back: DeviceKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }
}

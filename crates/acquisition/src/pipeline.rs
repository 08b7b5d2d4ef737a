//! Acquisition pipeline: devices and the buffers they fill, built from
//! configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{
    Acquirable, AcquisitionConfig, BufferStats, DeviceConfig, DeviceKind, SourceId,
    TransformChannel,
};
use timestamped_buffer::{TrackerBuffer, VideoBuffer};
use tracing::{debug, info, instrument, warn};

use crate::cursor::ItemCursor;
use crate::error::{AcquisitionError, Result};
use crate::metrics::AcquisitionMetrics;
use crate::mock::{MockBehavior, MockTrackerDevice, MockVideoDevice};

/// Owns every device and buffer of one acquisition setup.
///
/// Video buffers are named after their device; tracker buffers after their
/// channel (`ProbeToTracker`). Dropping the pipeline stops all devices.
pub struct AcquisitionPipeline {
    devices: Vec<Box<dyn Acquirable>>,
    video: BTreeMap<SourceId, Arc<VideoBuffer>>,
    trackers: BTreeMap<SourceId, Arc<TrackerBuffer>>,
    metrics: Arc<AcquisitionMetrics>,
}

impl AcquisitionPipeline {
    /// Build mock devices with default behavior
    pub fn from_config(config: &AcquisitionConfig) -> Result<Self> {
        Self::with_behavior(config, MockBehavior::default())
    }

    #[instrument(name = "pipeline_build", skip_all, fields(devices = config.devices.len()))]
    pub fn with_behavior(config: &AcquisitionConfig, behavior: MockBehavior) -> Result<Self> {
        let mut pipeline = Self {
            devices: Vec::with_capacity(config.devices.len()),
            video: BTreeMap::new(),
            trackers: BTreeMap::new(),
            metrics: Arc::new(AcquisitionMetrics::new()),
        };
        for device in &config.devices {
            pipeline.add_device(device, behavior.clone())?;
        }
        info!(
            devices = pipeline.devices.len(),
            video_buffers = pipeline.video.len(),
            tracker_buffers = pipeline.trackers.len(),
            "Acquisition pipeline built"
        );
        Ok(pipeline)
    }

    fn add_device(&mut self, config: &DeviceConfig, behavior: MockBehavior) -> Result<()> {
        let counters = self.metrics.device(&config.id);
        match &config.kind {
            DeviceKind::Video { format, .. } => {
                self.check_free(&config.id, &config.id)?;
                let buffer = VideoBuffer::from_config(
                    config.id.clone(),
                    *format,
                    &config.buffer,
                    &config.filter,
                )
                .map_err(|e| AcquisitionError::buffer(&config.id, e))?;
                let buffer = Arc::new(buffer);
                let device = MockVideoDevice::new(config.clone(), buffer.clone(), counters)?
                    .with_behavior(behavior);
                self.video.insert(config.id.clone(), buffer);
                self.devices.push(Box::new(device));
            }
            DeviceKind::Tracker { reference, tools } => {
                let mut buffers = Vec::with_capacity(tools.len());
                for tool in tools {
                    let channel = TransformChannel::new(tool.clone(), reference.clone());
                    let name = channel.name();
                    self.check_free(&config.id, &name)?;
                    let buffer = TrackerBuffer::from_config(
                        name.clone(),
                        channel,
                        &config.buffer,
                        &config.filter,
                    )
                    .map_err(|e| AcquisitionError::buffer(&name, e))?;
                    buffers.push(Arc::new(buffer));
                }
                let device = MockTrackerDevice::new(config.clone(), buffers.clone(), counters)?
                    .with_behavior(behavior);
                for buffer in buffers {
                    self.trackers.insert(buffer.id().clone(), buffer);
                }
                self.devices.push(Box::new(device));
            }
        }
        debug!(device_id = %config.id, kind = config.kind.label(), "Device registered");
        Ok(())
    }

    fn check_free(&self, device_id: &SourceId, buffer_id: &SourceId) -> Result<()> {
        if self.video.contains_key(buffer_id) || self.trackers.contains_key(buffer_id) {
            return Err(AcquisitionError::Device {
                device_id: device_id.clone(),
                message: format!("buffer '{buffer_id}' is already provided by another device"),
            });
        }
        Ok(())
    }

    /// Start every device. On failure the devices started so far are
    /// stopped again.
    #[instrument(name = "pipeline_start_all", skip(self))]
    pub fn start_all(&self) -> Result<()> {
        info!(count = self.devices.len(), "Starting all devices");
        for (started, device) in self.devices.iter().enumerate() {
            if let Err(e) = device.start() {
                warn!(device_id = %device.device_id(), error = %e, "Device failed to start");
                for device in &self.devices[..started] {
                    device.stop();
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    #[instrument(name = "pipeline_stop_all", skip(self))]
    pub fn stop_all(&self) {
        for device in self.devices.iter().filter(|d| d.is_acquiring()) {
            debug!(device_id = %device.device_id(), "Stopping device");
            device.stop();
        }
    }

    pub fn is_acquiring(&self) -> bool {
        self.devices.iter().any(|d| d.is_acquiring())
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn video_buffer(&self, id: &str) -> Result<Arc<VideoBuffer>> {
        self.video
            .get(id)
            .cloned()
            .ok_or_else(|| AcquisitionError::UnknownBuffer(id.to_string()))
    }

    /// Tracker buffer by channel name (e.g. `ProbeToTracker`)
    pub fn tracker_buffer(&self, name: &str) -> Result<Arc<TrackerBuffer>> {
        self.trackers
            .get(name)
            .cloned()
            .ok_or_else(|| AcquisitionError::UnknownBuffer(name.to_string()))
    }

    pub fn video_buffers(&self) -> impl Iterator<Item = &Arc<VideoBuffer>> {
        self.video.values()
    }

    pub fn tracker_buffers(&self) -> impl Iterator<Item = &Arc<TrackerBuffer>> {
        self.trackers.values()
    }

    /// All buffer ids, video first
    pub fn buffer_ids(&self) -> Vec<SourceId> {
        self.video.keys().chain(self.trackers.keys()).cloned().collect()
    }

    pub fn video_cursor(&self, id: &str) -> Result<ItemCursor<contracts::FrameFormat>> {
        Ok(ItemCursor::from_oldest(self.video_buffer(id)?))
    }

    pub fn tracker_cursor(&self, name: &str) -> Result<ItemCursor<TransformChannel>> {
        Ok(ItemCursor::from_oldest(self.tracker_buffer(name)?))
    }

    /// Snapshot of every buffer, in [`Self::buffer_ids`] order
    pub fn stats(&self) -> Vec<BufferStats> {
        self.video
            .values()
            .map(|b| b.stats())
            .chain(self.trackers.values().map(|b| b.stats()))
            .collect()
    }

    pub fn metrics(&self) -> Arc<AcquisitionMetrics> {
        self.metrics.clone()
    }
}

impl Drop for AcquisitionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BufferConfig, FrameFormat, TimestampFilterConfig};
    use std::thread;
    use std::time::Duration;

    fn config() -> AcquisitionConfig {
        AcquisitionConfig {
            version: Default::default(),
            devices: vec![
                DeviceConfig {
                    id: "us".into(),
                    rate_hz: 100.0,
                    kind: DeviceKind::Video {
                        format: FrameFormat::planar(16, 8, 8),
                        row_padding: 0,
                        skip_bytes: 0,
                    },
                    buffer: BufferConfig {
                        capacity: 10,
                        local_time_offset: 0.0,
                    },
                    filter: TimestampFilterConfig::default(),
                },
                DeviceConfig {
                    id: "em".into(),
                    rate_hz: 100.0,
                    kind: DeviceKind::Tracker {
                        reference: "Tracker".into(),
                        tools: vec!["Probe".into(), "Stylus".into()],
                    },
                    buffer: BufferConfig::default(),
                    filter: TimestampFilterConfig::default(),
                },
            ],
        }
    }

    #[test]
    fn test_build_from_config() {
        let pipeline = AcquisitionPipeline::from_config(&config()).unwrap();
        assert_eq!(pipeline.device_count(), 2);
        assert_eq!(
            pipeline.buffer_ids(),
            vec![
                SourceId::from("us"),
                SourceId::from("ProbeToTracker"),
                SourceId::from("StylusToTracker")
            ]
        );
        assert_eq!(pipeline.video_buffer("us").unwrap().buffer_size(), 10);
        assert!(matches!(
            pipeline.tracker_buffer("NeedleToTracker"),
            Err(AcquisitionError::UnknownBuffer(_))
        ));
    }

    #[test]
    fn test_colliding_buffer_names() {
        let mut config = config();
        config.devices[0].id = "ProbeToTracker".into();
        assert!(matches!(
            AcquisitionPipeline::from_config(&config),
            Err(AcquisitionError::Device { .. })
        ));
    }

    #[test]
    fn test_start_and_stop() {
        let pipeline = AcquisitionPipeline::from_config(&config()).unwrap();
        pipeline.start_all().unwrap();
        assert!(pipeline.is_acquiring());
        thread::sleep(Duration::from_millis(120));
        pipeline.stop_all();
        assert!(!pipeline.is_acquiring());

        for stats in pipeline.stats() {
            assert!(stats.len > 0, "{} is empty", stats.buffer_id);
        }
        let total = pipeline.metrics().total();
        assert!(total.added >= 3);
        assert_eq!(total.failed, 0);
    }
}

//! Mock devices
//!
//! Simulated video and tracker hardware for running the buffers without
//! device SDKs. Each device owns one producer thread that writes into the
//! buffers it was handed at construction.

use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use contracts::{
    Acquirable, AddResult, Configurable, ContractError, DeviceConfig, DeviceKind, ErrorSeverity,
    FrameFormat, Matrix4, RawFrame, SourceId, TimingSample, ToolStatus, TransformChannel,
    IDENTITY,
};
use rand::Rng;
use timestamped_buffer::{ItemFacade, ItemFormat, StreamState, TrackerBuffer, VideoBuffer};
use tracing::{debug, error, info, trace, warn};

use crate::clock::{system_time, DeviceClock};
use crate::metrics::DeviceCounters;
use crate::worker::{Ticker, Worker};

/// Imperfections a mock device simulates
#[derive(Debug, Clone, PartialEq)]
pub struct MockBehavior {
    /// Upper bound of the random delay between acquisition and receipt (seconds)
    pub receive_jitter_s: f64,

    /// Deliver every n-th frame twice
    pub redeliver_every: Option<u64>,

    /// Report every n-th tracker frame as out of view
    pub dropout_every: Option<u64>,

    /// Device clock the unfiltered timestamps are taken from
    pub clock: DeviceClock,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            receive_jitter_s: 0.002,
            redeliver_every: None,
            dropout_every: None,
            clock: DeviceClock::IDEAL,
        }
    }
}

impl MockBehavior {
    /// Timing of a frame acquired now
    fn sample(&self, frame_number: i64) -> TimingSample {
        let acquired = system_time();
        let latency = if self.receive_jitter_s > 0.0 {
            rand::rng().random_range(0.0..self.receive_jitter_s)
        } else {
            0.0
        };
        TimingSample {
            unfiltered: self.clock.at(acquired),
            receive_time: acquired + latency,
            frame_number: Some(frame_number),
        }
    }

    fn every(period: Option<u64>, frame_number: i64) -> bool {
        period.is_some_and(|n| n > 0 && frame_number as u64 % n == 0)
    }
}

/// Map one write outcome onto the device counters.
///
/// Duplicates are expected; configuration errors are counted and skipped;
/// anything fatal ends the acquisition loop.
fn account(device_id: &SourceId, counters: &DeviceCounters, outcome: AddResult) -> ControlFlow<()> {
    match outcome {
        Ok(uid) => {
            counters.record_added();
            trace!(device_id = %device_id, uid, "Item committed");
            ControlFlow::Continue(())
        }
        Err(e) => {
            counters.record_error(e.severity());
            match e.severity() {
                ErrorSeverity::Transient | ErrorSeverity::Configuration => {
                    ControlFlow::Continue(())
                }
                ErrorSeverity::Fatal => {
                    error!(device_id = %device_id, error = %e, "Stopping acquisition");
                    ControlFlow::Break(())
                }
            }
        }
    }
}

/// Put a buffer into streaming state, whatever non-closed state it is in.
fn start_buffer<F: ItemFormat>(buffer: &ItemFacade<F>) -> Result<(), ContractError> {
    if buffer.state() == StreamState::Streaming {
        return Ok(());
    }
    buffer
        .start()
        .map_err(|e| ContractError::buffer_setup(buffer.id().as_str(), e))
}

fn pause_buffer<F: ItemFormat>(buffer: &ItemFacade<F>) {
    if buffer.state() == StreamState::Streaming {
        if let Err(e) = buffer.pause() {
            warn!(buffer_id = %buffer.id(), error = %e, "Failed to pause buffer");
        }
    }
}

/// Re-apply capacity, time offset and filter settings.
fn apply_buffer_settings<F: ItemFormat>(
    buffer: &ItemFacade<F>,
    config: &DeviceConfig,
) -> Result<(), ContractError> {
    buffer
        .set_buffer_size(config.buffer.capacity)
        .map_err(|e| ContractError::buffer_setup(buffer.id().as_str(), e))?;
    buffer.set_local_time_offset(config.buffer.local_time_offset);
    buffer.set_filter_config(config.filter.clone());
    Ok(())
}

fn reject_while_acquiring(device: &impl Acquirable) -> Result<(), ContractError> {
    if device.is_acquiring() {
        return Err(ContractError::device(
            device.device_id().as_str(),
            "cannot reconfigure while acquiring",
        ));
    }
    Ok(())
}

// ===== Video =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VideoLayout {
    format: FrameFormat,
    row_padding: usize,
    skip_bytes: usize,
}

impl VideoLayout {
    fn from_config(config: &DeviceConfig) -> Result<Self, ContractError> {
        match &config.kind {
            DeviceKind::Video {
                format,
                row_padding,
                skip_bytes,
            } => Ok(Self {
                format: *format,
                row_padding: *row_padding,
                skip_bytes: *skip_bytes,
            }),
            other => Err(ContractError::device(
                config.id.as_str(),
                format!("expected a video device, got {}", other.label()),
            )),
        }
    }

    fn stride(&self) -> usize {
        self.format.bytes_per_row() + self.row_padding
    }

    /// Render a moving gradient the way a frame grabber would hand it over:
    /// header bytes, then rows followed by padding.
    fn render(&self, frame_number: i64, out: &mut BytesMut) {
        out.clear();
        out.put_bytes(0xEE, self.skip_bytes);

        let width = self.format.size[0] as usize;
        let row_bytes = self.format.bytes_per_row();
        let shift = frame_number as usize;
        let mut wide = Vec::new();

        for row in 0..self.format.rows() {
            match self.format.bits_per_pixel {
                16 => {
                    wide.clear();
                    wide.extend((0..width).map(|x| ((x + row + shift) * 64) as u16));
                    out.put_slice(bytemuck::cast_slice::<u16, u8>(&wide));
                }
                _ => {
                    for x in 0..row_bytes {
                        out.put_u8((x + row + shift) as u8);
                    }
                }
            }
            out.put_bytes(0, self.row_padding);
        }
    }

    fn raw<'a>(&self, data: &'a [u8]) -> RawFrame<'a> {
        RawFrame::packed(data, self.format.size, self.format.bits_per_pixel)
            .with_skip_bytes(self.skip_bytes)
            .with_row_stride(self.stride())
    }
}

/// Mock frame grabber writing into one [`VideoBuffer`].
pub struct MockVideoDevice {
    config: DeviceConfig,
    layout: VideoLayout,
    buffer: Arc<VideoBuffer>,
    behavior: MockBehavior,
    counters: Arc<DeviceCounters>,
    worker: Worker,
}

impl MockVideoDevice {
    pub fn new(
        config: DeviceConfig,
        buffer: Arc<VideoBuffer>,
        counters: Arc<DeviceCounters>,
    ) -> Result<Self, ContractError> {
        let layout = VideoLayout::from_config(&config)?;
        Ok(Self {
            config,
            layout,
            buffer,
            behavior: MockBehavior::default(),
            counters,
            worker: Worker::default(),
        })
    }

    /// Replace the simulated imperfections. Takes effect on the next start.
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn buffer(&self) -> &Arc<VideoBuffer> {
        &self.buffer
    }

    fn run(
        device_id: SourceId,
        rate_hz: f64,
        layout: VideoLayout,
        buffer: Arc<VideoBuffer>,
        behavior: MockBehavior,
        counters: Arc<DeviceCounters>,
        running: Arc<AtomicBool>,
    ) {
        let mut ticker = Ticker::new(rate_hz);
        let mut frame = BytesMut::with_capacity(layout.raw(&[]).required_len().unwrap_or_default());
        let mut frame_number: i64 = 0;

        debug!(device_id = %device_id, format = %layout.format, rate_hz, "Video acquisition started");
        while ticker.wait(&running) {
            frame_number += 1;
            layout.render(frame_number, &mut frame);
            let raw = layout.raw(&frame);
            let sample = behavior.sample(frame_number);

            let deliveries = if MockBehavior::every(behavior.redeliver_every, frame_number) {
                2
            } else {
                1
            };
            for _ in 0..deliveries {
                let outcome = buffer.add_frame_with_filtering(&raw, sample);
                if account(&device_id, &counters, outcome).is_break() {
                    pause_buffer(&buffer);
                    return;
                }
            }
        }
        debug!(device_id = %device_id, frames = frame_number, "Video acquisition stopped");
    }
}

impl Acquirable for MockVideoDevice {
    fn device_id(&self) -> &SourceId {
        &self.config.id
    }

    fn start(&self) -> Result<(), ContractError> {
        if self.worker.is_running() {
            return Ok(());
        }
        start_buffer(&self.buffer)?;

        let (id, rate, layout) = (self.config.id.clone(), self.config.rate_hz, self.layout);
        let (buffer, behavior, counters) = (
            self.buffer.clone(),
            self.behavior.clone(),
            self.counters.clone(),
        );
        if self.worker.spawn(&self.config.id, move |running| {
            Self::run(id, rate, layout, buffer, behavior, counters, running)
        })? {
            info!(device_id = %self.config.id, rate_hz = rate, "Device started");
        }
        Ok(())
    }

    fn stop(&self) {
        self.worker.stop(&self.config.id);
        pause_buffer(&self.buffer);
    }

    fn is_acquiring(&self) -> bool {
        self.worker.is_running()
    }
}

impl Configurable for MockVideoDevice {
    fn configure(&mut self, config: &DeviceConfig) -> Result<(), ContractError> {
        reject_while_acquiring(&*self)?;
        let layout = VideoLayout::from_config(config)?;
        self.buffer
            .set_frame_format(layout.format)
            .map_err(|e| ContractError::buffer_setup(self.buffer.id().as_str(), e))?;
        apply_buffer_settings(&self.buffer, config)?;
        self.layout = layout;
        self.config = config.clone();
        Ok(())
    }

    fn config(&self) -> &DeviceConfig {
        &self.config
    }
}

// ===== Tracker =====

/// Pose of tool `tool` at time `t`: a slow spin about z on a circular path.
fn tool_pose(tool: usize, t: f64) -> Matrix4 {
    let phase = tool as f64;
    let (s, c) = (0.5 * t + phase).sin_cos();
    let (ps, pc) = (0.3 * t + phase).sin_cos();
    [
        [c, -s, 0.0, 50.0 * pc],
        [s, c, 0.0, 50.0 * ps],
        [0.0, 0.0, 1.0, 10.0 * phase],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Mock pose tracker writing one [`TrackerBuffer`] per tool.
pub struct MockTrackerDevice {
    config: DeviceConfig,
    tools: Vec<Arc<TrackerBuffer>>,
    behavior: MockBehavior,
    counters: Arc<DeviceCounters>,
    worker: Worker,
}

impl MockTrackerDevice {
    /// `tools` must hold one buffer per configured tool, in order.
    pub fn new(
        config: DeviceConfig,
        tools: Vec<Arc<TrackerBuffer>>,
        counters: Arc<DeviceCounters>,
    ) -> Result<Self, ContractError> {
        Self::check_channels(&config, &tools)?;
        Ok(Self {
            config,
            tools,
            behavior: MockBehavior::default(),
            counters,
            worker: Worker::default(),
        })
    }

    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn buffers(&self) -> &[Arc<TrackerBuffer>] {
        &self.tools
    }

    fn check_channels(
        config: &DeviceConfig,
        buffers: &[Arc<TrackerBuffer>],
    ) -> Result<(), ContractError> {
        let DeviceKind::Tracker { reference, tools } = &config.kind else {
            return Err(ContractError::device(
                config.id.as_str(),
                format!("expected a tracker device, got {}", config.kind.label()),
            ));
        };
        if tools.len() != buffers.len() {
            return Err(ContractError::device(
                config.id.as_str(),
                format!("{} tools configured but {} buffers given", tools.len(), buffers.len()),
            ));
        }
        for (tool, buffer) in tools.iter().zip(buffers) {
            let expected = TransformChannel::new(tool.clone(), reference.clone());
            if !buffer.check_frame_format(&expected) {
                return Err(ContractError::device(
                    config.id.as_str(),
                    format!("buffer '{}' does not carry {expected}", buffer.id()),
                ));
            }
        }
        Ok(())
    }

    fn run(
        device_id: SourceId,
        rate_hz: f64,
        tools: Vec<Arc<TrackerBuffer>>,
        behavior: MockBehavior,
        counters: Arc<DeviceCounters>,
        running: Arc<AtomicBool>,
    ) {
        let mut ticker = Ticker::new(rate_hz);
        let mut frame_number: i64 = 0;

        debug!(device_id = %device_id, tools = tools.len(), rate_hz, "Tracker acquisition started");
        while ticker.wait(&running) {
            frame_number += 1;
            let sample = behavior.sample(frame_number);
            let dropout = MockBehavior::every(behavior.dropout_every, frame_number);

            for (index, buffer) in tools.iter().enumerate() {
                let (matrix, status) = if dropout {
                    (IDENTITY, ToolStatus::OutOfView)
                } else {
                    (tool_pose(index, sample.unfiltered), ToolStatus::Ok)
                };
                let outcome = buffer.add_transform_with_filtering(&matrix, status, sample);
                if account(&device_id, &counters, outcome).is_break() {
                    tools.iter().for_each(|tool| pause_buffer(tool));
                    return;
                }
            }
        }
        debug!(device_id = %device_id, frames = frame_number, "Tracker acquisition stopped");
    }
}

impl Acquirable for MockTrackerDevice {
    fn device_id(&self) -> &SourceId {
        &self.config.id
    }

    fn start(&self) -> Result<(), ContractError> {
        if self.worker.is_running() {
            return Ok(());
        }
        for buffer in &self.tools {
            start_buffer(buffer)?;
        }

        let (id, rate) = (self.config.id.clone(), self.config.rate_hz);
        let (tools, behavior, counters) = (
            self.tools.clone(),
            self.behavior.clone(),
            self.counters.clone(),
        );
        if self.worker.spawn(&self.config.id, move |running| {
            Self::run(id, rate, tools, behavior, counters, running)
        })? {
            info!(device_id = %self.config.id, rate_hz = rate, "Device started");
        }
        Ok(())
    }

    fn stop(&self) {
        self.worker.stop(&self.config.id);
        for buffer in &self.tools {
            pause_buffer(buffer);
        }
    }

    fn is_acquiring(&self) -> bool {
        self.worker.is_running()
    }
}

impl Configurable for MockTrackerDevice {
    /// Tool set and reference are fixed by the buffers; only rate, buffer
    /// and filter settings can change.
    fn configure(&mut self, config: &DeviceConfig) -> Result<(), ContractError> {
        reject_while_acquiring(&*self)?;
        Self::check_channels(config, &self.tools)?;
        for buffer in &self.tools {
            apply_buffer_settings(buffer, config)?;
        }
        self.config = config.clone();
        Ok(())
    }

    fn config(&self) -> &DeviceConfig {
        &self.config
    }
}

//! Runs an [`AcquisitionPipeline`] and reads every buffer at a fixed
//! interval until the run ends.

use std::future::Future;
use std::time::{Duration, Instant};

use acquisition::{AcquisitionPipeline, CursorStep, ItemCursor, MockBehavior};
use anyhow::{Context, Result};
use contracts::{AcquisitionConfig, FrameFormat, TransformChannel};
use observability::BufferMetricsAggregator;
use timestamped_buffer::ItemFormat;
use tracing::{info, instrument, warn};

use super::RunStats;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub acquisition: AcquisitionConfig,

    /// Run time (`None` = until shutdown)
    pub duration: Option<Duration>,

    /// Interval between buffer reads
    pub poll_interval: Duration,

    pub behavior: MockBehavior,

    /// Metrics server port (`None` = disabled)
    pub metrics_port: Option<u16>,
}

pub struct Monitor {
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Run until the configured duration elapses or `shutdown` resolves.
    #[instrument(name = "monitor_run", skip_all)]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        let started = Instant::now();
        let MonitorConfig {
            acquisition,
            duration,
            poll_interval,
            behavior,
            metrics_port,
        } = self.config;

        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "Metrics endpoint available");
        }

        let pipeline =
            AcquisitionPipeline::with_behavior(&acquisition, behavior)
                .context("Failed to build acquisition pipeline")?;
        let mut video: Vec<ItemCursor<FrameFormat>> = pipeline
            .video_buffers()
            .map(|b| ItemCursor::from_oldest(b.clone()))
            .collect();
        let mut trackers: Vec<ItemCursor<TransformChannel>> = pipeline
            .tracker_buffers()
            .map(|b| ItemCursor::from_oldest(b.clone()))
            .collect();

        pipeline.start_all().context("Failed to start devices")?;
        info!(
            devices = pipeline.device_count(),
            buffers = video.len() + trackers.len(),
            "Acquisition running"
        );

        let mut stats = RunStats {
            devices: pipeline.device_count(),
            ..Default::default()
        };
        let mut ticks = tokio::time::interval(poll_interval);
        let deadline = async {
            match duration {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Shutdown requested, stopping devices");
                    break;
                }
                _ = &mut deadline => {
                    info!("Run duration reached");
                    break;
                }
                _ = ticks.tick() => {
                    poll_all(&mut video, &mut stats.buffers);
                    poll_all(&mut trackers, &mut stats.buffers);
                    for snapshot in pipeline.stats() {
                        stats.buffers.update(&snapshot);
                    }
                }
            }
        }

        pipeline.stop_all();
        // pick up what arrived after the last tick
        poll_all(&mut video, &mut stats.buffers);
        poll_all(&mut trackers, &mut stats.buffers);
        for snapshot in pipeline.stats() {
            stats.buffers.update(&snapshot);
        }

        stats.counters = pipeline.metrics().snapshot();
        stats.duration = started.elapsed();
        Ok(stats)
    }
}

fn poll_all<F: ItemFormat>(cursors: &mut [ItemCursor<F>], buffers: &mut BufferMetricsAggregator) {
    for cursor in cursors {
        poll(cursor, buffers);
    }
}

/// Read everything new from one buffer
fn poll<F: ItemFormat>(cursor: &mut ItemCursor<F>, buffers: &mut BufferMetricsAggregator) {
    let id = cursor.buffer().id().clone();
    let mut read = 0;
    loop {
        match cursor.advance() {
            Ok(CursorStep::Item(_)) => read += 1,
            Ok(CursorStep::Gap { skipped, resume_at }) => {
                warn!(buffer_id = %id, skipped, resume_at, "Reader fell behind");
                buffers.record_gap(&id, skipped);
            }
            Ok(CursorStep::Idle) => break,
            Err(e) => {
                warn!(buffer_id = %id, error = %e, "Buffer read failed");
                break;
            }
        }
    }
    buffers.record_read(&id, read);
}

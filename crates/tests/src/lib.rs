//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! - contract sanity checks
//! - concurrent producers and consumers on one buffer
//! - mock device pipelines built from TOML
//! - reader gap accounting

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, SourceId};

    #[test]
    fn test_contracts_compile() {
        assert_eq!(ConfigVersion::default(), ConfigVersion::V1);
    }

    #[test]
    fn test_source_id_orders_like_str() {
        let mut ids: Vec<SourceId> = ["us", "ProbeToTracker", "em"]
            .into_iter()
            .map(SourceId::from)
            .collect();
        ids.sort();
        assert_eq!(ids, ["ProbeToTracker", "em", "us"]);
    }
}

#[cfg(test)]
mod concurrency_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use contracts::{BufferItem, FrameFormat, ItemError, RawFrame, VideoFrame};
    use timestamped_buffer::VideoBuffer;

    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 32;
    const FRAMES: u64 = 2_000;

    fn streaming(capacity: usize) -> VideoBuffer {
        let buffer = VideoBuffer::new("us", capacity).unwrap();
        buffer
            .set_frame_format(FrameFormat::planar(WIDTH, HEIGHT, 8))
            .unwrap();
        buffer.start().unwrap();
        buffer
    }

    /// Every byte of frame `n` is `n as u8`, so a torn copy shows up as
    /// mixed bytes.
    fn write_frames(buffer: &VideoBuffer, done: &AtomicBool) {
        let mut pixels = vec![0u8; (WIDTH * HEIGHT) as usize];
        for n in 0..FRAMES {
            pixels.fill(n as u8);
            let t = n as f64 * 0.01;
            let uid = buffer
                .add_frame(&RawFrame::packed(&pixels, [WIDTH, HEIGHT, 1], 8), t, t, Some(n as i64))
                .unwrap();
            assert_eq!(uid, n);
        }
        done.store(true, Ordering::Release);
    }

    fn assert_consistent(item: &BufferItem<VideoFrame>) {
        let expected = item.uid as u8;
        assert!(
            item.payload.data.iter().all(|&b| b == expected),
            "torn frame at uid {}",
            item.uid
        );
        assert_eq!(item.index, Some(item.uid as i64));
        assert!((item.filtered_timestamp - item.uid as f64 * 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_readers_never_see_torn_frames() {
        let buffer = streaming(8);
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| write_frames(&buffer, &done));

            for _ in 0..3 {
                s.spawn(|| {
                    let mut out = BufferItem::default();
                    let mut last_uid = None;
                    while !done.load(Ordering::Acquire) {
                        let Ok(uid) = buffer.latest_uid() else {
                            continue;
                        };
                        match buffer.get_item_into(uid, &mut out) {
                            Ok(()) => {
                                assert_consistent(&out);
                                // uids only move forward
                                assert!(last_uid.map_or(true, |last| uid >= last));
                                last_uid = Some(uid);
                            }
                            // overwritten between the two calls
                            Err(ItemError::NotAvailableAnymore) => {}
                            Err(e) => panic!("unexpected lookup error: {e}"),
                        }
                    }
                });
            }
        });

        assert_eq!(buffer.next_uid(), FRAMES);
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.stats().evicted_count, FRAMES - 8);
    }

    #[test]
    fn test_time_lookup_while_writing() {
        let buffer = streaming(64);
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| write_frames(&buffer, &done));

            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let Ok(latest) = buffer.latest_timestamp() else {
                        continue;
                    };
                    // halfway between two frames resolves to the earlier one
                    match buffer.get_item_from_time(latest - 0.005) {
                        Ok(item) => {
                            assert_consistent(&item);
                            assert!(item.filtered_timestamp <= latest - 0.005);
                        }
                        Err(ItemError::NotAvailableAnymore) => {}
                        Err(e) => panic!("unexpected lookup error: {e}"),
                    }
                }
            });
        });
    }
}

#[cfg(test)]
mod pipeline_tests {
    use std::time::Duration;

    use acquisition::{AcquisitionPipeline, DeviceClock, MockBehavior};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AcquisitionConfig, ToolStatus};
    use timestamped_buffer::StreamState;

    const CONFIG: &str = r#"
[[devices]]
id = "us_probe"
rate_hz = 100.0

[devices.kind]
type = "video"
format = { size = [40, 30, 1], bits_per_pixel = 16 }
row_padding = 6
skip_bytes = 32

[devices.buffer]
capacity = 200

[[devices]]
id = "em_tracker"
rate_hz = 100.0

[devices.kind]
type = "tracker"
reference = "Tracker"
tools = ["Probe", "Needle"]

[devices.buffer]
capacity = 200

[devices.filter]
mode = "clock_drift"
"#;

    fn config() -> AcquisitionConfig {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let behavior = MockBehavior {
            redeliver_every: Some(5),
            dropout_every: Some(7),
            clock: DeviceClock {
                offset: -100.0,
                drift_ppm: 0.0,
            },
            ..MockBehavior::default()
        };
        let pipeline = AcquisitionPipeline::with_behavior(&config(), behavior).unwrap();
        pipeline.start_all().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        pipeline.stop_all();

        // video: packed 16 bit frames, strictly increasing filtered timestamps
        let video = pipeline.video_buffer("us_probe").unwrap();
        assert_eq!(video.state(), StreamState::Paused);
        let mut cursor = pipeline.video_cursor("us_probe").unwrap();
        let mut last = f64::NEG_INFINITY;
        let frames = cursor
            .drain(|item| {
                assert_eq!(item.payload.data.len(), 40 * 30 * 2);
                assert!(item.filtered_timestamp > last);
                last = item.filtered_timestamp;
            })
            .unwrap();
        assert!(frames > 5);
        assert_eq!(cursor.skipped(), 0);

        // re-delivered frames were refused, not stored twice
        let snapshot = pipeline.metrics().snapshot();
        let (_, us) = snapshot
            .iter()
            .find(|(id, _)| *id == "us_probe")
            .unwrap();
        assert!(us.rejected > 0);
        assert_eq!(us.added, video.next_uid());
        assert_eq!(video.stats().rejected_count, us.rejected);

        // tracker: clock offset recovered, dropouts stored with their status
        let probe = pipeline.tracker_buffer("ProbeToTracker").unwrap();
        let stats = probe.stats();
        let offset = stats.estimated_clock_offset.unwrap();
        assert!((offset - 100.0).abs() < 0.05, "offset {offset}");

        let mut statuses = Vec::new();
        pipeline
            .tracker_cursor("NeedleToTracker")
            .unwrap()
            .drain(|item| statuses.push(item.payload.status))
            .unwrap();
        assert!(statuses.contains(&ToolStatus::Ok));
        assert!(statuses.contains(&ToolStatus::OutOfView));
    }

    #[tokio::test]
    async fn test_restart_continues_uids() {
        let pipeline = AcquisitionPipeline::from_config(&config()).unwrap();
        pipeline.start_all().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        pipeline.stop_all();

        let video = pipeline.video_buffer("us_probe").unwrap();
        let first_run = video.next_uid();
        assert!(first_run > 0);

        pipeline.start_all().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(pipeline);

        assert!(video.next_uid() > first_run);
        assert_eq!(video.state(), StreamState::Paused);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let broken = CONFIG.replace("tools = [\"Probe\", \"Needle\"]", "tools = []");
        assert!(ConfigLoader::load_from_str(&broken, ConfigFormat::Toml).is_err());
    }
}

#[cfg(test)]
mod cursor_tests {
    use std::sync::Arc;

    use acquisition::{CursorStep, ItemCursor};
    use contracts::{ToolStatus, TransformChannel, IDENTITY};
    use observability::BufferMetricsAggregator;
    use timestamped_buffer::TrackerBuffer;

    fn streaming(capacity: usize) -> Arc<TrackerBuffer> {
        let buffer = TrackerBuffer::new("ProbeToTracker", capacity).unwrap();
        buffer
            .set_frame_format(TransformChannel::new("Probe", "Tracker"))
            .unwrap();
        buffer.start().unwrap();
        Arc::new(buffer)
    }

    /// A reader polling every 7 writes on a 5 slot ring loses 2 of every 7.
    #[test]
    fn test_gap_accounting() {
        let buffer = streaming(5);
        let mut cursor = ItemCursor::from_oldest(buffer.clone());
        let mut aggregator = BufferMetricsAggregator::new();
        let mut uid_seen = Vec::new();

        let mut t = 0.0;
        for _ in 0..10 {
            for _ in 0..7 {
                t += 1.0;
                buffer
                    .add_transform(&IDENTITY, ToolStatus::Ok, t, t, None)
                    .unwrap();
            }
            loop {
                match cursor.advance().unwrap() {
                    CursorStep::Item(uid) => {
                        uid_seen.push(uid);
                        aggregator.record_read("ProbeToTracker", 1);
                    }
                    CursorStep::Gap { skipped, .. } => {
                        aggregator.record_gap("ProbeToTracker", skipped)
                    }
                    CursorStep::Idle => break,
                }
            }
        }

        assert_eq!(cursor.delivered(), 50);
        assert_eq!(cursor.skipped(), 20);
        assert_eq!(cursor.delivered() + cursor.skipped(), buffer.next_uid());
        assert!(uid_seen.windows(2).all(|w| w[0] < w[1]));

        aggregator.update(&buffer.stats());
        let summary = aggregator.summary();
        let probe = &summary.buffers[0];
        assert_eq!(probe.items_read, 50);
        assert_eq!(probe.gaps, 10);
        assert_eq!(probe.skipped, 20);
        assert!((probe.read_ratio() - 50.0 / 70.0 * 100.0).abs() < 1e-9);
    }
}

//! Buffer metrics.
//!
//! Free functions record into the global `metrics` recorder (Prometheus when
//! installed). [`BufferMetricsAggregator`] keeps an in-memory view for the
//! end-of-run summary.

use std::collections::BTreeMap;

use contracts::{BufferStats, ItemStatus};
use metrics::{counter, gauge, histogram};

/// Record an accepted write
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_item_added;
///
/// if buffer.add_frame(&frame, t, t, None).is_ok() {
///     record_item_added("us_probe", "video");
/// }
/// ```
pub fn record_item_added(buffer_id: &str, kind: &'static str) {
    counter!(
        "tsbuf_items_added_total",
        "buffer_id" => buffer_id.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Record a refused write, labelled with `BufferError::reason()`
pub fn record_item_rejected(buffer_id: &str, reason: &'static str) {
    counter!(
        "tsbuf_items_rejected_total",
        "buffer_id" => buffer_id.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Record the outcome of a read by uid or time
pub fn record_lookup(buffer_id: &str, status: ItemStatus) {
    counter!(
        "tsbuf_lookups_total",
        "buffer_id" => buffer_id.to_string(),
        "status" => status.as_str()
    )
    .increment(1);
}

/// Publish a buffer snapshot as gauges
pub fn record_buffer_fill(stats: &BufferStats) {
    let id = stats.buffer_id.to_string();
    gauge!("tsbuf_buffer_items", "buffer_id" => id.clone()).set(stats.len as f64);
    gauge!("tsbuf_buffer_capacity", "buffer_id" => id.clone()).set(stats.capacity as f64);
    gauge!("tsbuf_buffer_next_uid", "buffer_id" => id.clone()).set(stats.next_uid as f64);
    if let Some(rate) = stats.frame_rate() {
        gauge!("tsbuf_buffer_frame_rate_hz", "buffer_id" => id.clone()).set(rate);
    }
    if let Some(offset) = stats.estimated_clock_offset {
        gauge!("tsbuf_clock_offset_ms", "buffer_id" => id).set(offset * 1000.0);
    }
}

/// Record the deviation of a filtered timestamp from the raw estimate
pub fn record_filter_residual(buffer_id: &str, residual: f64) {
    histogram!(
        "tsbuf_filter_residual_ms",
        "buffer_id" => buffer_id.to_string()
    )
    .record(residual.abs() * 1000.0);
}

/// Record uids a sequential reader lost to eviction
pub fn record_cursor_gap(buffer_id: &str, skipped: u64) {
    counter!(
        "tsbuf_cursor_gaps_total",
        "buffer_id" => buffer_id.to_string()
    )
    .increment(1);
    counter!(
        "tsbuf_cursor_skipped_items_total",
        "buffer_id" => buffer_id.to_string()
    )
    .increment(skipped);
}

/// Per-buffer running figures
#[derive(Debug, Clone, Default)]
pub struct BufferAggregate {
    /// Last snapshot seen
    pub last: Option<BufferStats>,

    /// Frame rate across snapshots (Hz)
    pub frame_rate: RunningStats,

    /// Fill ratio across snapshots (0-1)
    pub fill: RunningStats,

    /// Items consumed by readers
    pub items_read: u64,

    /// Times a reader fell behind the ring
    pub gaps: u64,

    /// Items lost to those gaps
    pub skipped: u64,
}

/// In-memory aggregation of buffer snapshots and reader progress.
#[derive(Debug, Clone, Default)]
pub struct BufferMetricsAggregator {
    buffers: BTreeMap<String, BufferAggregate>,
}

impl BufferMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, buffer_id: &str) -> &mut BufferAggregate {
        self.buffers.entry(buffer_id.to_string()).or_default()
    }

    /// Fold in a snapshot
    pub fn update(&mut self, stats: &BufferStats) {
        let entry = self.entry(&stats.buffer_id);
        if let Some(rate) = stats.frame_rate() {
            entry.frame_rate.push(rate);
        }
        entry.fill.push(stats.fill_ratio());
        entry.last = Some(stats.clone());
    }

    /// Count items consumed by a reader
    pub fn record_read(&mut self, buffer_id: &str, items: u64) {
        self.entry(buffer_id).items_read += items;
    }

    /// Count a reader gap of `skipped` items
    pub fn record_gap(&mut self, buffer_id: &str, skipped: u64) {
        let entry = self.entry(buffer_id);
        entry.gaps += 1;
        entry.skipped += skipped;
    }

    pub fn get(&self, buffer_id: &str) -> Option<&BufferAggregate> {
        self.buffers.get(buffer_id)
    }

    pub fn summary(&self) -> MetricsSummary {
        let buffers = self
            .buffers
            .iter()
            .map(|(id, agg)| {
                let last = agg.last.clone().unwrap_or_default();
                BufferSummary {
                    buffer_id: id.clone(),
                    items_added: last.next_uid,
                    rejected: last.rejected_count,
                    evicted: last.evicted_count,
                    len: last.len,
                    capacity: last.capacity,
                    items_read: agg.items_read,
                    gaps: agg.gaps,
                    skipped: agg.skipped,
                    clock_offset: last.estimated_clock_offset,
                    frame_rate_hz: StatsSummary::from(&agg.frame_rate),
                    fill_ratio: StatsSummary::from(&agg.fill),
                }
            })
            .collect();
        MetricsSummary { buffers }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary of one buffer
#[derive(Debug, Clone, Default)]
pub struct BufferSummary {
    pub buffer_id: String,
    pub items_added: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub len: usize,
    pub capacity: usize,
    pub items_read: u64,
    pub gaps: u64,
    pub skipped: u64,
    pub clock_offset: Option<f64>,
    pub frame_rate_hz: StatsSummary,
    pub fill_ratio: StatsSummary,
}

impl BufferSummary {
    /// Share of produced items a reader saw, in percent
    pub fn read_ratio(&self) -> f64 {
        if self.items_added == 0 {
            0.0
        } else {
            self.items_read as f64 / self.items_added as f64 * 100.0
        }
    }
}

/// End-of-run summary over all buffers
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub buffers: Vec<BufferSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Buffer Metrics Summary ===")?;
        if self.buffers.is_empty() {
            return writeln!(f, "No buffers");
        }
        for b in &self.buffers {
            writeln!(f, "[{}]", b.buffer_id)?;
            writeln!(
                f,
                "  Items added: {} (rejected {}, evicted {})",
                b.items_added, b.rejected, b.evicted
            )?;
            writeln!(f, "  Occupancy: {}/{}", b.len, b.capacity)?;
            writeln!(
                f,
                "  Items read: {} ({:.2}%), gaps: {} ({} items skipped)",
                b.items_read,
                b.read_ratio(),
                b.gaps,
                b.skipped
            )?;
            writeln!(f, "  Frame rate (Hz): {}", b.frame_rate_hz)?;
            writeln!(f, "  Fill ratio: {}", b.fill_ratio)?;
            if let Some(offset) = b.clock_offset {
                writeln!(f, "  Clock offset: {:.3} ms", offset * 1000.0)?;
            }
        }
        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

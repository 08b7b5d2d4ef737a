//! Run statistics.

use std::time::Duration;

use acquisition::CountersSnapshot;
use contracts::SourceId;
use observability::BufferMetricsAggregator;

/// Statistics from one acquisition run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub duration: Duration,

    /// Devices that were started
    pub devices: usize,

    /// Write outcomes per device
    pub counters: Vec<(SourceId, CountersSnapshot)>,

    /// Buffer snapshots and reader progress
    pub buffers: BufferMetricsAggregator,
}

impl RunStats {
    pub fn items_added(&self) -> u64 {
        self.counters.iter().map(|(_, c)| c.added).sum()
    }

    pub fn items_read(&self) -> u64 {
        self.buffers
            .summary()
            .buffers
            .iter()
            .map(|b| b.items_read)
            .sum()
    }

    /// Committed items per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.items_added() as f64 / secs
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Acquisition Run ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Devices: {}", self.devices);
        println!(
            "Items: {} added, {} read ({:.1}/s)",
            self.items_added(),
            self.items_read(),
            self.throughput()
        );

        println!("\nDevices:");
        for (id, c) in &self.counters {
            println!(
                "  {id}: added {}, rejected {}, failed {}",
                c.added, c.rejected, c.failed
            );
        }

        println!("\n{}", self.buffers.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let mut stats = RunStats {
            duration: Duration::from_secs(2),
            devices: 1,
            ..Default::default()
        };
        stats.counters.push((
            "us".into(),
            CountersSnapshot {
                added: 60,
                rejected: 2,
                failed: 0,
            },
        ));
        stats.buffers.record_read("us", 55);

        assert_eq!(stats.items_added(), 60);
        assert_eq!(stats.items_read(), 55);
        assert_eq!(stats.throughput(), 30.0);
    }

    #[test]
    fn test_empty_run() {
        assert_eq!(RunStats::default().throughput(), 0.0);
    }
}

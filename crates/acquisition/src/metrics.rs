//! Per-device write counters

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ErrorSeverity, SourceId};

/// Write outcomes of one device
#[derive(Debug, Default)]
pub struct DeviceCounters {
    /// Items committed
    pub added: AtomicU64,

    /// Transient refusals (duplicate timestamps)
    pub rejected: AtomicU64,

    /// Configuration or fatal failures
    pub failed: AtomicU64,
}

impl DeviceCounters {
    pub fn record_added(&self) {
        self.added.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a refused write by severity
    pub fn record_error(&self, severity: ErrorSeverity) {
        let counter = match severity {
            ErrorSeverity::Transient => &self.rejected,
            ErrorSeverity::Configuration | ErrorSeverity::Fatal => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            added: self.added.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DeviceCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub added: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Counters of every device in a pipeline
#[derive(Debug, Default)]
pub struct AcquisitionMetrics {
    devices: Mutex<BTreeMap<SourceId, Arc<DeviceCounters>>>,
}

impl AcquisitionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for `device_id`, created on first use
    pub fn device(&self, device_id: &SourceId) -> Arc<DeviceCounters> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(device_id.clone())
            .or_default()
            .clone()
    }

    pub fn snapshot(&self) -> Vec<(SourceId, CountersSnapshot)> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, counters)| (id.clone(), counters.snapshot()))
            .collect()
    }

    /// Sum over all devices
    pub fn total(&self) -> CountersSnapshot {
        self.snapshot()
            .into_iter()
            .fold(CountersSnapshot::default(), |acc, (_, s)| CountersSnapshot {
                added: acc.added + s.added,
                rejected: acc.rejected + s.rejected,
                failed: acc.failed + s.failed,
            })
    }
}

//! BufferStats - diagnostic snapshot of one buffer

use serde::{Deserialize, Serialize};

use crate::{ItemUid, SourceId};

/// Point-in-time view of a buffer, taken under its lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferStats {
    /// Buffer id
    pub buffer_id: SourceId,

    /// Slot count
    pub capacity: usize,

    /// Valid items
    pub len: usize,

    /// First valid uid (equals `next_uid` when empty)
    pub oldest_uid: ItemUid,

    /// Uid the next accepted write will get
    pub next_uid: ItemUid,

    /// Oldest valid filtered timestamp
    pub oldest_timestamp: Option<f64>,

    /// Newest valid filtered timestamp
    pub latest_timestamp: Option<f64>,

    /// Writes refused by the timestamp guard
    pub rejected_count: u64,

    /// Items overwritten by the ring
    pub evicted_count: u64,

    /// Configured additive offset (seconds)
    pub local_time_offset: f64,

    /// Clock offset published by the timestamp filter
    pub estimated_clock_offset: Option<f64>,
}

impl BufferStats {
    /// Average item rate over the valid window (Hz)
    pub fn frame_rate(&self) -> Option<f64> {
        let (oldest, latest) = (self.oldest_timestamp?, self.latest_timestamp?);
        let span = latest - oldest;
        if self.len < 2 || span <= 0.0 {
            return None;
        }
        Some((self.len - 1) as f64 / span)
    }

    /// Fill ratio 0-1
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.len as f64 / self.capacity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate() {
        let stats = BufferStats {
            capacity: 10,
            len: 5,
            oldest_timestamp: Some(1.0),
            latest_timestamp: Some(1.4),
            ..Default::default()
        };
        let rate = stats.frame_rate().unwrap();
        assert!((rate - 10.0).abs() < 1e-9);
        assert!((stats.fill_ratio() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_frame_rate_needs_two_items() {
        let stats = BufferStats {
            len: 1,
            oldest_timestamp: Some(1.0),
            latest_timestamp: Some(1.0),
            ..Default::default()
        };
        assert_eq!(stats.frame_rate(), None);
    }
}

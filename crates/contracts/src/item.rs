//! BufferItem - one timestamped slot of a circular buffer

use serde::{Deserialize, Serialize};

/// Buffer-assigned item identifier, strictly increasing and never reused.
pub type ItemUid = u64;

/// A timestamped payload as stored in (and copied out of) a buffer slot.
///
/// The payload is owned by the slot and overwritten in place when the ring
/// wraps around; readers only ever receive copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferItem<T> {
    /// Payload (video frame, transform, encoder value ...)
    pub payload: T,

    /// Raw acquisition time in the device clock domain (seconds)
    pub unfiltered_timestamp: f64,

    /// Filtered, system-clock aligned acquisition time (seconds)
    pub filtered_timestamp: f64,

    /// Device-reported frame / sample number, advisory only
    pub index: Option<i64>,

    /// Buffer-assigned uid
    pub uid: ItemUid,
}

impl<T> BufferItem<T> {
    /// Empty slot wrapping the given payload
    pub fn with_payload(payload: T) -> Self {
        Self {
            payload,
            unfiltered_timestamp: 0.0,
            filtered_timestamp: 0.0,
            index: None,
            uid: 0,
        }
    }

    /// Copy metadata and payload from `other` without reallocating when the
    /// payload type supports in-place cloning (e.g. `Vec<u8>` of equal length).
    pub fn copy_from(&mut self, other: &Self)
    where
        T: Clone,
    {
        self.payload.clone_from(&other.payload);
        self.unfiltered_timestamp = other.unfiltered_timestamp;
        self.filtered_timestamp = other.filtered_timestamp;
        self.index = other.index;
        self.uid = other.uid;
    }
}

/// Raw timing information of one acquisition, input of the timestamp filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSample {
    /// Timestamp in the device clock domain
    pub unfiltered: f64,

    /// Local system time at which the item was received
    pub receive_time: f64,

    /// Device frame number if the device reports one
    pub frame_number: Option<i64>,
}

impl TimingSample {
    /// Sample for devices without their own clock: the device time is the
    /// receive time.
    pub fn system(receive_time: f64, frame_number: Option<i64>) -> Self {
        Self {
            unfiltered: receive_time,
            receive_time,
            frame_number,
        }
    }
}

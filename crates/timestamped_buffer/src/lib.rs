//! # Timestamped Buffer
//!
//! Fixed-capacity ring buffers of timestamped acquisition items, addressable
//! by uid and by time.
//!
//! - [`TimestampedCircularBuffer`]: the generic ring (one mutex, scoped guard)
//! - [`ItemFacade`]: format enforcement, lifecycle, timestamp filtering
//! - [`VideoBuffer`] / [`TrackerBuffer`]: frame and transform producers
//!
//! ## Example
//!
//! ```
//! use contracts::{FrameFormat, ItemError, RawFrame};
//! use timestamped_buffer::VideoBuffer;
//!
//! let buffer = VideoBuffer::new("us_probe", 3).unwrap();
//! buffer.set_frame_format(FrameFormat::planar(2, 1, 8)).unwrap();
//! buffer.start().unwrap();
//!
//! for (i, t) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
//!     let pixels = [i as u8, 0];
//!     buffer
//!         .add_frame(&RawFrame::packed(&pixels, [2, 1, 1], 8), t, t, None)
//!         .unwrap();
//! }
//!
//! assert_eq!(buffer.get_item(0), Err(ItemError::NotAvailableAnymore));
//! assert_eq!(buffer.get_item_uid_from_time(2.5), Ok(1));
//! ```

mod circular;
mod facade;
mod filter;
mod format;
mod kalman;
mod state;
mod tracker;
mod video;

pub use circular::{NewSlot, Ring, RingGuard, TimestampedCircularBuffer};
pub use facade::{ItemFacade, ItemTiming};
pub use filter::{FilteredTimestamp, TimestampFilter};
pub use format::ItemFormat;
pub use kalman::ClockDriftEstimator;
pub use state::StreamState;
pub use tracker::TrackerBuffer;
pub use video::VideoBuffer;

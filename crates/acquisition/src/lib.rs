//! # Acquisition
//!
//! Devices that fill timestamped buffers, and the consumer side that reads
//! them back.
//!
//! - [`MockVideoDevice`] / [`MockTrackerDevice`]: simulated hardware, one
//!   producer thread each
//! - [`ItemCursor`]: sequential reader that reports overwritten items
//! - [`AcquisitionPipeline`]: devices and buffers built from an
//!   [`contracts::AcquisitionConfig`]
//!
//! ## Example
//!
//! ```no_run
//! use acquisition::AcquisitionPipeline;
//! use config_loader::{ConfigFormat, ConfigLoader};
//!
//! let config = ConfigLoader::load_from_str(
//!     r#"
//! [[devices]]
//! id = "us"
//! rate_hz = 30.0
//! kind = { type = "video", format = { size = [64, 48, 1], bits_per_pixel = 8 } }
//! "#,
//!     ConfigFormat::Toml,
//! )
//! .unwrap();
//!
//! let pipeline = AcquisitionPipeline::from_config(&config).unwrap();
//! pipeline.start_all().unwrap();
//!
//! std::thread::sleep(std::time::Duration::from_millis(500));
//!
//! let mut cursor = pipeline.video_cursor("us").unwrap();
//! cursor
//!     .drain(|item| println!("frame {} at {}", item.uid, item.filtered_timestamp))
//!     .unwrap();
//! println!("{} frames lost to overruns", cursor.skipped());
//! ```

pub mod clock;
mod cursor;
mod error;
mod metrics;
mod mock;
mod pipeline;
mod worker;

pub use clock::{system_time, DeviceClock};
pub use cursor::{CursorStep, ItemCursor};
pub use error::{AcquisitionError, Result};
pub use metrics::{AcquisitionMetrics, CountersSnapshot, DeviceCounters};
pub use mock::{MockBehavior, MockTrackerDevice, MockVideoDevice};
pub use pipeline::AcquisitionPipeline;

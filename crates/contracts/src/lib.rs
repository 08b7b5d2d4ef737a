//! # Contracts
//!
//! Shared data structures and traits of the acquisition workspace.
//! Every other crate depends on this one; it depends on none of them.
//!
//! ## Time Model
//! - All timestamps are seconds as `f64`
//! - `unfiltered_timestamp` lives in the device clock domain
//! - `filtered_timestamp` is aligned to the local system clock and strictly
//!   increasing within one buffer
//! - `uid` is assigned by the buffer; device frame numbers are advisory

mod config;
mod device;
mod error;
mod format;
mod item;
mod source_id;
mod stats;

pub use config::*;
pub use device::{Acquirable, Configurable};
pub use error::*;
pub use format::*;
pub use item::*;
pub use source_id::SourceId;
pub use stats::BufferStats;

//! Acquisition run orchestration.

mod monitor;
mod stats;

pub use monitor::{Monitor, MonitorConfig};
pub use stats::RunStats;

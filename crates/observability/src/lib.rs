//! # Observability
//!
//! Tracing and Prometheus setup plus buffer metrics.
//!
//! - `tracing-subscriber` initialisation (JSON / Pretty / Compact, `RUST_LOG`)
//! - optional Prometheus scrape endpoint
//! - buffer counters, gauges and an in-memory summary ([`metrics`])
//!
//! ## Example
//!
//! ```ignore
//! use observability::{init_with_config, LogFormat, ObservabilityConfig};
//!
//! init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: None,
//!     ..Default::default()
//! })?;
//! ```

pub mod metrics;

use ::metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

// Re-exports
pub use crate::metrics::{
    record_buffer_fill, record_cursor_gap, record_filter_residual, record_item_added,
    record_item_rejected, record_lookup, BufferAggregate, BufferMetricsAggregator, BufferSummary,
    MetricsSummary, RunningStats, StatsSummary,
};

/// Initialise tracing (JSON, `RUST_LOG` aware) and Prometheus on port 9000
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Observability settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log line format
    pub log_format: LogFormat,
    /// Prometheus port (`None` disables the exporter)
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is not set
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info,timestamped_buffer=info".to_string(),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// Structured JSON
    #[default]
    Json,
    /// Multi-line, human readable
    Pretty,
    /// Single line
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => anyhow::bail!("unknown log format '{other}'"),
        }
    }
}

/// Initialise with explicit settings.
///
/// Fails if a global subscriber or recorder is already installed.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    // Acquisition runs on named producer threads, keep their names in every format
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_thread_names(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus recorder, for hosts that set up tracing
/// themselves.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;
    describe_metrics();

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

fn describe_metrics() {
    describe_counter!("tsbuf_items_added_total", "Items committed to a buffer");
    describe_counter!(
        "tsbuf_items_rejected_total",
        "Writes refused by a buffer, by reason"
    );
    describe_counter!("tsbuf_lookups_total", "Reads by uid or time, by status");
    describe_gauge!("tsbuf_buffer_items", "Valid items in a buffer");
    describe_gauge!("tsbuf_buffer_frame_rate_hz", "Item rate over the valid window");
    describe_histogram!(
        "tsbuf_filter_residual_ms",
        Unit::Milliseconds,
        "Filtered minus raw timestamp"
    );
    describe_counter!("tsbuf_cursor_skipped_items_total", "Items a reader lost to eviction");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, Some(9000));
        assert!(config.default_log_level.starts_with("info"));
        assert!(matches!(config.log_format, LogFormat::Json));
    }

    #[test]
    fn test_parse_log_format() {
        assert!(matches!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty)));
        assert!(matches!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact)));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}

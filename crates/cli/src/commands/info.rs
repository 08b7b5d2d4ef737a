//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{AcquisitionConfig, DeviceKind, TimestampFilterConfig, TransformChannel};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    devices: Vec<DeviceInfo>,
}

#[derive(Serialize)]
struct DeviceInfo {
    id: String,
    kind: &'static str,
    rate_hz: f64,
    buffers: Vec<BufferInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<TimestampFilterConfig>,
}

#[derive(Serialize)]
struct BufferInfo {
    id: String,
    format: String,
    capacity: usize,
    /// Seconds of data the ring holds at the device rate
    span_s: f64,
    local_time_offset: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;
    let info = build_config_info(&config, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{json}");
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &AcquisitionConfig, args: &InfoArgs) -> ConfigInfo {
    let devices = config
        .devices
        .iter()
        .map(|device| {
            let buffer = |id: String, format: String| BufferInfo {
                id,
                format,
                capacity: device.buffer.capacity,
                span_s: device.buffer.capacity as f64 / device.rate_hz,
                local_time_offset: device.buffer.local_time_offset,
            };
            let buffers = match &device.kind {
                DeviceKind::Video { format, .. } => {
                    vec![buffer(device.id.to_string(), format.to_string())]
                }
                DeviceKind::Tracker { reference, tools } => tools
                    .iter()
                    .map(|tool| {
                        let channel = TransformChannel::new(tool.clone(), reference.clone());
                        buffer(channel.name().to_string(), "transform".to_string())
                    })
                    .collect(),
            };
            DeviceInfo {
                id: device.id.to_string(),
                kind: device.kind.label(),
                rate_hz: device.rate_hz,
                buffers,
                filter: args.filters.then(|| device.filter.clone()),
            }
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        devices,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== Acquisition Configuration ===\n");
    println!("Version: {}", info.version);
    println!("\nDevices ({}):", info.devices.len());
    for device in &info.devices {
        println!("  - {} ({}, {} Hz)", device.id, device.kind, device.rate_hz);
        for buffer in &device.buffers {
            println!(
                "      {} [{}] {} slots ({:.2}s), offset {:+.3}s",
                buffer.id, buffer.format, buffer.capacity, buffer.span_s, buffer.local_time_offset
            );
        }
        if let Some(ref filter) = device.filter {
            println!(
                "      filter: {:?}, window {}, max deviation {}s",
                filter.mode, filter.averaged_items, filter.max_allowed_deviation_s
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_buffers_per_device() {
        let file = fixtures::config_file(fixtures::CONFIG);
        let args = InfoArgs {
            config: file.path().to_path_buf(),
            json: true,
            filters: false,
        };
        let config = load_config(&args.config).unwrap();
        let info = build_config_info(&config, &args);

        assert_eq!(info.devices.len(), 2);
        assert_eq!(info.devices[0].buffers[0].format, "32x24x1@8bpp");
        assert!((info.devices[0].buffers[0].span_s - 0.4).abs() < 1e-12);
        let tracker: Vec<_> = info.devices[1].buffers.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(tracker, ["ProbeToTracker", "StylusToTracker"]);
        assert!(info.devices[1].filter.is_none());
    }

    #[test]
    fn test_filters_flag() {
        let file = fixtures::config_file(fixtures::CONFIG);
        let args = InfoArgs {
            config: file.path().to_path_buf(),
            json: false,
            filters: true,
        };
        let config = load_config(&args.config).unwrap();
        assert!(build_config_info(&config, &args).devices[0].filter.is_some());
        assert!(run_info(&args).is_ok());
    }
}

//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AcquisitionConfig, DeviceKind, FilterMode};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    video_devices: usize,
    tracker_devices: usize,
    buffer_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_config(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&config),
            summary: Some(summarize(&config)),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

fn summarize(config: &AcquisitionConfig) -> ConfigSummary {
    let mut summary = ConfigSummary {
        version: format!("{:?}", config.version),
        video_devices: 0,
        tracker_devices: 0,
        buffer_count: 0,
    };
    for device in &config.devices {
        match &device.kind {
            DeviceKind::Video { .. } => {
                summary.video_devices += 1;
                summary.buffer_count += 1;
            }
            DeviceKind::Tracker { tools, .. } => {
                summary.tracker_devices += 1;
                summary.buffer_count += tools.len();
            }
        }
    }
    summary
}

/// Non-fatal issues: settings that are legal but likely unintended
fn collect_warnings(config: &AcquisitionConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    for device in &config.devices {
        let seconds = device.buffer.capacity as f64 / device.rate_hz;
        if seconds < 1.0 {
            warnings.push(format!(
                "Device '{}' buffer holds only {seconds:.2}s of data at {} Hz",
                device.id, device.rate_hz
            ));
        }
        if device.filter.mode == FilterMode::FrameRegression
            && device.filter.averaged_items > device.buffer.capacity
        {
            warnings.push(format!(
                "Device '{}' averages {} items but buffers only {}",
                device.id, device.filter.averaged_items, device.buffer.capacity
            ));
        }
    }
    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Video devices: {}", summary.video_devices);
            println!("  Tracker devices: {}", summary.tracker_devices);
            println!("  Buffers: {}", summary.buffer_count);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_summary_and_warnings() {
        let file = fixtures::config_file(fixtures::CONFIG);
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.video_devices, 1);
        assert_eq!(summary.buffer_count, 3);
        // 20 slots at 50 Hz, and a 20 item regression window in 20 slots is fine
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("us_probe"));
    }

    #[test]
    fn test_invalid_file() {
        let args = ValidateArgs {
            config: "/nonexistent/acquisition.toml".into(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
        assert!(run_validate(&args).is_err());
    }
}

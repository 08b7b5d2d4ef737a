//! Configuration checks.
//!
//! Field-level rules (capacity, rate, window length) are declared with
//! `validator` derives on the contracts types. Cross-field rules live here:
//! - device ids are unique
//! - video frames have non-zero dimensions and bit depth
//! - tracker tool lists are non-empty and unique
//! - the regression outlier threshold is finite and non-negative

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{AcquisitionConfig, ContractError, DeviceConfig, DeviceKind};

/// Validate a parsed configuration, returning the first problem found.
pub fn validate(config: &AcquisitionConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("devices", e.to_string()))?;

    if config.devices.is_empty() {
        return Err(ContractError::config_validation(
            "devices",
            "at least one device is required",
        ));
    }
    validate_device_ids(config)?;
    for device in &config.devices {
        validate_kind(device)?;
        validate_filter(device)?;
    }
    Ok(())
}

fn validate_device_ids(config: &AcquisitionConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for device in &config.devices {
        if !seen.insert(device.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("devices[id={}]", device.id),
                "duplicate device id",
            ));
        }
    }
    Ok(())
}

fn validate_kind(device: &DeviceConfig) -> Result<(), ContractError> {
    match &device.kind {
        DeviceKind::Video { format, .. } => {
            if format.size.contains(&0) || format.bits_per_pixel == 0 {
                return Err(ContractError::config_validation(
                    format!("devices[{}].kind.format", device.id),
                    format!("frame dimensions and bit depth must be non-zero, got {format}"),
                ));
            }
        }
        DeviceKind::Tracker { reference, tools } => {
            if reference.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("devices[{}].kind.reference", device.id),
                    "reference frame name cannot be empty",
                ));
            }
            if tools.is_empty() {
                return Err(ContractError::config_validation(
                    format!("devices[{}].kind.tools", device.id),
                    "tracker needs at least one tool",
                ));
            }
            let mut seen = HashSet::new();
            for tool in tools {
                if tool.trim().is_empty() || !seen.insert(tool.as_str()) {
                    return Err(ContractError::config_validation(
                        format!("devices[{}].kind.tools[{tool}]", device.id),
                        "tool names must be non-empty and unique",
                    ));
                }
            }
        }
    }
    Ok(())
}

fn validate_filter(device: &DeviceConfig) -> Result<(), ContractError> {
    let deviation = device.filter.max_allowed_deviation_s;
    if !deviation.is_finite() || deviation < 0.0 {
        return Err(ContractError::config_validation(
            format!("devices[{}].filter.max_allowed_deviation_s", device.id),
            format!("must be finite and non-negative, got {deviation}"),
        ));
    }
    Ok(())
}

//! Error types for CLI operations.

use std::path::Path;

use acquisition::AcquisitionError;
use contracts::ContractError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be parsed or validated
    #[error("Failed to load configuration from {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: ContractError,
    },

    /// Devices or buffers could not be set up
    #[error("Acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn config(path: &Path, source: ContractError) -> Self {
        Self::Config {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

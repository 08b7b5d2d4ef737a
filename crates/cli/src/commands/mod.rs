//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_acquisition;
pub use validate::run_validate;

use std::path::Path;

use config_loader::{AcquisitionConfig, ConfigLoader};

use crate::error::{CliError, Result};

/// Load and validate a configuration file
pub(crate) fn load_config(path: &Path) -> Result<AcquisitionConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }
    ConfigLoader::load_from_path(path).map_err(|e| CliError::config(path, e))
}

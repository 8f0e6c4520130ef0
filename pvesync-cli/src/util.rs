//! Shared utility functions used across command modules.

use std::path::Path;

use pvesync_core::config::{SettingsFile, load_settings_file};
use tokio::runtime::Runtime;

use crate::error::CliError;

/// Loads the settings file named by `--config`, or the default one if it
/// exists.
pub fn load_settings(config_path: Option<&Path>) -> Result<SettingsFile, CliError> {
    Ok(load_settings_file(config_path)?)
}

/// Creates the single-threaded runtime remote calls are awaited on
pub fn create_runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Config(format!("Failed to create async runtime: {e}")))
}

//! TOML settings file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::settings::{FilterSettings, NetboxSection, ProxmoxSection, ReconcileSettings};
use crate::error::{ConfigError, ConfigResult};

/// Contents of a `pvesync` configuration file. Every section is optional.
///
/// ```toml
/// [proxmox]
/// host = "pve.example.com"
/// user = "netbox@pve"
/// token_name = "sync"
///
/// [netbox]
/// url = "https://netbox.example.com"
/// cluster_id = 3
///
/// [filters]
/// extra_skip_prefixes = ["cni"]
///
/// [reconcile]
/// vrf_per_container_bridge = true
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// Hypervisor connection
    pub proxmox: ProxmoxSection,
    /// Record store connection
    pub netbox: NetboxSection,
    /// Extraction filters
    pub filters: FilterSettings,
    /// Reconciler switches
    pub reconcile: ReconcileSettings,
}

impl SettingsFile {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the text is not valid for the schema.
    pub fn from_toml(content: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Returns `~/.config/pvesync/config.toml` (platform equivalent)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pvesync").join("config.toml"))
}

/// Loads the settings file.
///
/// An explicit path must exist. Without one, the default location is used
/// when present and an empty `SettingsFile` is returned otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_settings_file(explicit: Option<&Path>) -> ConfigResult<SettingsFile> {
    let path = match explicit {
        Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
        None => match default_config_path() {
            Some(path) if path.is_file() => path,
            _ => return Ok(SettingsFile::default()),
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "Loaded settings file");
    SettingsFile::from_toml(&content, &path)
}

//! Configuration for `pvesync`
//!
//! Settings come from three layers: command-line flags, environment
//! variables, and an optional TOML file. The CLI folds the first two into a
//! section value and overlays it on the file section; the resolved settings
//! are then validated and passed explicitly into each component.

mod file;
mod settings;

pub use file::{SettingsFile, default_config_path, load_settings_file};
pub use settings::{
    DEFAULT_CONTAINER_BRIDGE, DEFAULT_EXCLUDED_IPV4, DEFAULT_PROXMOX_PORT, DEFAULT_SKIP_PREFIXES,
    DEFAULT_TIMEOUT_SECS, FilterSettings, NetboxSection, NetboxSettings, ProxmoxSection,
    ProxmoxSettings, ReconcileSettings,
};

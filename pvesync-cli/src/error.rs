//! CLI error types and exit codes.

use pvesync_core::error::{
    ConfigError, ProxmoxError, PvesyncError, ReconcileError, SnapshotError, StoreError,
};
use pvesync_core::tracing::TracingError;

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, snapshot file, or other local errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Remote failure - Proxmox or NetBox unreachable, or the target cluster
    /// does not exist
    pub const REMOTE_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot file error
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Proxmox API error
    #[error("Proxmox error: {0}")]
    Proxmox(String),

    /// NetBox API error
    #[error("NetBox error: {0}")]
    Netbox(String),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<SnapshotError> for CliError {
    fn from(err: SnapshotError) -> Self {
        Self::Snapshot(err.to_string())
    }
}

impl From<ProxmoxError> for CliError {
    fn from(err: ProxmoxError) -> Self {
        Self::Proxmox(err.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Netbox(err.to_string())
    }
}

impl From<ReconcileError> for CliError {
    fn from(err: ReconcileError) -> Self {
        Self::Netbox(err.to_string())
    }
}

impl From<TracingError> for CliError {
    fn from(err: TracingError) -> Self {
        Self::Logging(err.to_string())
    }
}

impl From<PvesyncError> for CliError {
    fn from(err: PvesyncError) -> Self {
        match err {
            PvesyncError::Config(e) => e.into(),
            PvesyncError::Proxmox(e) => e.into(),
            PvesyncError::Store(e) => e.into(),
            PvesyncError::Snapshot(e) => e.into(),
            PvesyncError::Reconcile(e) => e.into(),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, snapshot file, logging, IO)
    /// - 2: Remote failure (Proxmox or NetBox)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Proxmox(_) | Self::Netbox(_) => exit_codes::REMOTE_FAILURE,
            Self::Config(_) | Self::Snapshot(_) | Self::Logging(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}

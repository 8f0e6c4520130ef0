//! Snapshot file reading and writing.

use std::fs;
use std::path::Path;

use super::VmSnapshot;
use crate::error::{SnapshotError, SnapshotResult};
use crate::tracing::span_names;

/// Serialization used for a snapshot file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// YAML sequence
    Yaml,
}

impl SnapshotFormat {
    /// Picks the format from the file extension; anything that is not
    /// `.yaml` or `.yml` is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Reads a snapshot file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not contain a list of
/// VM records.
pub fn read_snapshot(path: &Path) -> SnapshotResult<Vec<VmSnapshot>> {
    let _span = tracing::debug_span!(span_names::SNAPSHOT_READ, path = %path.display()).entered();

    let content = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let vms: Vec<VmSnapshot> = match SnapshotFormat::from_path(path) {
        SnapshotFormat::Json => {
            serde_json::from_str(&content).map_err(|e| SnapshotError::Json {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        }
        SnapshotFormat::Yaml => {
            serde_yaml::from_str(&content).map_err(|e| SnapshotError::Yaml {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        }
    };

    tracing::debug!(count = vms.len(), "Snapshot loaded");
    Ok(vms)
}

/// Writes a snapshot file, replacing any existing content.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_snapshot(path: &Path, vms: &[VmSnapshot]) -> SnapshotResult<()> {
    let _span =
        tracing::debug_span!(span_names::SNAPSHOT_WRITE, path = %path.display()).entered();

    let content = match SnapshotFormat::from_path(path) {
        SnapshotFormat::Json => {
            serde_json::to_string_pretty(vms).map_err(|e| SnapshotError::Json {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        }
        SnapshotFormat::Yaml => serde_yaml::to_string(vms).map_err(|e| SnapshotError::Yaml {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?,
    };

    fs::write(path, content).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })
}

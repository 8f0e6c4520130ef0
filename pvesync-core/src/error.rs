//! Error types for `pvesync`.
//!
//! Each concern owns an error enum; [`PvesyncError`] wraps them for callers
//! that only need to report a failure.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided by flag, environment, or file
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting was provided but its value is unusable
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Name of the offending setting
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the settings schema
    #[error("Failed to parse configuration file {path}: {reason}")]
    Parse {
        /// Path of the configuration file
        path: PathBuf,
        /// Parser message
        reason: String,
    },
}

/// Errors returned by the hypervisor API
#[derive(Debug, Error)]
pub enum ProxmoxError {
    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The request never produced a response
    #[error("Request to {path} failed: {reason}")]
    Request {
        /// API path that was requested
        path: String,
        /// Transport error message
        reason: String,
    },

    /// The API answered with a non-success status
    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        /// API path that was requested
        path: String,
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// The response body did not have the expected shape
    #[error("Unexpected response from {path}: {reason}")]
    Decode {
        /// API path that was requested
        path: String,
        /// Deserialization message
        reason: String,
    },
}

/// Errors returned by the record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The request never produced a response
    #[error("Request to {path} failed: {reason}")]
    Request {
        /// API path that was requested
        path: String,
        /// Transport error message
        reason: String,
    },

    /// The store answered with a non-success status
    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        /// API path that was requested
        path: String,
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// The response body did not have the expected shape
    #[error("Unexpected response from {path}: {reason}")]
    Decode {
        /// API path that was requested
        path: String,
        /// Deserialization message
        reason: String,
    },

    /// A patch targeted a record that does not exist
    #[error("{collection} record {id} not found")]
    NotFound {
        /// Collection name
        collection: &'static str,
        /// Record identifier
        id: u64,
    },
}

/// Errors raised while reading or writing snapshot files
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be opened or written
    #[error("Snapshot IO error for {path}: {source}")]
    Io {
        /// Snapshot file path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed
    #[error("Invalid JSON snapshot {path}: {reason}")]
    Json {
        /// Snapshot file path
        path: PathBuf,
        /// Serde message
        reason: String,
    },

    /// YAML encoding or decoding failed
    #[error("Invalid YAML snapshot {path}: {reason}")]
    Yaml {
        /// Snapshot file path
        path: PathBuf,
        /// Serde message
        reason: String,
    },
}

/// Errors raised while reconciling one VM or verifying the target cluster
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The target cluster does not exist in the record store
    #[error("Cluster with ID {0} not found")]
    ClusterNotFound(u64),

    /// A lookup matched more than one record under the strict match policy
    #[error("Ambiguous lookup in {collection}: {count} records match {query}")]
    AmbiguousMatch {
        /// Collection name
        collection: &'static str,
        /// Number of matches
        count: usize,
        /// Rendered query
        query: String,
    },

    /// A record-store call failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Top-level error type
#[derive(Debug, Error)]
pub enum PvesyncError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Hypervisor API error
    #[error(transparent)]
    Proxmox(#[from] ProxmoxError),

    /// Record store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Snapshot file error
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Reconciliation error
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for hypervisor API calls
pub type ProxmoxResult<T> = Result<T, ProxmoxError>;

/// Result type for record store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for snapshot file operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Result type for reconciliation
pub type ReconcileResult<T> = Result<T, ReconcileError>;

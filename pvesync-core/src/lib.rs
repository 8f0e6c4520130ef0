//! `pvesync` Core Library
//!
//! Synchronizes Proxmox VE guest inventory into NetBox in two steps that only
//! share a snapshot file: extraction, then reconciliation.
//!
//! # Crate Structure
//!
//! - [`snapshot`] - Inventory model and snapshot file format
//! - [`extract`] - Hypervisor API, configuration parsing, and the extractor
//! - [`netbox`] - Record store trait, NetBox client, and in-memory store
//! - [`reconcile`] - Get-or-create primitive and the per-VM cascade
//! - [`config`] - Settings layers and validation
//! - [`tracing`] - Structured logging setup

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extract;
pub mod netbox;
pub mod reconcile;
pub mod snapshot;
pub mod tracing;

pub use config::{
    FilterSettings, NetboxSection, NetboxSettings, ProxmoxSection, ProxmoxSettings,
    ReconcileSettings, SettingsFile, load_settings_file,
};
pub use error::{
    ConfigError, ConfigResult, ProxmoxError, ProxmoxResult, PvesyncError, ReconcileError,
    ReconcileResult, SnapshotError, SnapshotResult, StoreError, StoreResult,
};
pub use extract::{
    ExtractionResult, Extractor, HypervisorApi, NetworkFilter, ProxmoxClient, SkippedEntry,
};
pub use netbox::{Collection, MemoryStore, NetboxClient, Query, Record, RecordStore};
pub use reconcile::{
    MatchPolicy, ReconcileOptions, ReconcileSummary, Reconciler, UpsertMode, UpsertOutcome,
    get_or_create,
};
pub use snapshot::{
    DiskInfo, InterfaceInfo, IpEntry, VmKind, VmSnapshot, VmStatus, read_snapshot, write_snapshot,
};
pub use tracing::{
    TracingConfig, TracingError, TracingLevel, TracingOutput, init_tracing,
    is_tracing_initialized,
};

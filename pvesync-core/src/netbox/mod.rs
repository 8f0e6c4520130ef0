//! Record store access.
//!
//! NetBox is reached through the [`RecordStore`] trait so the reconciler can
//! run against the live API ([`NetboxClient`]) or an in-process copy
//! ([`MemoryStore`], used for dry runs and tests).

mod client;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use client::NetboxClient;
pub use memory::MemoryStore;

use crate::error::StoreResult;

/// Object type NetBox uses for interface assignments of IPs and MACs
pub const VM_INTERFACE_OBJECT_TYPE: &str = "virtualization.vminterface";

/// A NetBox collection the reconciler reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Virtualization clusters (read only)
    Clusters,
    /// Platforms, one per guest technology
    Platforms,
    /// Virtual machines
    VirtualMachines,
    /// Virtual disks
    VirtualDisks,
    /// VM interfaces
    VmInterfaces,
    /// MAC addresses
    MacAddresses,
    /// IP addresses
    IpAddresses,
    /// VRFs
    VrfDomains,
}

impl Collection {
    /// Every collection, in cascade order
    pub const ALL: [Self; 8] = [
        Self::Clusters,
        Self::Platforms,
        Self::VirtualMachines,
        Self::VirtualDisks,
        Self::VmInterfaces,
        Self::MacAddresses,
        Self::IpAddresses,
        Self::VrfDomains,
    ];

    /// API path relative to `/api/`, with trailing slash
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Clusters => "virtualization/clusters/",
            Self::Platforms => "dcim/platforms/",
            Self::VirtualMachines => "virtualization/virtual-machines/",
            Self::VirtualDisks => "virtualization/virtual-disks/",
            Self::VmInterfaces => "virtualization/interfaces/",
            Self::MacAddresses => "dcim/mac-addresses/",
            Self::IpAddresses => "ipam/ip-addresses/",
            Self::VrfDomains => "ipam/vrfs/",
        }
    }

    /// Human-readable name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clusters => "cluster",
            Self::Platforms => "platform",
            Self::VirtualMachines => "virtual machine",
            Self::VirtualDisks => "virtual disk",
            Self::VmInterfaces => "interface",
            Self::MacAddresses => "MAC address",
            Self::IpAddresses => "IP address",
            Self::VrfDomains => "VRF",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored record: its identifier plus every other field as returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier
    pub id: u64,
    /// Remaining fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Returns a string field
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Returns the id a reference field points at.
    ///
    /// NetBox nests referenced objects (`{"id": 3, ...}`) in responses while
    /// accepting bare ids on write; both forms are read.
    #[must_use]
    pub fn reference_id(&self, key: &str) -> Option<u64> {
        reference_id(self.fields.get(key)?)
    }
}

/// Reads a bare or nested object reference
#[must_use]
pub fn reference_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::Object(obj) => obj.get("id").and_then(Value::as_u64),
        _ => None,
    }
}

/// Equality filter sent as query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    /// Creates an empty query
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `key=value` condition
    #[must_use]
    pub fn eq(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    /// Query conditions in insertion order
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Read and write access to the inventory record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches one record by id; `None` if it does not exist
    async fn get(&self, collection: Collection, id: u64) -> StoreResult<Option<Record>>;

    /// Returns every record matching all conditions of the query
    async fn filter(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Record>>;

    /// Creates a record and returns it as stored
    async fn create(&self, collection: Collection, payload: &Value) -> StoreResult<Record>;

    /// Updates the given fields of a record and returns it as stored
    async fn patch(&self, collection: Collection, id: u64, payload: &Value)
    -> StoreResult<Record>;
}

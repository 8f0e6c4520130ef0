//! Inventory snapshot model.
//!
//! A snapshot is the ordered list of guests observed on the hypervisor. It is
//! the only thing the extractor and the reconciler share, so the serialized
//! field names are kept stable (see [`file`]).

pub mod file;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub use file::{SnapshotFormat, read_snapshot, write_snapshot};

/// MAC address reported for interfaces without real hardware
pub const ZERO_MAC: &str = "00:00:00:00:00:00";

/// Guest technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmKind {
    /// Full virtual machine
    Qemu,
    /// Linux container
    Lxc,
}

impl VmKind {
    /// All kinds, in enumeration order
    pub const ALL: [Self; 2] = [Self::Qemu, Self::Lxc];

    /// Returns the API path segment and platform name for this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qemu => "qemu",
            Self::Lxc => "lxc",
        }
    }
}

impl fmt::Display for VmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power state as recorded in the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmStatus {
    /// Guest was running when extracted
    Running,
    /// Guest was stopped, paused, or in any other non-running state
    Offline,
}

impl VmStatus {
    /// Maps a hypervisor status string to a snapshot status
    #[must_use]
    pub fn from_hypervisor(status: &str) -> Self {
        if status == "running" {
            Self::Running
        } else {
            Self::Offline
        }
    }

    /// Returns true for running guests
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// One virtual machine or container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSnapshot {
    /// Guest name
    pub name: String,
    /// Guest technology
    #[serde(rename = "type", alias = "kind")]
    pub kind: VmKind,
    /// Power state
    pub status: VmStatus,
    /// Node the guest was found on
    pub host: String,
    /// Normalized OS type
    #[serde(
        rename = "ostype",
        alias = "os_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub os_type: Option<String>,
    /// Virtual CPU count (unknown for offline guests)
    #[serde(
        rename = "vcpu",
        alias = "vcpu_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vcpu_count: Option<u32>,
    /// Memory in MB (unknown for offline guests)
    #[serde(
        rename = "ram_mb",
        alias = "memory_mb",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub memory_mb: Option<u64>,
    /// Attached disks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<DiskInfo>,
    /// Network interfaces
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "named_interfaces"
    )]
    pub interfaces: Vec<InterfaceInfo>,
}

/// Reads the interface list, naming unnamed entries `net<position>` so that
/// container interfaces recorded without a `name=` token still load
fn named_interfaces<'de, D>(deserializer: D) -> Result<Vec<InterfaceInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut interfaces = Vec::<InterfaceInfo>::deserialize(deserializer)?;
    for (position, interface) in interfaces.iter_mut().enumerate() {
        if interface.name.trim().is_empty() {
            interface.name = format!("net{position}");
        }
    }
    Ok(interfaces)
}

impl VmSnapshot {
    /// Creates the minimal record used for guests that are not running
    #[must_use]
    pub fn offline(name: impl Into<String>, kind: VmKind, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            status: VmStatus::Offline,
            host: host.into(),
            os_type: None,
            vcpu_count: None,
            memory_mb: None,
            disks: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    /// Returns true if the guest was running when extracted
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Number of IPv4 addresses across all interfaces
    #[must_use]
    pub fn ipv4_count(&self) -> usize {
        self.addresses().filter(|ip| !ip.is_ipv6()).count()
    }

    /// Number of IPv6 addresses across all interfaces
    #[must_use]
    pub fn ipv6_count(&self) -> usize {
        self.addresses().filter(|ip| ip.is_ipv6()).count()
    }

    /// Sum of all disk sizes in GB
    #[must_use]
    pub fn total_disk_gb(&self) -> u64 {
        self.disks.iter().map(|d| d.size_gb).sum()
    }

    fn addresses(&self) -> impl Iterator<Item = &IpEntry> {
        self.interfaces.iter().flat_map(|i| i.ip_addresses.iter())
    }
}

/// A guest disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInfo {
    /// Device slot key (`scsi0`, `rootfs`, `mp1`, ...)
    pub name: String,
    /// Size in whole gigabytes
    #[serde(default)]
    pub size_gb: u64,
    /// Raw configuration value
    #[serde(default)]
    pub description: String,
}

/// A guest network interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Interface or bridge name
    #[serde(default)]
    pub name: String,
    /// Lower-cased MAC address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// Addresses assigned to the interface
    #[serde(default)]
    pub ip_addresses: Vec<IpEntry>,
}

impl InterfaceInfo {
    /// Returns the MAC address unless it is missing or the all-zero placeholder
    #[must_use]
    pub fn usable_mac(&self) -> Option<&str> {
        self.mac
            .as_deref()
            .filter(|mac| !mac.is_empty() && *mac != ZERO_MAC)
    }
}

/// An address with its prefix length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpEntry {
    /// IPv4 or IPv6 literal
    pub ip: String,
    /// Prefix length
    pub prefix: u8,
}

impl IpEntry {
    /// Creates an entry
    #[must_use]
    pub fn new(ip: impl Into<String>, prefix: u8) -> Self {
        Self {
            ip: ip.into(),
            prefix,
        }
    }

    /// Returns true for IPv6 literals
    #[must_use]
    pub fn is_ipv6(&self) -> bool {
        self.ip.contains(':')
    }

    /// Returns the `address/prefix` form used as the record-store key
    #[must_use]
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.ip, self.prefix)
    }
}

//! Guest configuration parsing.
//!
//! Proxmox hands back guest configuration as a flat map of keys to
//! comma-separated option strings (`local-lvm:vm-100-disk-0,size=32G`). This
//! module turns that map into typed disks and interfaces in one pass and never
//! fails: unrecognized values fall back to zero or absent.

use std::sync::LazyLock;

use regex::Regex;

use super::api::{AgentInterface, RawConfig};
use super::filter::{NetworkFilter, normalize_mac};
use crate::snapshot::{DiskInfo, InterfaceInfo, VmKind, VmSnapshot, VmStatus};

static SIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"size=(\d+)([GMK])").expect("SIZE_REGEX is a valid regex pattern")
});

static QEMU_DISK_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(scsi|virtio|sata|ide)(\d+)$")
        .expect("QEMU_DISK_KEY_REGEX is a valid regex pattern")
});

static LXC_MOUNT_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(mp)(\d+)$").expect("LXC_MOUNT_KEY_REGEX is a valid regex pattern")
});

static NET_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(net)(\d+)$").expect("NET_KEY_REGEX is a valid regex pattern")
});

static MAC_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}")
        .expect("MAC_TOKEN_REGEX is a valid regex pattern")
});

static BRIDGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"bridge=(\w+)").expect("BRIDGE_REGEX is a valid regex pattern")
});

static LXC_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|,)name=(\w+)").expect("LXC_NAME_REGEX is a valid regex pattern")
});

static LXC_HWADDR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"hwaddr=([0-9A-Fa-f:]+)").expect("LXC_HWADDR_REGEX is a valid regex pattern")
});

static LXC_IPV4_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|,)ip=([\d.]+)/(\d+)").expect("LXC_IPV4_REGEX is a valid regex pattern")
});

static LXC_IPV6_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|,)ip6=([0-9A-Fa-f:]+)/(\d+)")
        .expect("LXC_IPV6_REGEX is a valid regex pattern")
});

/// Root filesystem key of a container
const LXC_ROOTFS_KEY: &str = "rootfs";

/// Marks a removable-media drive
const CDROM_MARKER: &str = "media=cdrom";

/// Marks a cloud-init seed drive
const CLOUDINIT_MARKER: &str = "cloudinit";

/// Converts a `size=<n><unit>` token to whole gigabytes.
///
/// `G` is taken as is, `M` and `K` are divided down and rounded half to even.
/// A missing or unparseable token yields 0.
#[must_use]
pub fn parse_disk_size(value: &str) -> u64 {
    let Some(caps) = SIZE_REGEX.captures(value) else {
        return 0;
    };
    let Ok(amount) = caps[1].parse::<u64>() else {
        return 0;
    };

    match &caps[2] {
        "G" => amount,
        "M" => (amount as f64 / 1024.0).round_ties_even() as u64,
        _ => (amount as f64 / 1024.0 / 1024.0).round_ties_even() as u64,
    }
}

/// Drops OS types that say nothing useful about the platform: the Windows
/// family and the generic `l26` Linux marker.
#[must_use]
pub fn normalize_os_type(raw: Option<&str>) -> Option<String> {
    let os_type = raw?.trim();
    if os_type.is_empty() || os_type.starts_with("win") || os_type == "l26" {
        None
    } else {
        Some(os_type.to_string())
    }
}

/// Keys matching `pattern`, ordered by prefix and then numeric index so that
/// `scsi2` sorts before `scsi10`
fn indexed_keys<'a>(config: &'a RawConfig, pattern: &Regex) -> Vec<&'a str> {
    let mut keys: Vec<(&str, u32, &str)> = config
        .keys()
        .filter_map(|key| {
            let caps = pattern.captures(key)?;
            let prefix = caps.get(1)?.as_str();
            let index = caps.get(2)?.as_str().parse().ok()?;
            Some((prefix, index, key))
        })
        .collect();
    keys.sort_unstable();
    keys.into_iter().map(|(_, _, key)| key).collect()
}

fn disk_from_entry(name: &str, value: String) -> DiskInfo {
    DiskInfo {
        name: name.to_string(),
        size_gb: parse_disk_size(&value),
        description: value,
    }
}

/// Extracts disks from a QEMU configuration, skipping CD-ROM and cloud-init
/// drives on every bus.
#[must_use]
pub fn extract_qemu_disks(config: &RawConfig) -> Vec<DiskInfo> {
    indexed_keys(config, &QEMU_DISK_KEY_REGEX)
        .into_iter()
        .filter_map(|key| {
            let value = config.get_str(key)?;
            if value.contains(CDROM_MARKER) || value.contains(CLOUDINIT_MARKER) {
                return None;
            }
            Some(disk_from_entry(key, value))
        })
        .collect()
}

/// Extracts the root filesystem and mount points from a container
/// configuration.
#[must_use]
pub fn extract_lxc_disks(config: &RawConfig) -> Vec<DiskInfo> {
    let rootfs = config
        .get_str(LXC_ROOTFS_KEY)
        .map(|value| disk_from_entry(LXC_ROOTFS_KEY, value));

    rootfs
        .into_iter()
        .chain(
            indexed_keys(config, &LXC_MOUNT_KEY_REGEX)
                .into_iter()
                .filter_map(|key| config.get_str(key).map(|value| disk_from_entry(key, value))),
        )
        .collect()
}

/// Builds interfaces from guest agent data.
#[must_use]
pub fn interfaces_from_agent(
    interfaces: &[AgentInterface],
    filter: &NetworkFilter,
) -> Vec<InterfaceInfo> {
    interfaces
        .iter()
        .filter(|iface| !filter.skips_interface(&iface.name))
        .map(|iface| InterfaceInfo {
            name: iface.name.clone(),
            mac: iface.hardware_address.as_deref().and_then(normalize_mac),
            ip_addresses: iface
                .ip_addresses
                .iter()
                .filter_map(|addr| filter.entry(&addr.ip_address, addr.prefix))
                .collect(),
        })
        .collect()
}

/// Infers interfaces from `netN` entries of a QEMU configuration.
///
/// Used when the guest agent is unavailable; addresses cannot be known, so
/// every interface comes back without any.
#[must_use]
pub fn interfaces_from_qemu_config(config: &RawConfig) -> Vec<InterfaceInfo> {
    let mut interfaces = Vec::new();

    for key in indexed_keys(config, &NET_KEY_REGEX) {
        let Some(value) = config.get_str(key) else {
            continue;
        };

        let mac = MAC_TOKEN_REGEX
            .find(&value)
            .and_then(|m| normalize_mac(m.as_str()));
        let name = BRIDGE_REGEX
            .captures(&value)
            .map_or_else(|| format!("net{}", interfaces.len()), |c| c[1].to_string());

        interfaces.push(InterfaceInfo {
            name,
            mac,
            ip_addresses: Vec::new(),
        });
    }

    interfaces
}

/// Parses `netN` entries of a container configuration, including any static
/// addresses.
#[must_use]
pub fn interfaces_from_lxc_config(config: &RawConfig, filter: &NetworkFilter) -> Vec<InterfaceInfo> {
    indexed_keys(config, &NET_KEY_REGEX)
        .into_iter()
        .filter_map(|key| {
            let value = config.get_str(key)?;

            let name = LXC_NAME_REGEX
                .captures(&value)
                .map_or_else(|| key.to_string(), |c| c[1].to_string());
            let mac = LXC_HWADDR_REGEX
                .captures(&value)
                .and_then(|c| normalize_mac(&c[1]));

            let ip_addresses = LXC_IPV4_REGEX
                .captures_iter(&value)
                .chain(LXC_IPV6_REGEX.captures_iter(&value))
                .filter_map(|c| filter.entry(&c[1], c[2].parse().ok()))
                .collect();

            Some(InterfaceInfo {
                name,
                mac,
                ip_addresses,
            })
        })
        .collect()
}

/// Typed view of one guest configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGuest {
    /// Normalized OS type
    pub os_type: Option<String>,
    /// Virtual CPU count
    pub vcpu_count: u32,
    /// Memory in MB
    pub memory_mb: u64,
    /// Disks
    pub disks: Vec<DiskInfo>,
    /// Interfaces known from configuration alone
    pub interfaces: Vec<InterfaceInfo>,
}

impl ParsedGuest {
    /// Assembles the snapshot of a running guest
    #[must_use]
    pub fn into_snapshot(
        self,
        name: impl Into<String>,
        kind: VmKind,
        host: impl Into<String>,
    ) -> VmSnapshot {
        VmSnapshot {
            name: name.into(),
            kind,
            status: VmStatus::Running,
            host: host.into(),
            os_type: self.os_type,
            vcpu_count: Some(self.vcpu_count),
            memory_mb: Some(self.memory_mb),
            disks: self.disks,
            interfaces: self.interfaces,
        }
    }
}

/// Parses a raw guest configuration in one pass.
///
/// For QEMU guests the interfaces are the configuration-based fallback; the
/// caller replaces them with agent data when the agent answers.
#[must_use]
pub fn parse_guest_config(kind: VmKind, config: &RawConfig, filter: &NetworkFilter) -> ParsedGuest {
    let (disks, interfaces) = match kind {
        VmKind::Qemu => (
            extract_qemu_disks(config),
            interfaces_from_qemu_config(config),
        ),
        VmKind::Lxc => (
            extract_lxc_disks(config),
            interfaces_from_lxc_config(config, filter),
        ),
    };

    let vcpu_count = config
        .get_u64("cores")
        .and_then(|c| u32::try_from(c).ok())
        .unwrap_or(1)
        .max(1);

    ParsedGuest {
        os_type: normalize_os_type(config.get_str("ostype").as_deref()),
        vcpu_count,
        memory_mb: config.get_u64("memory").unwrap_or(0),
        disks,
        interfaces,
    }
}

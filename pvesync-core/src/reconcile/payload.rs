//! Request bodies written to the record store.
//!
//! Only fields derived from the snapshot are ever sent; anything else set on a
//! record by hand survives a reconcile.

use serde_json::{Value, json};

use crate::netbox::VM_INTERFACE_OBJECT_TYPE;
use crate::snapshot::{DiskInfo, IpEntry, VmKind, VmSnapshot};

/// Platform for a guest technology; the slug is the lower-cased name
#[must_use]
pub fn platform(kind: VmKind) -> Value {
    let name = kind.as_str();
    json!({ "name": name, "slug": name.to_lowercase() })
}

/// Free-text comment recording where the VM came from
#[must_use]
pub fn vm_comments(vm: &VmSnapshot) -> String {
    let mut comments = format!("Imported from Proxmox host: {}", vm.host);
    if vm.is_running() {
        comments.push_str(&format!(". Type: {}", vm.kind));
        if let Some(os_type) = &vm.os_type {
            comments.push_str(&format!(", OS: {os_type}"));
        }
    }
    comments
}

/// Virtual machine record; vcpus and memory are only sent for running VMs
#[must_use]
pub fn virtual_machine(vm: &VmSnapshot, cluster_id: u64, platform_id: Option<u64>) -> Value {
    let status = if vm.is_running() { "active" } else { "offline" };
    let mut payload = json!({
        "name": vm.name,
        "status": status,
        "cluster": cluster_id,
        "comments": vm_comments(vm),
    });

    if let Some(platform_id) = platform_id {
        payload["platform"] = json!(platform_id);
    }
    if vm.is_running() {
        payload["vcpus"] = json!(vm.vcpu_count.unwrap_or(1));
        payload["memory"] = json!(vm.memory_mb.unwrap_or(0));
    }
    payload
}

/// Virtual disk; NetBox sizes are in MB
#[must_use]
pub fn virtual_disk(vm_id: u64, disk: &DiskInfo) -> Value {
    json!({
        "virtual_machine": vm_id,
        "name": disk.name,
        "size": disk.size_gb.saturating_mul(1024),
        "description": disk.description,
    })
}

/// VM interface, optionally placed in a VRF
#[must_use]
pub fn vm_interface(vm_id: u64, name: &str, vrf_id: Option<u64>) -> Value {
    let mut payload = json!({ "virtual_machine": vm_id, "name": name });
    if let Some(vrf_id) = vrf_id {
        payload["vrf"] = json!(vrf_id);
    }
    payload
}

/// Assignment of an address object to a VM interface
#[must_use]
pub fn interface_assignment(interface_id: u64) -> Value {
    json!({
        "assigned_object_type": VM_INTERFACE_OBJECT_TYPE,
        "assigned_object_id": interface_id,
    })
}

/// MAC address assigned to an interface
#[must_use]
pub fn mac_address(mac: &str, interface_id: u64) -> Value {
    let mut payload = interface_assignment(interface_id);
    payload["mac_address"] = json!(mac);
    payload
}

/// Sets the primary MAC of an interface
#[must_use]
pub fn primary_mac(mac_id: u64) -> Value {
    json!({ "primary_mac_address": mac_id })
}

/// Re-homes an existing IP to an interface (and VRF)
#[must_use]
pub fn ip_assignment(interface_id: u64, vrf_id: Option<u64>) -> Value {
    let mut payload = interface_assignment(interface_id);
    if let Some(vrf_id) = vrf_id {
        payload["vrf"] = json!(vrf_id);
    }
    payload
}

/// New IP address assigned to an interface
#[must_use]
pub fn ip_address(entry: &IpEntry, interface_id: u64, vrf_id: Option<u64>) -> Value {
    let mut payload = ip_assignment(interface_id, vrf_id);
    payload["address"] = json!(entry.cidr());
    payload["status"] = json!("active");
    payload
}

/// Per-VM VRF
#[must_use]
pub fn vrf(name: &str) -> Value {
    json!({ "name": name })
}

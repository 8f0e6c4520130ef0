//! Export then import through a snapshot file

use pvesync_core::extract::{Extractor, GuestSummary, NetworkFilter};
use pvesync_core::netbox::{Collection, MemoryStore};
use pvesync_core::reconcile::{ReconcileOptions, Reconciler};
use pvesync_core::snapshot::{VmKind, read_snapshot, write_snapshot};
use tempfile::TempDir;

use super::support::{FakeCluster, agent_iface, web1_config};

fn cluster() -> FakeCluster {
    FakeCluster::new(&["pve1", "node-7"])
        .guest(
            "pve1",
            VmKind::Qemu,
            GuestSummary::new(101, "web1", "running"),
            Some(web1_config()),
        )
        .agent(
            "pve1",
            101,
            vec![agent_iface(
                "eth0",
                "AA:BB:CC:DD:EE:FF",
                &[("10.0.0.5", "ipv4", Some(24))],
            )],
        )
        .guest(
            "node-7",
            VmKind::Qemu,
            GuestSummary::new(900, "vm-test", "stopped"),
            None,
        )
}

#[tokio::test]
async fn test_export_file_import_json() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("proxmox_vms.json");

    let cluster = cluster();
    let extracted = Extractor::new(&cluster, NetworkFilter::default())
        .run()
        .await
        .expect("extraction succeeds");
    write_snapshot(&path, &extracted.vms).expect("write");

    let raw = std::fs::read_to_string(&path).expect("read back");
    assert!(raw.contains("\"ram_mb\": 2048"));
    assert!(raw.contains("\"type\": \"qemu\""));

    let vms = read_snapshot(&path).expect("read");
    assert_eq!(vms, extracted.vms);

    let store = MemoryStore::with_cluster(5, "lab");
    let summary = Reconciler::new(&store, ReconcileOptions::new(5))
        .run(&vms)
        .await
        .expect("cluster exists");

    assert_eq!(summary.summary(), "Successfully imported 2/2 VMs");
    assert_eq!(store.records(Collection::VirtualMachines).len(), 2);
    assert_eq!(store.records(Collection::IpAddresses).len(), 1);
    assert_eq!(summary.stats(Collection::VirtualMachines).created, 2);
}

#[tokio::test]
async fn test_export_file_import_yaml() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("inventory.yaml");

    let cluster = cluster();
    let extracted = Extractor::new(&cluster, NetworkFilter::default())
        .run()
        .await
        .expect("extraction succeeds");
    write_snapshot(&path, &extracted.vms).expect("write");

    let raw = std::fs::read_to_string(&path).expect("read back");
    assert!(!raw.trim_start().starts_with('['));

    let vms = read_snapshot(&path).expect("read");
    assert_eq!(vms, extracted.vms);
}

//! Reconciler tests against the in-memory record store

use pvesync_core::error::ReconcileError;
use pvesync_core::netbox::{Collection, MemoryStore, Record, VM_INTERFACE_OBJECT_TYPE};
use pvesync_core::reconcile::{MatchPolicy, ReconcileOptions, Reconciler};
use pvesync_core::snapshot::{InterfaceInfo, IpEntry, VmKind, VmSnapshot};
use serde_json::json;

use super::support::web1;

const CLUSTER_ID: u64 = 1;

fn store() -> MemoryStore {
    MemoryStore::with_cluster(CLUSTER_ID, "lab")
}

fn only(store: &MemoryStore, collection: Collection) -> Record {
    let records = store.records(collection);
    assert_eq!(records.len(), 1, "expected exactly one {collection}");
    records.into_iter().next().expect("one record")
}

#[tokio::test]
async fn test_web1_end_to_end() {
    let store = store();
    let summary = Reconciler::new(&store, ReconcileOptions::new(CLUSTER_ID))
        .run(&[web1()])
        .await
        .expect("cluster exists");

    assert_eq!(summary.succeeded, 1);
    assert!(summary.is_complete());

    let platform = only(&store, Collection::Platforms);
    assert_eq!(platform.str_field("name"), Some("qemu"));
    assert_eq!(platform.str_field("slug"), Some("qemu"));

    let vm = only(&store, Collection::VirtualMachines);
    assert_eq!(vm.str_field("name"), Some("web1"));
    assert_eq!(vm.str_field("status"), Some("active"));
    assert_eq!(vm.fields["vcpus"], json!(2));
    assert_eq!(vm.fields["memory"], json!(2048));
    assert_eq!(vm.reference_id("cluster"), Some(CLUSTER_ID));
    assert_eq!(vm.reference_id("platform"), Some(platform.id));
    assert_eq!(
        vm.str_field("comments"),
        Some("Imported from Proxmox host: pve1. Type: qemu")
    );

    let disk = only(&store, Collection::VirtualDisks);
    assert_eq!(disk.str_field("name"), Some("scsi0"));
    assert_eq!(disk.fields["size"], json!(20480));
    assert_eq!(disk.reference_id("virtual_machine"), Some(vm.id));

    let mac = only(&store, Collection::MacAddresses);
    assert_eq!(mac.str_field("mac_address"), Some("aa:bb:cc:dd:ee:ff"));
    assert_eq!(
        mac.str_field("assigned_object_type"),
        Some(VM_INTERFACE_OBJECT_TYPE)
    );

    let iface = only(&store, Collection::VmInterfaces);
    assert_eq!(iface.str_field("name"), Some("eth0"));
    assert_eq!(iface.reference_id("virtual_machine"), Some(vm.id));
    assert_eq!(iface.reference_id("primary_mac_address"), Some(mac.id));
    assert_eq!(mac.reference_id("assigned_object_id"), Some(iface.id));

    let ip = only(&store, Collection::IpAddresses);
    assert_eq!(ip.str_field("address"), Some("10.0.0.5/24"));
    assert_eq!(ip.str_field("status"), Some("active"));
    assert_eq!(ip.reference_id("assigned_object_id"), Some(iface.id));

    assert!(store.records(Collection::VrfDomains).is_empty());
}

#[tokio::test]
async fn test_offline_vm_creates_only_platform_and_vm() {
    let store = store();
    let vm = VmSnapshot::offline("vm-test", VmKind::Qemu, "node-7");

    let summary = Reconciler::new(&store, ReconcileOptions::new(CLUSTER_ID))
        .run(&[vm])
        .await
        .expect("cluster exists");
    assert_eq!(summary.succeeded, 1);

    let record = only(&store, Collection::VirtualMachines);
    assert_eq!(record.str_field("status"), Some("offline"));
    assert!(!record.fields.contains_key("vcpus"));
    assert!(!record.fields.contains_key("memory"));
    assert!(
        record
            .str_field("comments")
            .is_some_and(|c| c.contains("node-7"))
    );

    assert_eq!(store.records(Collection::Platforms).len(), 1);
    for collection in [
        Collection::VirtualDisks,
        Collection::VmInterfaces,
        Collection::MacAddresses,
        Collection::IpAddresses,
    ] {
        assert!(store.records(collection).is_empty(), "{collection}");
    }
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let store = store();
    let vms = vec![web1(), VmSnapshot::offline("vm-test", VmKind::Lxc, "node-7")];
    let reconciler = Reconciler::new(&store, ReconcileOptions::new(CLUSTER_ID));

    let first = reconciler.run(&vms).await.expect("first run");
    let snapshot_after_first: Vec<_> = Collection::ALL
        .iter()
        .map(|c| store.records(*c))
        .collect();
    let created_after_first = store.total_created();

    let second = reconciler.run(&vms).await.expect("second run");
    let snapshot_after_second: Vec<_> = Collection::ALL
        .iter()
        .map(|c| store.records(*c))
        .collect();

    assert_eq!(first.succeeded, 2);
    assert_eq!(second.succeeded, 2);
    assert!(first.total_created() > 0);
    assert_eq!(second.total_created(), 0);
    assert_eq!(store.total_created(), created_after_first);
    assert_eq!(snapshot_after_first, snapshot_after_second);
}

#[tokio::test]
async fn test_ip_moved_to_new_interface_is_rehomed() {
    let store = store();
    let reconciler = Reconciler::new(&store, ReconcileOptions::new(CLUSTER_ID));
    reconciler.run(&[web1()]).await.expect("first run");

    let mut moved = web1();
    moved.interfaces = vec![InterfaceInfo {
        name: "ens19".to_string(),
        mac: None,
        ip_addresses: vec![IpEntry::new("10.0.0.5", 24)],
    }];
    let summary = reconciler.run(&[moved]).await.expect("second run");
    assert_eq!(summary.succeeded, 1);

    let interfaces = store.records(Collection::VmInterfaces);
    assert_eq!(interfaces.len(), 2);
    let ens19 = interfaces
        .iter()
        .find(|i| i.str_field("name") == Some("ens19"))
        .expect("new interface");

    let ip = only(&store, Collection::IpAddresses);
    assert_eq!(ip.reference_id("assigned_object_id"), Some(ens19.id));
    assert_eq!(store.created(Collection::IpAddresses), 1);
    assert_eq!(store.patched(Collection::IpAddresses), 1);
}

#[tokio::test]
async fn test_container_bridge_gets_own_vrf() {
    let store = store();
    let mut vm = web1();
    vm.interfaces.push(InterfaceInfo {
        name: "docker0".to_string(),
        mac: None,
        ip_addresses: vec![IpEntry::new("10.99.0.1", 16)],
    });

    let mut options = ReconcileOptions::new(CLUSTER_ID);
    options.vrf_per_container_bridge = true;
    Reconciler::new(&store, options)
        .run(&[vm])
        .await
        .expect("cluster exists");

    let vrf = only(&store, Collection::VrfDomains);
    assert_eq!(vrf.str_field("name"), Some("web1-docker0"));

    let docker = store
        .records(Collection::VmInterfaces)
        .into_iter()
        .find(|i| i.str_field("name") == Some("docker0"))
        .expect("bridge interface");
    assert_eq!(docker.reference_id("vrf"), Some(vrf.id));

    let ips = store.records(Collection::IpAddresses);
    let bridge_ip = ips
        .iter()
        .find(|ip| ip.str_field("address") == Some("10.99.0.1/16"))
        .expect("bridge ip");
    assert_eq!(bridge_ip.reference_id("vrf"), Some(vrf.id));
    let eth_ip = ips
        .iter()
        .find(|ip| ip.str_field("address") == Some("10.0.0.5/24"))
        .expect("eth0 ip");
    assert!(!eth_ip.fields.contains_key("vrf"));
}

#[tokio::test]
async fn test_same_address_in_two_vrfs_is_not_shared() {
    let store = store();
    let mut options = ReconcileOptions::new(CLUSTER_ID);
    options.vrf_per_container_bridge = true;

    let bridge_vm = |name: &str| {
        let mut vm = VmSnapshot::offline(name, VmKind::Qemu, "pve1");
        vm.status = pvesync_core::snapshot::VmStatus::Running;
        vm.interfaces.push(InterfaceInfo {
            name: "docker0".to_string(),
            mac: None,
            ip_addresses: vec![IpEntry::new("10.200.0.1", 24)],
        });
        vm
    };

    Reconciler::new(&store, options)
        .run(&[bridge_vm("a"), bridge_vm("b")])
        .await
        .expect("cluster exists");

    assert_eq!(store.records(Collection::VrfDomains).len(), 2);
    assert_eq!(store.records(Collection::IpAddresses).len(), 2);
}

#[tokio::test]
async fn test_missing_cluster_is_fatal() {
    let store = MemoryStore::new();
    let err = Reconciler::new(&store, ReconcileOptions::new(42))
        .run(&[web1()])
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::ClusterNotFound(42)));
    assert!(store.records(Collection::VirtualMachines).is_empty());
}

#[tokio::test]
async fn test_ambiguous_vm_under_strict_policy_fails_only_that_vm() {
    let store = store();
    for _ in 0..2 {
        store.insert(
            Collection::VirtualMachines,
            json!({"name": "web1", "cluster": CLUSTER_ID}),
        );
    }

    let mut options = ReconcileOptions::new(CLUSTER_ID);
    options.policy = MatchPolicy::Strict;
    let summary = Reconciler::new(&store, options)
        .run(&[web1(), VmSnapshot::offline("other", VmKind::Lxc, "pve2")])
        .await
        .expect("cluster exists");

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].name, "web1");
    assert!(store.records(Collection::VirtualDisks).is_empty());
}

#[tokio::test]
async fn test_ambiguous_vm_under_first_policy_updates_first() {
    let store = store();
    let first = store.insert(
        Collection::VirtualMachines,
        json!({"name": "web1", "cluster": CLUSTER_ID}),
    );
    store.insert(
        Collection::VirtualMachines,
        json!({"name": "web1", "cluster": CLUSTER_ID}),
    );

    let summary = Reconciler::new(&store, ReconcileOptions::new(CLUSTER_ID))
        .run(&[web1()])
        .await
        .expect("cluster exists");
    assert_eq!(summary.succeeded, 1);

    let disk = only(&store, Collection::VirtualDisks);
    assert_eq!(disk.reference_id("virtual_machine"), Some(first.id));
}

#[tokio::test]
async fn test_vm_lookup_is_scoped_to_cluster() {
    let store = store();
    store.insert(
        Collection::VirtualMachines,
        json!({"name": "web1", "cluster": 99, "comments": "hand-written"}),
    );

    Reconciler::new(&store, ReconcileOptions::new(CLUSTER_ID))
        .run(&[web1()])
        .await
        .expect("cluster exists");

    let vms = store.records(Collection::VirtualMachines);
    assert_eq!(vms.len(), 2);
    assert_eq!(vms[0].str_field("comments"), Some("hand-written"));
}

#[tokio::test]
async fn test_shared_mac_stays_with_first_interface() {
    let mut vm = web1();
    vm.interfaces.push(InterfaceInfo {
        name: "eth0.100".to_string(),
        mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
        ip_addresses: vec![IpEntry::new("10.0.100.5", 24)],
    });

    let store = store();
    let reconciler = Reconciler::new(&store, ReconcileOptions::new(CLUSTER_ID));
    for _ in 0..2 {
        let summary = reconciler.run(&[vm.clone()]).await.expect("cluster exists");
        assert!(summary.is_complete(), "failed: {:?}", summary.failed);
    }

    let mac = only(&store, Collection::MacAddresses);
    let interfaces = store.records(Collection::VmInterfaces);
    let eth0 = interfaces
        .iter()
        .find(|i| i.str_field("name") == Some("eth0"))
        .expect("eth0");
    let vlan = interfaces
        .iter()
        .find(|i| i.str_field("name") == Some("eth0.100"))
        .expect("eth0.100");

    assert_eq!(mac.reference_id("assigned_object_id"), Some(eth0.id));
    assert_eq!(eth0.reference_id("primary_mac_address"), Some(mac.id));
    assert_eq!(vlan.reference_id("primary_mac_address"), None);
    assert_eq!(store.records(Collection::IpAddresses).len(), 2);
}

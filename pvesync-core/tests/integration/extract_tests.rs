//! Extractor tests against an in-process hypervisor

use pvesync_core::extract::{Extractor, GuestSummary, NetworkFilter, RawConfig};
use pvesync_core::snapshot::{IpEntry, VmKind, VmSnapshot, VmStatus};

use super::support::{FakeCluster, agent_iface, web1, web1_config};

#[tokio::test]
async fn test_web1_extracted_from_agent_data() {
    let cluster = FakeCluster::new(&["pve1"])
        .guest(
            "pve1",
            VmKind::Qemu,
            GuestSummary::new(101, "web1", "running"),
            Some(web1_config()),
        )
        .agent(
            "pve1",
            101,
            vec![
                agent_iface(
                    "lo",
                    "00:00:00:00:00:00",
                    &[("127.0.0.1", "ipv4", Some(8)), ("::1", "ipv6", Some(128))],
                ),
                agent_iface(
                    "eth0",
                    "AA:BB:CC:DD:EE:FF",
                    &[
                        ("10.0.0.5", "ipv4", Some(24)),
                        ("fe80::a8bb:ccff:fedd:eeff", "ipv6", Some(64)),
                    ],
                ),
                agent_iface(
                    "docker0",
                    "02:42:0a:00:00:01",
                    &[("172.17.0.1", "ipv4", Some(16))],
                ),
            ],
        );

    let result = Extractor::new(&cluster, NetworkFilter::default())
        .run()
        .await
        .expect("extraction succeeds");

    assert_eq!(result.vms, vec![web1()]);
    assert!(!result.has_skipped());
}

#[tokio::test]
async fn test_offline_guest_gets_minimal_record_without_config_fetch() {
    // No config registered: a fetch would fail and mark the guest skipped.
    let cluster = FakeCluster::new(&["node-7"]).guest(
        "node-7",
        VmKind::Qemu,
        GuestSummary::new(200, "vm-test", "stopped"),
        None,
    );

    let result = Extractor::new(&cluster, NetworkFilter::default())
        .run()
        .await
        .expect("extraction succeeds");

    assert_eq!(
        result.vms,
        vec![VmSnapshot::offline("vm-test", VmKind::Qemu, "node-7")]
    );
    assert!(result.skipped.is_empty());
}

#[tokio::test]
async fn test_agent_failure_falls_back_to_config_interfaces() {
    let cluster = FakeCluster::new(&["pve1"]).guest(
        "pve1",
        VmKind::Qemu,
        GuestSummary::new(101, "web1", "running"),
        Some(web1_config()),
    );

    let result = Extractor::new(&cluster, NetworkFilter::default())
        .run()
        .await
        .expect("extraction succeeds");

    let vm = &result.vms[0];
    assert_eq!(vm.status, VmStatus::Running);
    assert_eq!(vm.interfaces.len(), 1);
    assert_eq!(vm.interfaces[0].name, "vmbr0");
    assert_eq!(vm.interfaces[0].mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
    assert!(vm.interfaces[0].ip_addresses.is_empty());
}

#[tokio::test]
async fn test_lxc_container_parsed_from_config() {
    let mut config = RawConfig::from_pairs([
        ("rootfs", "local-lvm:subvol-300-disk-0,size=8G"),
        ("mp0", "tank:subvol-300-disk-1,mp=/srv,size=16G"),
        (
            "net0",
            "name=eth0,bridge=vmbr0,hwaddr=BC:24:11:AA:00:01,ip=192.168.10.30/24,ip6=2001:db8::30/64,type=veth",
        ),
        ("ostype", "debian"),
    ]);
    config.insert("memory", serde_json::json!(1024));

    let cluster = FakeCluster::new(&["pve2"]).guest(
        "pve2",
        VmKind::Lxc,
        GuestSummary::new(300, "ct-dns", "running"),
        Some(config),
    );

    let result = Extractor::new(&cluster, NetworkFilter::default())
        .run()
        .await
        .expect("extraction succeeds");

    let vm = &result.vms[0];
    assert_eq!(vm.kind, VmKind::Lxc);
    assert_eq!(vm.os_type.as_deref(), Some("debian"));
    assert_eq!(vm.vcpu_count, Some(1));
    assert_eq!(vm.memory_mb, Some(1024));
    assert_eq!(vm.total_disk_gb(), 24);
    assert_eq!(
        vm.interfaces[0].ip_addresses,
        vec![
            IpEntry::new("192.168.10.30", 24),
            IpEntry::new("2001:db8::30", 64)
        ]
    );
}

#[tokio::test]
async fn test_qemu_guests_precede_containers_per_node() {
    let cluster = FakeCluster::new(&["a", "b"])
        .guest("a", VmKind::Lxc, GuestSummary::new(1, "a-ct", "stopped"), None)
        .guest("a", VmKind::Qemu, GuestSummary::new(2, "a-vm", "stopped"), None)
        .guest("b", VmKind::Qemu, GuestSummary::new(3, "b-vm", "stopped"), None);

    let result = Extractor::new(&cluster, NetworkFilter::default())
        .run()
        .await
        .expect("extraction succeeds");

    let names: Vec<_> = result.vms.iter().map(|vm| vm.name.as_str()).collect();
    assert_eq!(names, vec!["a-vm", "a-ct", "b-vm"]);
}

#[tokio::test]
async fn test_node_and_config_failures_do_not_abort() {
    let mut cluster = FakeCluster::new(&["down", "up"])
        .guest("down", VmKind::Qemu, GuestSummary::new(1, "lost", "running"), None)
        .guest("up", VmKind::Qemu, GuestSummary::new(2, "broken", "running"), None)
        .guest("up", VmKind::Qemu, GuestSummary::new(3, "idle", "stopped"), None);
    cluster.unreachable_nodes.insert("down".to_string());

    let result = Extractor::new(&cluster, NetworkFilter::default())
        .run()
        .await
        .expect("extraction succeeds");

    assert_eq!(result.failed_nodes, vec!["down".to_string()]);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].identifier, "broken");
    assert_eq!(result.skipped[0].location.as_deref(), Some("up/qemu/2"));
    assert_eq!(result.vms.len(), 1);
    assert_eq!(result.vms[0].name, "idle");
}

#[tokio::test]
async fn test_unreachable_cluster_is_fatal() {
    let mut cluster = FakeCluster::new(&["pve1"]);
    cluster.offline = true;

    let result = Extractor::new(&cluster, NetworkFilter::default()).run().await;
    assert!(result.is_err());
}

//! Property tests for guest configuration parsing

use proptest::prelude::*;
use pvesync_core::extract::{RawConfig, extract_lxc_disks, extract_qemu_disks, parse_disk_size};

/// Strategy for the volume part of a disk value
fn volume_strategy() -> impl Strategy<Value = String> {
    "[a-z]{2,8}(-[a-z]{2,4})?:vm-[0-9]{3}-disk-[0-9]"
}

/// Strategy for a disk bus key
fn disk_key_strategy() -> impl Strategy<Value = String> {
    (prop::sample::select(vec!["scsi", "virtio", "sata", "ide"]), 0u32..31)
        .prop_map(|(bus, index)| format!("{bus}{index}"))
}

proptest! {
    /// Property: `G` sizes are taken as is
    #[test]
    fn gigabyte_sizes_are_exact(volume in volume_strategy(), n in 0u64..100_000) {
        prop_assert_eq!(parse_disk_size(&format!("{volume},size={n}G")), n);
    }

    /// Property: `M` sizes are divided by 1024 and rounded
    #[test]
    fn megabyte_sizes_are_rounded(volume in volume_strategy(), n in 0u64..10_000_000) {
        let expected = (n as f64 / 1024.0).round_ties_even() as u64;
        prop_assert_eq!(parse_disk_size(&format!("{volume},size={n}M")), expected);
    }

    /// Property: `K` sizes are divided by 1024 twice and rounded
    #[test]
    fn kilobyte_sizes_are_rounded(n in 0u64..10_000_000_000) {
        let expected = (n as f64 / 1024.0 / 1024.0).round_ties_even() as u64;
        prop_assert_eq!(parse_disk_size(&format!("size={n}K")), expected);
    }

    /// Property: values without a size token parse as zero
    #[test]
    fn missing_size_token_is_zero(volume in volume_strategy()) {
        prop_assert_eq!(parse_disk_size(&volume), 0);
        prop_assert_eq!(parse_disk_size(&format!("{volume},size=")), 0);
    }

    /// Property: removable media and cloud-init drives never become disks,
    /// whatever bus they sit on
    #[test]
    fn cdrom_and_cloudinit_are_excluded(
        key in disk_key_strategy(),
        volume in volume_strategy(),
        cloudinit in any::<bool>(),
    ) {
        let value = if cloudinit {
            format!("{volume}-cloudinit,size=4M")
        } else {
            format!("{volume},media=cdrom,size=700M")
        };
        let config = RawConfig::from_pairs([(key, value)]);
        prop_assert!(extract_qemu_disks(&config).is_empty());
    }

    /// Property: every regular bus entry becomes exactly one disk
    #[test]
    fn regular_disks_are_kept(
        keys in prop::collection::btree_set(disk_key_strategy(), 1..8),
        volume in volume_strategy(),
        size in 1u64..4096,
    ) {
        let config = RawConfig::from_pairs(
            keys.iter().map(|k| (k.clone(), format!("{volume},size={size}G"))),
        );
        let disks = extract_qemu_disks(&config);
        prop_assert_eq!(disks.len(), keys.len());
        prop_assert!(disks.iter().all(|d| d.size_gb == size));
    }

    /// Property: a container always yields its root filesystem first
    #[test]
    fn lxc_rootfs_comes_first(mount_points in 0usize..6, size in 1u64..512) {
        let mut pairs = vec![("rootfs".to_string(), format!("local:ct,size={size}G"))];
        pairs.extend((0..mount_points).map(|i| (format!("mp{i}"), "data,size=1G".to_string())));

        let disks = extract_lxc_disks(&RawConfig::from_pairs(pairs));
        prop_assert_eq!(disks.len(), mount_points + 1);
        prop_assert_eq!(disks[0].name.as_str(), "rootfs");
        prop_assert_eq!(disks[0].size_gb, size);
    }
}

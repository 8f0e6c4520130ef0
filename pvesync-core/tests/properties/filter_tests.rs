//! Property tests for interface and address filtering

use std::net::{Ipv4Addr, Ipv6Addr};

use proptest::prelude::*;
use pvesync_core::config::DEFAULT_SKIP_PREFIXES;
use pvesync_core::extract::{AgentAddress, AgentInterface, NetworkFilter, interfaces_from_agent};

fn agent_interface(name: String) -> AgentInterface {
    AgentInterface {
        name,
        hardware_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
        ip_addresses: vec![AgentAddress {
            ip_address: "192.0.2.10".to_string(),
            ip_address_type: "ipv4".to_string(),
            prefix: Some(24),
        }],
    }
}

proptest! {
    /// Property: interfaces named with a virtual prefix never appear
    #[test]
    fn prefixed_interfaces_are_dropped(
        prefix in prop::sample::select(DEFAULT_SKIP_PREFIXES.to_vec()),
        suffix in "[a-z0-9]{0,8}",
    ) {
        let filter = NetworkFilter::default();
        let agent = vec![agent_interface(format!("{prefix}{suffix}"))];
        prop_assert!(interfaces_from_agent(&agent, &filter).is_empty());
    }

    /// Property: ordinary NIC names are kept with their address
    #[test]
    fn ordinary_interfaces_are_kept(name in "(eth|ens|enp)[0-9]{1,3}") {
        let filter = NetworkFilter::default();
        let agent = vec![agent_interface(name.clone())];
        let kept = interfaces_from_agent(&agent, &filter);
        prop_assert_eq!(kept.len(), 1);
        prop_assert_eq!(&kept[0].name, &name);
        prop_assert_eq!(kept[0].ip_addresses.len(), 1);
    }

    /// Property: loopback IPv4 addresses are always dropped
    #[test]
    fn ipv4_loopback_is_dropped(b in any::<u8>(), c in any::<u8>(), d in any::<u8>()) {
        let filter = NetworkFilter::default();
        prop_assert!(!filter.keeps_address(&Ipv4Addr::new(127, b, c, d).to_string()));
    }

    /// Property: the container-bridge range 172.16.0.0/12 is dropped
    #[test]
    fn container_range_is_dropped(b in 16u8..32, c in any::<u8>(), d in any::<u8>()) {
        let filter = NetworkFilter::default();
        prop_assert!(!filter.keeps_address(&Ipv4Addr::new(172, b, c, d).to_string()));
    }

    /// Property: IPv6 link-local addresses are dropped
    #[test]
    fn ipv6_link_local_is_dropped(segments in prop::array::uniform7(any::<u16>()), low in 0u16..0x40) {
        let filter = NetworkFilter::default();
        let addr = Ipv6Addr::new(
            0xfe80 | low,
            segments[0],
            segments[1],
            segments[2],
            segments[3],
            segments[4],
            segments[5],
            segments[6],
        );
        prop_assert!(!filter.keeps_address(&addr.to_string()));
    }

    /// Property: global unicast IPv4 outside the excluded ranges is kept
    #[test]
    fn documentation_range_is_kept(d in 1u8..255) {
        let filter = NetworkFilter::default();
        prop_assert!(filter.keeps_address(&Ipv4Addr::new(198, 51, 100, d).to_string()));
    }
}

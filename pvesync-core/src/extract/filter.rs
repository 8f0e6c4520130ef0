//! Interface and address classification.
//!
//! Decides which guest interfaces and addresses are worth recording. The
//! same rules apply to agent data and to container configuration.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use mac_address::MacAddress;

use crate::config::{DEFAULT_EXCLUDED_IPV4, DEFAULT_SKIP_PREFIXES, FilterSettings};
use crate::error::ConfigResult;
use crate::snapshot::{IpEntry, ZERO_MAC};

/// Prefix assumed for IPv4 addresses reported without one
pub const DEFAULT_IPV4_PREFIX: u8 = 24;

/// Prefix assumed for IPv6 addresses reported without one
pub const DEFAULT_IPV6_PREFIX: u8 = 64;

/// Interface and address filter
#[derive(Debug, Clone)]
pub struct NetworkFilter {
    skip_prefixes: Vec<String>,
    excluded_ipv4: Vec<IpNetwork>,
}

impl Default for NetworkFilter {
    fn default() -> Self {
        Self {
            skip_prefixes: DEFAULT_SKIP_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            excluded_ipv4: DEFAULT_EXCLUDED_IPV4
                .iter()
                .filter_map(|n| n.parse().ok())
                .collect(),
        }
    }
}

impl NetworkFilter {
    /// Creates a filter from explicit lists
    #[must_use]
    pub fn new(skip_prefixes: Vec<String>, excluded_ipv4: Vec<IpNetwork>) -> Self {
        Self {
            skip_prefixes,
            excluded_ipv4,
        }
    }

    /// Builds the filter from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an excluded network does not parse.
    pub fn from_settings(settings: &FilterSettings) -> ConfigResult<Self> {
        Ok(Self::new(
            settings.skip_prefixes(),
            settings.excluded_networks()?,
        ))
    }

    /// Returns true if the interface name starts with a skipped prefix
    /// (case-sensitive)
    #[must_use]
    pub fn skips_interface(&self, name: &str) -> bool {
        self.skip_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Returns true if the address should be recorded.
    ///
    /// Loopback and IPv6 link-local addresses are always dropped, as are IPv4
    /// addresses inside an excluded network and anything that does not parse.
    #[must_use]
    pub fn keeps_address(&self, ip: &str) -> bool {
        match ip.trim().parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => {
                !v4.is_loopback()
                    && !self
                        .excluded_ipv4
                        .iter()
                        .any(|net| net.contains(IpAddr::V4(v4)))
            }
            Ok(IpAddr::V6(v6)) => !v6.is_loopback() && !is_ipv6_link_local(&v6),
            Err(_) => false,
        }
    }

    /// Builds an entry for a kept address, filling the default prefix for
    /// its family when none was reported
    #[must_use]
    pub fn entry(&self, ip: &str, prefix: Option<u8>) -> Option<IpEntry> {
        let ip = ip.trim();
        if !self.keeps_address(ip) {
            return None;
        }
        let prefix = prefix.unwrap_or(if ip.contains(':') {
            DEFAULT_IPV6_PREFIX
        } else {
            DEFAULT_IPV4_PREFIX
        });
        Some(IpEntry::new(ip, prefix))
    }
}

fn is_ipv6_link_local(addr: &std::net::Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// Normalizes a MAC address to lower-case colon form.
///
/// Returns `None` for empty, malformed, and all-zero addresses.
#[must_use]
pub fn normalize_mac(raw: &str) -> Option<String> {
    let mac: MacAddress = raw.trim().parse().ok()?;
    let normalized = mac.to_string().to_lowercase();
    (normalized != ZERO_MAC).then_some(normalized)
}

//! Settings types for both remote systems and for the pipeline itself.

use std::fmt;

use ipnetwork::IpNetwork;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Port the Proxmox API listens on when the host does not name one
pub const DEFAULT_PROXMOX_PORT: u16 = 8006;

/// HTTP timeout applied to both remote systems
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Interface name prefixes that never reach the snapshot
pub const DEFAULT_SKIP_PREFIXES: [&str; 7] =
    ["br-", "lo", "Loopback", "veth", "docker", "tun", "tailscale"];

/// IPv4 networks that never reach the snapshot: loopback and the
/// container-engine bridge range
pub const DEFAULT_EXCLUDED_IPV4: [&str; 2] = ["127.0.0.0/8", "172.16.0.0/12"];

/// Interface name that triggers per-VM VRF handling
pub const DEFAULT_CONTAINER_BRIDGE: &str = "docker0";

/// Proxmox settings as read from one configuration layer
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxmoxSection {
    /// API host, optionally with scheme and port
    pub host: Option<String>,
    /// API user in `user@realm` form
    pub user: Option<String>,
    /// API token name
    pub token_name: Option<String>,
    /// API token secret
    pub token_value: Option<String>,
    /// Whether to verify the server certificate
    pub verify_ssl: Option<bool>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for ProxmoxSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxmoxSection")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("token_name", &self.token_name)
            .field("token_value", &self.token_value.as_ref().map(|_| "[REDACTED]"))
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProxmoxSection {
    /// Fills every unset field from a lower-precedence layer
    #[must_use]
    pub fn overlay(self, lower: Self) -> Self {
        Self {
            host: self.host.or(lower.host),
            user: self.user.or(lower.user),
            token_name: self.token_name.or(lower.token_name),
            token_value: self.token_value.or(lower.token_value),
            verify_ssl: self.verify_ssl.or(lower.verify_ssl),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
        }
    }

    /// Resolves the layer into validated settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the environment variable of the
    /// first required value that is absent or blank.
    pub fn resolve(self) -> ConfigResult<ProxmoxSettings> {
        let settings = ProxmoxSettings {
            host: required(self.host, "PROXMOX_HOST")?,
            user: required(self.user, "PROXMOX_USER")?,
            token_name: required(self.token_name, "API_TOKEN_NAME")?,
            token_value: SecretString::from(required(self.token_value, "API_TOKEN_VALUE")?),
            verify_ssl: self.verify_ssl.unwrap_or(false),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Resolved Proxmox connection settings
#[derive(Debug)]
pub struct ProxmoxSettings {
    /// API host, optionally with scheme and port
    pub host: String,
    /// API user in `user@realm` form
    pub user: String,
    /// API token name
    pub token_name: String,
    /// API token secret
    pub token_value: SecretString,
    /// Whether to verify the server certificate
    pub verify_ssl: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ProxmoxSettings {
    /// Checks the settings before any request is made.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is blank or malformed.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("PROXMOX_HOST"));
        }
        if !self.user.contains('@') {
            return Err(ConfigError::Invalid {
                field: "PROXMOX_USER",
                reason: format!("expected user@realm, got '{}'", self.user),
            });
        }
        if self.token_value.expose_secret().is_empty() {
            return Err(ConfigError::Missing("API_TOKEN_VALUE"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the API base URL (`https://host:8006/api2/json`)
    #[must_use]
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        let with_scheme = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let authority = with_scheme
            .split_once("://")
            .map_or(with_scheme.as_str(), |(_, rest)| rest);
        let has_port = authority
            .rsplit_once(':')
            .is_some_and(|(_, port)| port.parse::<u16>().is_ok())
            && !authority.ends_with(']');

        if has_port {
            format!("{with_scheme}/api2/json")
        } else {
            format!("{with_scheme}:{DEFAULT_PROXMOX_PORT}/api2/json")
        }
    }

    /// Returns the `Authorization` header value for API token auth
    #[must_use]
    pub fn authorization(&self) -> String {
        format!(
            "PVEAPIToken={}!{}={}",
            self.user,
            self.token_name,
            self.token_value.expose_secret()
        )
    }
}

/// NetBox settings as read from one configuration layer
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetboxSection {
    /// Base URL of the NetBox instance
    pub url: Option<String>,
    /// API token
    pub token: Option<String>,
    /// Cluster that imported VMs belong to
    pub cluster_id: Option<u64>,
    /// Whether to verify the server certificate
    pub verify_ssl: Option<bool>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for NetboxSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetboxSection")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("cluster_id", &self.cluster_id)
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl NetboxSection {
    /// Fills every unset field from a lower-precedence layer
    #[must_use]
    pub fn overlay(self, lower: Self) -> Self {
        Self {
            url: self.url.or(lower.url),
            token: self.token.or(lower.token),
            cluster_id: self.cluster_id.or(lower.cluster_id),
            verify_ssl: self.verify_ssl.or(lower.verify_ssl),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
        }
    }

    /// Resolves the layer into validated settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the environment variable of the
    /// first required value that is absent or blank.
    pub fn resolve(self) -> ConfigResult<NetboxSettings> {
        let settings = NetboxSettings {
            url: required(self.url, "NETBOX_URL")?,
            token: SecretString::from(required(self.token, "NETBOX_TOKEN")?),
            cluster_id: self.cluster_id.ok_or(ConfigError::Missing("CLUSTER_ID"))?,
            verify_ssl: self.verify_ssl.unwrap_or(true),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Resolved NetBox connection settings
#[derive(Debug)]
pub struct NetboxSettings {
    /// Base URL of the NetBox instance
    pub url: String,
    /// API token
    pub token: SecretString,
    /// Cluster that imported VMs belong to
    pub cluster_id: u64,
    /// Whether to verify the server certificate
    pub verify_ssl: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl NetboxSettings {
    /// Checks the settings before any request is made.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is blank or malformed.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "NETBOX_URL",
                reason: format!("expected an http(s) URL, got '{}'", self.url),
            });
        }
        if self.token.expose_secret().is_empty() {
            return Err(ConfigError::Missing("NETBOX_TOKEN"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the API root (`<url>/api`)
    #[must_use]
    pub fn api_root(&self) -> String {
        format!("{}/api", self.url.trim_end_matches('/'))
    }

    /// Returns the `Authorization` header value
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Token {}", self.token.expose_secret())
    }
}

/// Which interfaces and addresses the extractor drops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSettings {
    /// Interface name prefixes added to the built-in list
    pub extra_skip_prefixes: Vec<String>,
    /// IPv4 networks whose addresses are dropped
    pub excluded_ipv4_networks: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            extra_skip_prefixes: Vec::new(),
            excluded_ipv4_networks: DEFAULT_EXCLUDED_IPV4.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl FilterSettings {
    /// Built-in skip prefixes followed by the configured extras
    #[must_use]
    pub fn skip_prefixes(&self) -> Vec<String> {
        DEFAULT_SKIP_PREFIXES
            .iter()
            .map(|p| (*p).to_string())
            .chain(self.extra_skip_prefixes.iter().cloned())
            .collect()
    }

    /// Parses the excluded IPv4 networks.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for entries that are not IPv4 CIDRs.
    pub fn excluded_networks(&self) -> ConfigResult<Vec<IpNetwork>> {
        self.excluded_ipv4_networks
            .iter()
            .map(|raw| match raw.parse::<IpNetwork>() {
                Ok(net @ IpNetwork::V4(_)) => Ok(net),
                Ok(IpNetwork::V6(_)) => Err(ConfigError::Invalid {
                    field: "excluded_ipv4_networks",
                    reason: format!("'{raw}' is not an IPv4 network"),
                }),
                Err(e) => Err(ConfigError::Invalid {
                    field: "excluded_ipv4_networks",
                    reason: format!("'{raw}': {e}"),
                }),
            })
            .collect()
    }
}

/// Behaviour switches for the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileSettings {
    /// Put the container-engine bridge of every VM into its own VRF
    pub vrf_per_container_bridge: bool,
    /// Interface name that counts as the container-engine bridge
    pub container_bridge: String,
    /// Fail a VM instead of taking the first match when a lookup is ambiguous
    pub strict_matching: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            vrf_per_container_bridge: false,
            container_bridge: DEFAULT_CONTAINER_BRIDGE.to_string(),
            strict_matching: false,
        }
    }
}

fn required(value: Option<String>, name: &'static str) -> ConfigResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

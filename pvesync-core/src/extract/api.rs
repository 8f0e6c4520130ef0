//! Hypervisor read surface and its response types.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::error::ProxmoxResult;
use crate::snapshot::VmKind;

/// A cluster node from `/nodes`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfo {
    /// Node name
    pub node: String,
    /// Node status (`online`, `offline`, `unknown`)
    #[serde(default)]
    pub status: Option<String>,
}

impl NodeInfo {
    /// Creates a node entry
    #[must_use]
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            status: None,
        }
    }
}

/// A guest from `/nodes/{node}/qemu` or `/nodes/{node}/lxc`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuestSummary {
    /// Guest identifier; containers report it as a string on some releases
    #[serde(deserialize_with = "lenient_u32")]
    pub vmid: u32,
    /// Guest name
    #[serde(default)]
    pub name: Option<String>,
    /// Power state (`running`, `stopped`, ...)
    #[serde(default)]
    pub status: String,
}

impl GuestSummary {
    /// Creates a guest entry
    #[must_use]
    pub fn new(vmid: u32, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            vmid,
            name: Some(name.into()),
            status: status.into(),
        }
    }

    /// Guest name, or the numeric id when the guest has none
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .map_or_else(|| self.vmid.to_string(), str::to_string)
    }
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| D::Error::custom(format!("vmid out of range: {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid vmid: {s}"))),
        other => Err(D::Error::custom(format!("invalid vmid: {other}"))),
    }
}

/// Raw guest configuration: config key to free-form value.
///
/// Values arrive as JSON strings or numbers depending on the key; accessors
/// read both.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawConfig(BTreeMap<String, serde_json::Value>);

impl RawConfig {
    /// Builds a config from string pairs
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), serde_json::Value::String(v.into())))
                .collect(),
        )
    }

    /// Inserts or replaces a value
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    /// Iterates over all keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns a value rendered as text
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Returns a value as an unsigned integer; numeric strings and
    /// fractional numbers are truncated, anything else is `None`
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            serde_json::Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            serde_json::Value::String(s) => {
                let s = s.trim();
                s.parse::<u64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as u64)
                })
            }
            _ => None,
        }
    }
}

/// Reply of the guest agent `network-get-interfaces` command
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentNetworkReply {
    /// Reported interfaces
    #[serde(default)]
    pub result: Vec<AgentInterface>,
}

/// One interface as reported by the guest agent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentInterface {
    /// Interface name inside the guest
    pub name: String,
    /// MAC address
    #[serde(rename = "hardware-address", default)]
    pub hardware_address: Option<String>,
    /// Configured addresses
    #[serde(rename = "ip-addresses", default)]
    pub ip_addresses: Vec<AgentAddress>,
}

/// One address as reported by the guest agent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentAddress {
    /// Address literal
    #[serde(rename = "ip-address")]
    pub ip_address: String,
    /// `ipv4` or `ipv6`
    #[serde(rename = "ip-address-type", default)]
    pub ip_address_type: String,
    /// Prefix length, when reported
    #[serde(default)]
    pub prefix: Option<u8>,
}

/// Read-only view of a Proxmox VE cluster.
///
/// Implemented over HTTP by [`super::ProxmoxClient`]; tests supply their own.
#[async_trait]
pub trait HypervisorApi: Send + Sync {
    /// Returns the cluster version string; used as the connectivity probe
    async fn version(&self) -> ProxmoxResult<String>;

    /// Lists cluster nodes
    async fn list_nodes(&self) -> ProxmoxResult<Vec<NodeInfo>>;

    /// Lists guests of one kind on a node
    async fn list_guests(&self, node: &str, kind: VmKind) -> ProxmoxResult<Vec<GuestSummary>>;

    /// Fetches a guest's configuration
    async fn guest_config(&self, node: &str, kind: VmKind, vmid: u32) -> ProxmoxResult<RawConfig>;

    /// Queries the QEMU guest agent for live interface data
    async fn agent_network_interfaces(
        &self,
        node: &str,
        vmid: u32,
    ) -> ProxmoxResult<Vec<AgentInterface>>;
}

//! Inventory extraction from a Proxmox VE cluster.
//!
//! The [`Extractor`] walks every node, lists QEMU VMs before LXC containers,
//! and turns each guest into a [`VmSnapshot`]. Failures below the cluster
//! level never abort the pass: a node that cannot be listed is recorded in
//! [`ExtractionResult::failed_nodes`], a guest whose configuration cannot be
//! fetched in [`ExtractionResult::skipped`].

pub mod api;
pub mod filter;
pub mod parse;
mod proxmox;

use tracing::Instrument;

pub use api::{
    AgentAddress, AgentInterface, AgentNetworkReply, GuestSummary, HypervisorApi, NodeInfo,
    RawConfig,
};
pub use filter::{DEFAULT_IPV4_PREFIX, DEFAULT_IPV6_PREFIX, NetworkFilter, normalize_mac};
pub use parse::{
    ParsedGuest, extract_lxc_disks, extract_qemu_disks, interfaces_from_agent,
    interfaces_from_lxc_config, interfaces_from_qemu_config, normalize_os_type, parse_disk_size,
    parse_guest_config,
};
pub use proxmox::ProxmoxClient;

use crate::error::ProxmoxResult;
use crate::snapshot::{VmKind, VmSnapshot, VmStatus};
use crate::tracing::span_names;

/// A guest that was seen but could not be extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Guest name or id
    pub identifier: String,
    /// Reason why the guest was skipped
    pub reason: String,
    /// Node and guest id, e.g. `pve1/qemu/101`
    pub location: Option<String>,
}

impl SkippedEntry {
    /// Creates a new skipped entry
    #[must_use]
    pub fn new(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reason: reason.into(),
            location: None,
        }
    }

    /// Creates a new skipped entry with location information
    #[must_use]
    pub fn with_location(
        identifier: impl Into<String>,
        reason: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            reason: reason.into(),
            location: Some(location.into()),
        }
    }
}

/// Outcome of one extraction pass
#[derive(Debug, Default)]
pub struct ExtractionResult {
    /// Extracted guests in node-then-guest order
    pub vms: Vec<VmSnapshot>,
    /// Running guests whose configuration could not be fetched
    pub skipped: Vec<SkippedEntry>,
    /// Nodes whose guest lists could not be fetched
    pub failed_nodes: Vec<String>,
}

impl ExtractionResult {
    /// Number of running guests in the snapshot
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.vms.iter().filter(|vm| vm.is_running()).count()
    }

    /// Returns true if any guest or node was left out
    #[must_use]
    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty() || !self.failed_nodes.is_empty()
    }

    /// Returns a summary string of the pass
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "VMs: {} ({} running), Skipped: {}, Failed nodes: {}",
            self.vms.len(),
            self.running_count(),
            self.skipped.len(),
            self.failed_nodes.len()
        )
    }
}

/// Walks a cluster and builds the inventory snapshot
pub struct Extractor<'a, A: HypervisorApi + ?Sized> {
    api: &'a A,
    filter: NetworkFilter,
}

impl<'a, A: HypervisorApi + ?Sized> Extractor<'a, A> {
    /// Creates an extractor over the given API
    #[must_use]
    pub const fn new(api: &'a A, filter: NetworkFilter) -> Self {
        Self { api, filter }
    }

    /// Runs one extraction pass.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cluster cannot be reached: the version
    /// probe or the node listing failed.
    pub async fn run(&self) -> ProxmoxResult<ExtractionResult> {
        self.run_inner()
            .instrument(tracing::info_span!(span_names::EXTRACT_RUN))
            .await
    }

    async fn run_inner(&self) -> ProxmoxResult<ExtractionResult> {
        let version = self.api.version().await?;
        tracing::info!(%version, "Connected to Proxmox VE");

        let nodes = self.api.list_nodes().await?;
        tracing::info!(
            count = nodes.len(),
            nodes = ?nodes.iter().map(|n| n.node.as_str()).collect::<Vec<_>>(),
            "Found nodes"
        );

        let mut result = ExtractionResult::default();
        for node in &nodes {
            self.extract_node(&node.node, &mut result)
                .instrument(tracing::info_span!(span_names::EXTRACT_NODE, node = %node.node))
                .await;
        }

        tracing::info!(
            total = result.vms.len(),
            running = result.running_count(),
            skipped = result.skipped.len(),
            failed_nodes = result.failed_nodes.len(),
            "Total VMs processed: {}",
            result.vms.len()
        );
        Ok(result)
    }

    async fn extract_node(&self, node: &str, result: &mut ExtractionResult) {
        let mut guests = Vec::new();
        for kind in VmKind::ALL {
            match self.api.list_guests(node, kind).await {
                Ok(list) => {
                    tracing::info!(count = list.len(), %kind, "Found guests");
                    guests.extend(list.into_iter().map(|guest| (kind, guest)));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to process node");
                    result.failed_nodes.push(node.to_string());
                    return;
                }
            }
        }

        for (kind, guest) in guests {
            let span = tracing::info_span!(
                span_names::EXTRACT_GUEST,
                vmid = guest.vmid,
                %kind
            );
            match self.extract_guest(node, kind, &guest).instrument(span).await {
                Ok(vm) => result.vms.push(vm),
                Err(skipped) => result.skipped.push(skipped),
            }
        }
    }

    async fn extract_guest(
        &self,
        node: &str,
        kind: VmKind,
        guest: &GuestSummary,
    ) -> Result<VmSnapshot, SkippedEntry> {
        let name = guest.display_name();
        tracing::info!(%name, status = %guest.status, "Processing guest");

        if VmStatus::from_hypervisor(&guest.status) == VmStatus::Offline {
            tracing::warn!(%name, "Guest is not running, marking as offline");
            return Ok(VmSnapshot::offline(name, kind, node));
        }

        let config = match self.api.guest_config(node, kind, guest.vmid).await {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(%name, error = %e, "Failed to get guest config");
                return Err(SkippedEntry::with_location(
                    name,
                    e.to_string(),
                    format!("{node}/{kind}/{}", guest.vmid),
                ));
            }
        };

        let mut parsed = parse_guest_config(kind, &config, &self.filter);
        tracing::debug!(%name, disks = parsed.disks.len(), "Parsed guest config");

        if kind == VmKind::Qemu {
            match self.api.agent_network_interfaces(node, guest.vmid).await {
                Ok(agent) => parsed.interfaces = interfaces_from_agent(&agent, &self.filter),
                Err(e) => {
                    tracing::warn!(
                        %name,
                        error = %e,
                        "Agent data not available, using config interfaces"
                    );
                }
            }
        }

        let vm = parsed.into_snapshot(name, kind, node);
        tracing::info!(
            name = %vm.name,
            interfaces = vm.interfaces.len(),
            ipv4 = vm.ipv4_count(),
            ipv6 = vm.ipv6_count(),
            disks = vm.disks.len(),
            disk_gb = vm.total_disk_gb(),
            "Added guest"
        );
        Ok(vm)
    }
}

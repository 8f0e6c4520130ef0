//! Snapshot reconciliation into the record store.
//!
//! Each VM runs its own cascade: platform, VM record, disks, then interfaces
//! with their MAC, IP and optional VRF records. The first failing step
//! abandons the rest of that VM; the run moves on to the next one.

pub mod payload;
mod upsert;

use std::collections::{BTreeMap, HashMap};

use tracing::Instrument;

pub use upsert::{MatchPolicy, UpsertMode, UpsertOutcome, get_or_create};

use crate::config::{DEFAULT_CONTAINER_BRIDGE, ReconcileSettings};
use crate::error::{ReconcileError, ReconcileResult};
use crate::netbox::{Collection, Query, Record, RecordStore};
use crate::snapshot::{InterfaceInfo, VmSnapshot};
use crate::tracing::span_names;

/// Reconciler behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Cluster every VM is assigned to
    pub cluster_id: u64,
    /// Ambiguous lookup handling
    pub policy: MatchPolicy,
    /// Give the container-engine bridge of every VM its own VRF
    pub vrf_per_container_bridge: bool,
    /// Interface name treated as the container-engine bridge
    pub container_bridge: String,
}

impl ReconcileOptions {
    /// Options with defaults for the given cluster
    #[must_use]
    pub fn new(cluster_id: u64) -> Self {
        Self {
            cluster_id,
            policy: MatchPolicy::default(),
            vrf_per_container_bridge: false,
            container_bridge: DEFAULT_CONTAINER_BRIDGE.to_string(),
        }
    }

    /// Options from resolved settings
    #[must_use]
    pub fn from_settings(cluster_id: u64, settings: &ReconcileSettings) -> Self {
        Self {
            cluster_id,
            policy: MatchPolicy::from_strict(settings.strict_matching),
            vrf_per_container_bridge: settings.vrf_per_container_bridge,
            container_bridge: settings.container_bridge.clone(),
        }
    }

    /// Returns the VRF name for an interface, if it gets one
    #[must_use]
    pub fn vrf_name(&self, vm: &str, interface: &str) -> Option<String> {
        (self.vrf_per_container_bridge && interface == self.container_bridge)
            .then(|| format!("{vm}-{interface}"))
    }
}

/// Record counts for one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Records created
    pub created: usize,
    /// Records patched
    pub updated: usize,
    /// Records found and left as is
    pub found: usize,
}

/// A VM the run could not reconcile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedVm {
    /// VM name
    pub name: String,
    /// Error that abandoned the cascade
    pub reason: String,
}

/// Outcome of one reconcile run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// VMs in the snapshot
    pub total: usize,
    /// VMs whose cascade completed
    pub succeeded: usize,
    /// VMs whose cascade was abandoned
    pub failed: Vec<FailedVm>,
    /// Per-collection record counts
    pub collections: BTreeMap<Collection, CollectionStats>,
}

impl ReconcileSummary {
    fn track(&mut self, collection: Collection, outcome: &UpsertOutcome) {
        let stats = self.collections.entry(collection).or_default();
        match outcome {
            UpsertOutcome::Created(_) => stats.created += 1,
            UpsertOutcome::Updated(_) => stats.updated += 1,
            UpsertOutcome::Found(_) => stats.found += 1,
        }
    }

    fn track_patch(&mut self, collection: Collection) {
        self.collections.entry(collection).or_default().updated += 1;
    }

    /// Counts for one collection
    #[must_use]
    pub fn stats(&self, collection: Collection) -> CollectionStats {
        self.collections
            .get(&collection)
            .copied()
            .unwrap_or_default()
    }

    /// Records created across all collections
    #[must_use]
    pub fn total_created(&self) -> usize {
        self.collections.values().map(|s| s.created).sum()
    }

    /// Returns true if every VM was reconciled
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the closing summary line
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Successfully imported {}/{} VMs",
            self.succeeded, self.total
        )
    }
}

/// Writes snapshots into a record store
pub struct Reconciler<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    options: ReconcileOptions,
}

impl<'a, S: RecordStore + ?Sized> Reconciler<'a, S> {
    /// Creates a reconciler over the given store
    #[must_use]
    pub const fn new(store: &'a S, options: ReconcileOptions) -> Self {
        Self { store, options }
    }

    /// Options in effect
    #[must_use]
    pub const fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Reconciles every VM of a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error only if the target cluster cannot be verified; VM
    /// failures are reported in the summary.
    pub async fn run(&self, vms: &[VmSnapshot]) -> ReconcileResult<ReconcileSummary> {
        self.run_inner(vms)
            .instrument(tracing::info_span!(
                span_names::RECONCILE_RUN,
                cluster_id = self.options.cluster_id
            ))
            .await
    }

    async fn run_inner(&self, vms: &[VmSnapshot]) -> ReconcileResult<ReconcileSummary> {
        let cluster = self.verify_cluster().await?;
        tracing::info!(
            cluster = cluster.str_field("name").unwrap_or_default(),
            id = cluster.id,
            "Using cluster"
        );
        tracing::info!(count = vms.len(), "Importing VMs");

        let mut summary = ReconcileSummary {
            total: vms.len(),
            ..ReconcileSummary::default()
        };

        for vm in vms {
            let span = tracing::info_span!(span_names::RECONCILE_VM, name = %vm.name);
            match self.reconcile_vm(vm, &mut summary).instrument(span).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    tracing::error!(name = %vm.name, error = %e, "Failed to import VM");
                    summary.failed.push(FailedVm {
                        name: vm.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!("{}", summary.summary());
        Ok(summary)
    }

    async fn verify_cluster(&self) -> ReconcileResult<Record> {
        self.store
            .get(Collection::Clusters, self.options.cluster_id)
            .await?
            .ok_or(ReconcileError::ClusterNotFound(self.options.cluster_id))
    }

    async fn upsert(
        &self,
        summary: &mut ReconcileSummary,
        collection: Collection,
        query: &Query,
        payload: &serde_json::Value,
        mode: UpsertMode<'_>,
    ) -> ReconcileResult<UpsertOutcome> {
        let outcome = get_or_create(
            self.store,
            collection,
            query,
            payload,
            mode,
            self.options.policy,
        )
        .await?;
        summary.track(collection, &outcome);
        Ok(outcome)
    }

    async fn reconcile_vm(
        &self,
        vm: &VmSnapshot,
        summary: &mut ReconcileSummary,
    ) -> ReconcileResult<()> {
        tracing::info!(host = %vm.host, kind = %vm.kind, status = %vm.status, "Processing VM");

        let platform = self
            .upsert(
                summary,
                Collection::Platforms,
                &Query::new().eq("name", vm.kind.as_str()),
                &payload::platform(vm.kind),
                UpsertMode::KeepExisting,
            )
            .await?;

        let vm_payload = payload::virtual_machine(vm, self.options.cluster_id, Some(platform.id()));
        let record = self
            .upsert(
                summary,
                Collection::VirtualMachines,
                &Query::new()
                    .eq("name", &vm.name)
                    .eq("cluster_id", self.options.cluster_id),
                &vm_payload,
                UpsertMode::Update(&vm_payload),
            )
            .await?;
        tracing::info!(id = record.id(), "{} VM {}", record.verb(), vm.name);

        if !vm.is_running() {
            return Ok(());
        }

        let vm_id = record.id();
        for disk in &vm.disks {
            let disk_payload = payload::virtual_disk(vm_id, disk);
            let outcome = self
                .upsert(
                    summary,
                    Collection::VirtualDisks,
                    &Query::new().eq("virtual_machine_id", vm_id).eq("name", &disk.name),
                    &disk_payload,
                    UpsertMode::Update(&disk_payload),
                )
                .await?;
            tracing::info!(size_gb = disk.size_gb, "{} disk {}", outcome.verb(), disk.name);
        }

        let mut claimed_macs = HashMap::new();
        for interface in &vm.interfaces {
            self.reconcile_interface(vm, vm_id, interface, &mut claimed_macs, summary)
                .await?;
        }
        Ok(())
    }

    async fn reconcile_interface(
        &self,
        vm: &VmSnapshot,
        vm_id: u64,
        interface: &InterfaceInfo,
        claimed_macs: &mut HashMap<String, u64>,
        summary: &mut ReconcileSummary,
    ) -> ReconcileResult<()> {
        let vrf_id = match self.options.vrf_name(&vm.name, &interface.name) {
            Some(name) => {
                let vrf = self
                    .upsert(
                        summary,
                        Collection::VrfDomains,
                        &Query::new().eq("name", &name),
                        &payload::vrf(&name),
                        UpsertMode::KeepExisting,
                    )
                    .await?;
                tracing::info!(id = vrf.id(), "{} VRF {name}", vrf.verb());
                Some(vrf.id())
            }
            None => None,
        };

        let iface_payload = payload::vm_interface(vm_id, &interface.name, vrf_id);
        let iface = self
            .upsert(
                summary,
                Collection::VmInterfaces,
                &Query::new()
                    .eq("virtual_machine_id", vm_id)
                    .eq("name", &interface.name),
                &iface_payload,
                UpsertMode::Update(&iface_payload),
            )
            .await?;
        tracing::info!(id = iface.id(), "{} interface {}", iface.verb(), interface.name);
        let iface = iface.into_record();

        if let Some(mac) = interface.usable_mac() {
            match claimed_macs.get(mac).copied() {
                Some(owner) if owner != iface.id => {
                    tracing::info!(
                        owner,
                        "MAC {mac} already belongs to another interface of this VM, not reassigning"
                    );
                }
                _ => {
                    self.assign_mac(&iface, mac, summary).await?;
                    claimed_macs.insert(mac.to_string(), iface.id);
                }
            }
        }

        for entry in &interface.ip_addresses {
            let address = entry.cidr();
            let mut query = Query::new().eq("address", &address);
            if let Some(vrf_id) = vrf_id {
                query = query.eq("vrf_id", vrf_id);
            }

            let assignment = payload::ip_assignment(iface.id, vrf_id);
            let outcome = self
                .upsert(
                    summary,
                    Collection::IpAddresses,
                    &query,
                    &payload::ip_address(entry, iface.id, vrf_id),
                    UpsertMode::Update(&assignment),
                )
                .await?;
            tracing::info!("{} IP {address}", outcome.verb());
        }
        Ok(())
    }

    async fn assign_mac(
        &self,
        iface: &Record,
        mac: &str,
        summary: &mut ReconcileSummary,
    ) -> ReconcileResult<()> {
        let assignment = payload::interface_assignment(iface.id);
        let record = self
            .upsert(
                summary,
                Collection::MacAddresses,
                &Query::new().eq("mac_address", mac),
                &payload::mac_address(mac, iface.id),
                UpsertMode::Update(&assignment),
            )
            .await?;
        tracing::debug!(id = record.id(), "{} MAC {mac}", record.verb());

        if iface.reference_id("primary_mac_address") != Some(record.id()) {
            self.store
                .patch(
                    Collection::VmInterfaces,
                    iface.id,
                    &payload::primary_mac(record.id()),
                )
                .await?;
            summary.track_patch(Collection::VmInterfaces);
        }
        Ok(())
    }
}

//! Snapshot import command.

use std::path::Path;

use pvesync_core::config::{NetboxSection, ReconcileSettings};
use pvesync_core::error::ConfigError;
use pvesync_core::netbox::{Collection, MemoryStore, NetboxClient, RecordStore};
use pvesync_core::reconcile::{ReconcileOptions, ReconcileSummary, Reconciler};
use pvesync_core::snapshot::{VmSnapshot, read_snapshot};
use tokio::runtime::Runtime;

use crate::cli::NetboxArgs;
use crate::error::CliError;
use crate::util::{create_runtime, load_settings};

/// Cluster name reported by the in-memory store
const DRY_RUN_CLUSTER: &str = "dry-run";

/// Parameters for the import command
pub struct ImportParams<'a> {
    pub file: &'a Path,
    pub netbox: NetboxArgs,
    pub dry_run: bool,
    pub strict_matching: bool,
    pub vrf_per_container_bridge: bool,
    pub container_bridge: Option<String>,
}

/// Import command handler
pub fn cmd_import(config_path: Option<&Path>, params: ImportParams<'_>) -> Result<(), CliError> {
    let file = load_settings(config_path)?;
    let vms = read_snapshot(params.file)?;

    let mut reconcile = file.reconcile;
    reconcile.strict_matching |= params.strict_matching;
    reconcile.vrf_per_container_bridge |= params.vrf_per_container_bridge;
    if let Some(bridge) = params.container_bridge {
        reconcile.container_bridge = bridge;
    }

    let section = params.netbox.into_section().overlay(file.netbox);
    let runtime = create_runtime()?;

    let summary = if params.dry_run {
        dry_run(&runtime, section, &reconcile, &vms)?
    } else {
        let settings = section.resolve()?;
        let client = NetboxClient::new(&settings)?;
        let options = ReconcileOptions::from_settings(settings.cluster_id, &reconcile);
        tracing::info!(url = %settings.url, cluster_id = settings.cluster_id, "Importing into NetBox");
        reconcile_into(&runtime, &client, options, &vms)?
    };

    print_summary(&summary, params.dry_run);
    Ok(())
}

fn dry_run(
    runtime: &Runtime,
    section: NetboxSection,
    reconcile: &ReconcileSettings,
    vms: &[VmSnapshot],
) -> Result<ReconcileSummary, CliError> {
    let cluster_id = section
        .cluster_id
        .ok_or(ConfigError::Missing("CLUSTER_ID"))?;
    let store = MemoryStore::with_cluster(cluster_id, DRY_RUN_CLUSTER);
    tracing::info!(cluster_id, "Dry run: reconciling into an in-memory store");
    reconcile_into(
        runtime,
        &store,
        ReconcileOptions::from_settings(cluster_id, reconcile),
        vms,
    )
}

fn reconcile_into<S: RecordStore>(
    runtime: &Runtime,
    store: &S,
    options: ReconcileOptions,
    vms: &[VmSnapshot],
) -> Result<ReconcileSummary, CliError> {
    Ok(runtime.block_on(Reconciler::new(store, options).run(vms))?)
}

fn print_summary(summary: &ReconcileSummary, dry_run: bool) {
    if dry_run {
        println!("Dry run, nothing was written to NetBox.");
    }
    println!("{}", summary.summary());

    for collection in Collection::ALL {
        let stats = summary.stats(collection);
        if stats.created + stats.updated + stats.found == 0 {
            continue;
        }
        println!(
            "  {:<16} {} created, {} updated, {} unchanged",
            collection.name(),
            stats.created,
            stats.updated,
            stats.found
        );
    }

    for failed in &summary.failed {
        println!("  FAILED {}: {}", failed.name, failed.reason);
    }
}

//! Snapshot export command.

use std::path::Path;

use pvesync_core::extract::{Extractor, NetworkFilter, ProxmoxClient};
use pvesync_core::snapshot::write_snapshot;

use crate::cli::ProxmoxArgs;
use crate::error::CliError;
use crate::util::{create_runtime, load_settings};

/// Export command handler
pub fn cmd_export(
    config_path: Option<&Path>,
    proxmox: ProxmoxArgs,
    output: &Path,
    skip_prefixes: Vec<String>,
) -> Result<(), CliError> {
    let file = load_settings(config_path)?;
    let settings = proxmox.into_section().overlay(file.proxmox).resolve()?;

    let mut filters = file.filters;
    filters.extra_skip_prefixes.extend(skip_prefixes);
    let filter = NetworkFilter::from_settings(&filters)?;

    tracing::info!(host = %settings.host, user = %settings.user, "Connecting to Proxmox VE");
    let client = ProxmoxClient::new(&settings)?;
    let runtime = create_runtime()?;
    let result = runtime.block_on(Extractor::new(&client, filter).run())?;

    for entry in &result.skipped {
        tracing::warn!(
            guest = %entry.identifier,
            location = entry.location.as_deref().unwrap_or_default(),
            reason = %entry.reason,
            "Guest skipped"
        );
    }

    write_snapshot(output, &result.vms)?;

    println!("Exported {} VMs to {}", result.vms.len(), output.display());
    println!("{}", result.summary());
    if !result.failed_nodes.is_empty() {
        println!("Failed nodes: {}", result.failed_nodes.join(", "));
    }

    Ok(())
}

//! Command handler modules for the CLI.

mod completions;
mod export;
mod import;

use std::path::Path;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: Option<&Path>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Export {
            proxmox,
            output,
            skip_prefixes,
        } => export::cmd_export(config_path, proxmox, &output, skip_prefixes),
        Commands::Import {
            file,
            netbox,
            dry_run,
            strict_matching,
            vrf_per_container_bridge,
            container_bridge,
        } => import::cmd_import(
            config_path,
            import::ImportParams {
                file: &file,
                netbox,
                dry_run,
                strict_matching,
                vrf_per_container_bridge,
                container_bridge,
            },
        ),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}

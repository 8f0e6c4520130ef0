//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use pvesync_core::config::{NetboxSection, ProxmoxSection};

/// Default snapshot file written by `export`
pub const DEFAULT_SNAPSHOT_FILE: &str = "proxmox_vms.json";

/// `pvesync` command-line interface
#[derive(Parser)]
#[command(name = "pvesync")]
#[command(
    author,
    version,
    about = "Export Proxmox VE inventory and import it into NetBox"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a TOML settings file
    #[arg(short, long, global = true, env = "PVESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log filter directive, e.g. `pvesync_core=debug,reqwest=info`
    #[arg(long, global = true, env = "PVESYNC_LOG")]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Extract guest inventory from Proxmox VE into a snapshot file
    #[command(about = "Extract guest inventory from Proxmox VE into a snapshot file")]
    Export {
        #[command(flatten)]
        proxmox: ProxmoxArgs,

        /// Snapshot file to write (`.yaml`/`.yml` for YAML, JSON otherwise)
        #[arg(short, long, default_value = DEFAULT_SNAPSHOT_FILE)]
        output: PathBuf,

        /// Additional interface name prefix to skip (repeatable)
        #[arg(long = "skip-prefix", value_name = "PREFIX")]
        skip_prefixes: Vec<String>,
    },

    /// Reconcile a snapshot file into NetBox
    #[command(about = "Reconcile a snapshot file into NetBox")]
    Import {
        /// Snapshot file to read
        file: PathBuf,

        #[command(flatten)]
        netbox: NetboxArgs,

        /// Reconcile into an in-memory store instead of NetBox
        #[arg(long)]
        dry_run: bool,

        /// Fail a VM when a lookup matches more than one record
        #[arg(long)]
        strict_matching: bool,

        /// Put the container-engine bridge of every VM into its own VRF
        #[arg(long)]
        vrf_per_container_bridge: bool,

        /// Interface name treated as the container-engine bridge
        #[arg(long, value_name = "NAME")]
        container_bridge: Option<String>,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Proxmox connection flags
#[derive(Args)]
pub struct ProxmoxArgs {
    /// Proxmox VE host, optionally with scheme and port
    #[arg(long = "proxmox-host", env = "PROXMOX_HOST")]
    pub host: Option<String>,

    /// API user in `user@realm` form
    #[arg(long = "proxmox-user", env = "PROXMOX_USER")]
    pub user: Option<String>,

    /// API token name
    #[arg(long, env = "API_TOKEN_NAME")]
    pub token_name: Option<String>,

    /// API token secret
    #[arg(long, env = "API_TOKEN_VALUE", hide_env_values = true)]
    pub token_value: Option<String>,

    /// Verify the Proxmox TLS certificate (default: false)
    #[arg(long, env = "VERIFY_SSL", value_parser = BoolishValueParser::new())]
    pub verify_ssl: Option<bool>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl ProxmoxArgs {
    /// Flag and environment layer of the Proxmox settings
    pub fn into_section(self) -> ProxmoxSection {
        ProxmoxSection {
            host: self.host,
            user: self.user,
            token_name: self.token_name,
            token_value: self.token_value,
            verify_ssl: self.verify_ssl,
            timeout_secs: self.timeout,
        }
    }
}

/// NetBox connection flags
#[derive(Args)]
pub struct NetboxArgs {
    /// NetBox base URL
    #[arg(long = "netbox-url", env = "NETBOX_URL")]
    pub url: Option<String>,

    /// NetBox API token
    #[arg(long = "netbox-token", env = "NETBOX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// NetBox cluster that imported VMs are assigned to
    #[arg(long, env = "CLUSTER_ID")]
    pub cluster_id: Option<u64>,

    /// Verify the NetBox TLS certificate (default: true)
    #[arg(long, env = "VERIFY_SSL", value_parser = BoolishValueParser::new())]
    pub verify_ssl: Option<bool>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl NetboxArgs {
    /// Flag and environment layer of the NetBox settings
    pub fn into_section(self) -> NetboxSection {
        NetboxSection {
            url: self.url,
            token: self.token,
            cluster_id: self.cluster_id,
            verify_ssl: self.verify_ssl,
            timeout_secs: self.timeout,
        }
    }
}

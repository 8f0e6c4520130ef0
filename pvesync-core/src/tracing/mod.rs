//! Structured logging setup
//!
//! Both pipelines report progress and per-guest failures as log events; the
//! subscriber is configured once per process through [`init_tracing`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Set once the global subscriber is installed
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Crate targets the level filter applies to
const TARGETS: [&str; 2] = ["pvesync_core", "pvesync"];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to initialize tracing subscriber
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// Tracing already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// Failed to create log file
    #[error("Failed to create log file: {0}")]
    FileCreationFailed(String),
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingLevel {
    /// Only errors
    Error,
    /// Errors and warnings
    Warn,
    /// Progress messages (default)
    #[default]
    Info,
    /// Per-request detail
    Debug,
    /// Everything
    Trace,
}

impl TracingLevel {
    /// Maps a `-v` count to a level; `quiet` wins over any count
    #[must_use]
    pub const fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Error;
        }
        match verbose {
            0 | 1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Output destination for log events
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Output to stdout
    Stdout,
    /// Output to stderr
    #[default]
    Stderr,
    /// Output to a file (created or truncated)
    File(PathBuf),
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Log level for this workspace's crates
    pub level: TracingLevel,
    /// Output destination
    pub output: TracingOutput,
    /// Custom filter directive (overrides level if set)
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Creates a new tracing configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets a custom filter string
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Filter directive derived from the level, e.g.
    /// `warn,pvesync_core=debug,pvesync=debug`
    #[must_use]
    pub fn level_directive(&self) -> String {
        let mut directive = String::from("warn");
        for target in TARGETS {
            directive.push_str(&format!(",{target}={}", self.level));
        }
        directive
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if tracing was already initialized, the filter does not
/// parse, or the log file cannot be created.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let filter = match config.filter {
        Some(ref custom_filter) => EnvFilter::try_new(custom_filter)
            .map_err(|e| TracingError::InitializationFailed(e.to_string()))?,
        None => EnvFilter::try_new(config.level_directive())
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);

    match &config.output {
        TracingOutput::Stdout => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        TracingOutput::Stderr => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        TracingOutput::File(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| TracingError::FileCreationFailed(e.to_string()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(file),
                )
                .try_init()
        }
    }
    .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    tracing::debug!(level = %config.level, "Tracing initialized");
    Ok(())
}

/// Checks if tracing has been initialized
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Standard span names
pub mod span_names {
    /// Whole extraction pass
    pub const EXTRACT_RUN: &str = "extract.run";
    /// One node of the extraction pass
    pub const EXTRACT_NODE: &str = "extract.node";
    /// One guest of the extraction pass
    pub const EXTRACT_GUEST: &str = "extract.guest";
    /// Whole reconciliation run
    pub const RECONCILE_RUN: &str = "reconcile.run";
    /// One VM cascade
    pub const RECONCILE_VM: &str = "reconcile.vm";
    /// Snapshot file read
    pub const SNAPSHOT_READ: &str = "snapshot.read";
    /// Snapshot file write
    pub const SNAPSHOT_WRITE: &str = "snapshot.write";
}

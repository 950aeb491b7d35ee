// Scanner module - Scan entry points and the dependency-driven executor

pub mod config;
pub mod dependency;
pub mod executor;
pub mod progress;

pub use config::ScanConfig;
pub use dependency::{DependencyGraph, ProbeDeclaration, validate_probe_set};
pub use executor::ScanExecutor;
pub use progress::{ScanProgressReporter, SilentProgressReporter, TerminalProgressReporter};

use crate::cli::Args;
use crate::error::{ScanError, ScanResult};
use crate::probe::Probe;
use crate::report::Report;
use crate::utils::network::Target;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Run a probe set against an already resolved target
///
/// Probe failures end up as error records in the report. Only setup problems
/// (invalid configuration or probe set, unreachable target) and merge defects
/// are returned as errors.
pub async fn run_scan(
    target: Target,
    probes: Vec<Arc<dyn Probe>>,
    config: ScanConfig,
) -> ScanResult<Report> {
    ScanExecutor::new(target, probes, config)?.execute().await
}

/// Parse and resolve a target, reporting failures as setup errors
pub async fn resolve_target(input: &str) -> ScanResult<Target> {
    Target::parse(input)
        .await
        .map_err(|e| ScanError::SetupFailed {
            target: input.to_string(),
            details: format!("{:#}", e),
        })
}

/// Scan the target named on the command line
pub async fn run_scan_from_args(args: &Args, probes: Vec<Arc<dyn Probe>>) -> ScanResult<Report> {
    let config = ScanConfig::from_args(args)?;
    let input = args.target.as_deref().ok_or_else(|| ScanError::ConfigError {
        message: "No target specified".to_string(),
    })?;
    let target = resolve_target(input).await?;

    ScanExecutor::new(target, probes, config)?
        .with_reporter(args.progress_reporter())
        .execute()
        .await
}

/// Install a global fmt subscriber; unknown levels fall back to INFO
pub fn init_logging(level: &str) -> ScanResult<()> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ScanError::Other(format!("Failed to set subscriber: {}", e)))
}

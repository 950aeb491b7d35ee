// CLI module - Command line arguments for embedding binaries

use crate::protocols::ScannerDetail;
use crate::scanner::progress::{
    ScanProgressReporter, SilentProgressReporter, TerminalProgressReporter,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// cipherprobe - Dependency-driven TLS probe scheduler
///
/// Values given here override the ones loaded from `--config`.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, long_about = None)]
#[command(name = "cipherprobe")]
#[command(about = "Run TLS probes against a single target", long_about = None)]
pub struct Args {
    /// Target URI (host:port or URL)
    #[arg(value_name = "URI")]
    pub target: Option<String>,

    /// TOML scan configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker pool size
    #[arg(short = 't', long = "threads", value_name = "NUM")]
    pub threads: Option<usize>,

    /// Scan thoroughness
    #[arg(long = "scan-detail", value_enum, value_name = "LEVEL")]
    pub scan_detail: Option<ScannerDetail>,

    /// Seconds without a finished probe before the oldest one is force-joined
    #[arg(long = "watchdog", value_name = "SECONDS")]
    pub watchdog: Option<u64>,

    /// Seconds to wait for a stalled probe before killing it
    #[arg(long = "force-join-timeout", value_name = "SECONDS")]
    pub force_join_timeout: Option<u64>,

    /// TCP connect timeout for the reachability check
    #[arg(long = "connect-timeout", value_name = "SECONDS")]
    pub connect_timeout: Option<u64>,

    /// Skip the TCP reachability check before scanning
    #[arg(long = "no-reachability-check")]
    pub no_reachability_check: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Suppress per-probe progress output
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Args {
    /// Progress reporter matching `--quiet`
    pub fn progress_reporter(&self) -> Arc<dyn ScanProgressReporter> {
        if self.quiet {
            Arc::new(SilentProgressReporter::new())
        } else {
            Arc::new(TerminalProgressReporter::new())
        }
    }
}

//! Scan configuration.
//!
//! `ScanConfig` is read-only for the lifetime of a scan: the executor and
//! every probe context share it behind an `Arc`. It can be loaded from TOML
//! or extracted from CLI arguments, with CLI values overriding the file.

use crate::error::{ScanError, ScanResult};
use crate::protocols::ScannerDetail;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Worker pool size, fixed for the scan's lifetime
    pub threads: usize,
    /// Thoroughness, drives oracle round counts
    pub scan_detail: ScannerDetail,
    /// Time without any completed probe before the oldest task is force-joined
    pub watchdog_interval_ms: u64,
    /// Bounded wait for the oldest task once the watchdog fired
    pub force_join_timeout_ms: u64,
    /// Connect timeout for the reachability check
    pub connect_timeout_ms: u64,
    /// Fail setup when no target address accepts a TCP connection
    pub check_reachability: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: Self::DEFAULT_THREADS,
            scan_detail: ScannerDetail::default(),
            watchdog_interval_ms: 30 * 60 * 1000, // 30 minutes
            force_join_timeout_ms: 60 * 1000,     // 1 minute
            connect_timeout_ms: 10 * 1000,
            check_reachability: true,
        }
    }
}

impl ScanConfig {
    /// Default worker pool size
    pub const DEFAULT_THREADS: usize = 8;

    /// Create config from file
    pub fn from_file(path: impl AsRef<Path>) -> ScanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScanConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Create example config file
    pub fn create_example(path: impl AsRef<Path>) -> ScanResult<()> {
        let config = Self::default();
        let toml = toml::to_string_pretty(&config)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Create configuration from CLI Args, layered over `--config` if given
    pub fn from_args(args: &crate::cli::Args) -> ScanResult<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(threads) = args.threads {
            config.threads = threads;
        }
        if let Some(detail) = args.scan_detail {
            config.scan_detail = detail;
        }
        if let Some(secs) = args.watchdog {
            config.watchdog_interval_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = args.force_join_timeout {
            config.force_join_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = args.connect_timeout {
            config.connect_timeout_ms = secs.saturating_mul(1000);
        }
        if args.no_reachability_check {
            config.check_reachability = false;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ScanResult<()> {
        if self.threads == 0 {
            return Err(ScanError::ConfigError {
                message: "threads must be at least 1".to_string(),
            });
        }
        if self.watchdog_interval_ms == 0 {
            return Err(ScanError::ConfigError {
                message: "watchdog_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.connect_timeout_ms == 0 && self.check_reachability {
            return Err(ScanError::ConfigError {
                message: "connect_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_scan_detail(mut self, detail: ScannerDetail) -> Self {
        self.scan_detail = detail;
        self
    }

    pub fn with_watchdog(mut self, interval: Duration, force_join: Duration) -> Self {
        self.watchdog_interval_ms = interval.as_millis() as u64;
        self.force_join_timeout_ms = force_join.as_millis() as u64;
        self
    }

    pub fn with_reachability_check(mut self, enabled: bool) -> Self {
        self.check_reachability = enabled;
        self
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn force_join_timeout(&self) -> Duration {
        Duration::from_millis(self.force_join_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// cipherprobe - Dependency-driven TLS probe scheduling
// Licensed under GPL-3.0

//! cipherprobe runs a set of independent probes against a single TLS target.
//! Probes declare what they need from the report; the scan executor admits
//! them as soon as earlier results make their requirements hold, runs them on
//! a bounded worker pool and merges every result into one report.
//! The `leak` module holds the statistical oracle test used by padding and
//! Bleichenbacher style probes.

pub mod cli;
pub mod engine;
pub mod error;
pub mod leak;
pub mod probe;
pub mod protocols;
pub mod report;
pub mod scanner;
pub mod utils;

// Re-export commonly used types
pub use crate::cli::Args;
pub use crate::error::{ScanError, ScanResult};
pub use crate::probe::{Contributions, Probe, ProbeContext, ProbeResult, ProbeType, Requirement};
pub use crate::report::{AnalyzedProperty, FactSet, Report, ReportView, TestResult};
pub use crate::scanner::{ScanConfig, ScanExecutor, run_scan};

/// Result type for probe and engine operations
pub type Result<T> = anyhow::Result<T>;

/// Error type for probe and engine operations
pub use anyhow::Error;

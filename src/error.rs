// Error types for cipherprobe
//
// Scan-level failures are modelled with thiserror so callers can match on them
// exhaustively. Probe run operations keep using anyhow::Result; their failures
// never surface here because the executor converts them into error results.

use crate::probe::ProbeType;
use crate::report::{AnalyzedProperty, FactSet};
use std::io;
use thiserror::Error;

/// Result alias for scan-level operations
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Main error type for scan orchestration
#[derive(Debug, Error)]
pub enum ScanError {
    /// Target could not be resolved or reached before any probe ran
    #[error("Scan setup failed for {target}: {details}")]
    SetupFailed { target: String, details: String },

    /// Two probes in the same probe set share one identity
    #[error("Probe {probe} registered more than once")]
    DuplicateProbe { probe: ProbeType },

    /// Probe completion requirements form a cycle
    #[error("Dependency cycle between probes: {}", format_cycle(.cycle))]
    DependencyCycle { cycle: Vec<ProbeType> },

    /// A result tried to occupy a slot that is already filled
    #[error("Result for {probe} merged twice")]
    DuplicateResult { probe: ProbeType },

    /// A result merge broke a report invariant
    #[error("Merge defect in {probe}: {details}")]
    MergeDefect { probe: ProbeType, details: String },

    /// Result wrote a property its probe never declared
    #[error("Result for {probe} wrote undeclared property {property}")]
    UndeclaredProperty {
        probe: ProbeType,
        property: AnalyzedProperty,
    },

    /// Result added to a supported-value set its probe never declared
    #[error("Result for {probe} added {set} without declaring them")]
    UndeclaredFactSet { probe: ProbeType, set: FactSet },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Generic I/O error
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: io::Error,
    },

    /// TOML configuration could not be parsed
    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML configuration could not be written
    #[error("Config serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl ScanError {
    /// Whether this error means the scan could not start at all
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            ScanError::SetupFailed { .. }
                | ScanError::DuplicateProbe { .. }
                | ScanError::DependencyCycle { .. }
                | ScanError::ConfigError { .. }
        )
    }
}

fn format_cycle(cycle: &[ProbeType]) -> String {
    cycle
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Conversion from anyhow::Error for setup helpers built on anyhow
impl From<anyhow::Error> for ScanError {
    fn from(err: anyhow::Error) -> Self {
        ScanError::Other(format!("{:#}", err))
    }
}

/// Helper macro for bailing out of a merge with a defect
#[macro_export]
macro_rules! merge_defect {
    ($probe:expr, $($arg:tt)*) => {
        return Err($crate::error::ScanError::MergeDefect {
            probe: $probe,
            details: format!($($arg)*),
        })
    };
}

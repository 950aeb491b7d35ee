// Probe module - Units of scan work and the results they merge into the report
//
// A probe declares what it needs (`Requirement`), what it contributes
// (`properties`), and how to run. It never touches the live report: it reads
// the snapshot in its `ProbeContext` and hands back a `ProbeResult`, which the
// scan executor merges on the coordinating task.

pub mod requirement;
pub mod results;

pub use requirement::{Requirement, UnmetRequirement};
pub use results::{CouldNotExecuteResult, ErrorResult, FailureKind, PropertyResult};

use crate::Result;
use crate::engine::ProtocolEngine;
use crate::error::ScanResult;
use crate::protocols::ScannerDetail;
use crate::report::{AnalyzedProperty, FactSet, Report};
use crate::scanner::config::ScanConfig;
use crate::utils::network::Target;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Stable probe identity, used as the report's result map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProbeType {
    ProtocolVersion,
    CipherSuite,
    CipherSuiteOrder,
    Extensions,
    Certificate,
    Compression,
    NamedGroups,
    SignatureAndHash,
    Resumption,
    SessionTicket,
    Renegotiation,
    Alpn,
    EarlyData,
    HelloRetryRequest,
    ConnectionClosing,
    CommonBugs,
    DtlsBugs,
    Heartbleed,
    PaddingOracle,
    Bleichenbacher,
    Poodle,
    TlsPoodle,
    InvalidCurve,
    Drown,
}

impl fmt::Display for ProbeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Supported-value sets a probe's result adds to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contributions {
    pub versions: bool,
    pub extensions: bool,
}

impl Contributions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self) -> Self {
        self.versions = true;
        self
    }

    pub fn with_extensions(mut self) -> Self {
        self.extensions = true;
        self
    }

    pub fn contains(&self, set: FactSet) -> bool {
        match set {
            FactSet::Versions => self.versions,
            FactSet::Extensions => self.extensions,
        }
    }

    /// Declared sets, in `FactSet` order
    pub fn fact_sets(&self) -> BTreeSet<FactSet> {
        [FactSet::Versions, FactSet::Extensions]
            .into_iter()
            .filter(|set| self.contains(*set))
            .collect()
    }
}

/// Read-only inputs captured when a probe is submitted to the worker pool
#[derive(Clone)]
pub struct ProbeContext {
    target: Arc<Target>,
    config: Arc<ScanConfig>,
    report: Arc<Report>,
    engine: Option<Arc<dyn ProtocolEngine>>,
}

impl ProbeContext {
    pub fn new(
        target: Arc<Target>,
        config: Arc<ScanConfig>,
        report: Arc<Report>,
        engine: Option<Arc<dyn ProtocolEngine>>,
    ) -> Self {
        Self {
            target,
            config,
            report,
            engine,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan_detail(&self) -> ScannerDetail {
        self.config.scan_detail
    }

    /// Report as it was when this probe became ready
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Protocol engine used to drive handshakes against the target
    pub fn engine(&self) -> Result<Arc<dyn ProtocolEngine>> {
        self.engine
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No protocol engine configured for this scan"))
    }
}

/// A schedulable unit of scan work
#[async_trait]
pub trait Probe: Send + Sync {
    /// Identity under which the result is stored
    fn probe_type(&self) -> ProbeType;

    /// Facts that must hold in the report before this probe may run
    fn requirement(&self) -> Requirement {
        Requirement::new()
    }

    /// Properties this probe's result writes into the report
    fn properties(&self) -> Vec<AnalyzedProperty> {
        Vec::new()
    }

    /// Supported-value sets this probe's result adds to when it executes
    fn contributions(&self) -> Contributions {
        Contributions::new()
    }

    /// Run the probe against the target
    async fn execute(&self, context: ProbeContext) -> Result<Box<dyn ProbeResult>>;

    /// Result used when the probe never became ready. Must not do any I/O.
    fn could_not_execute(&self, report: &Report) -> Box<dyn ProbeResult> {
        Box::new(CouldNotExecuteResult::diagnose(
            self.probe_type(),
            self.properties(),
            &self.requirement(),
            report,
        ))
    }
}

/// Output of a probe that knows how to write itself into the report
pub trait ProbeResult: Send + fmt::Debug {
    fn probe_type(&self) -> ProbeType;

    /// Write the findings under the producing probe's identity
    fn merge(self: Box<Self>, report: &mut Report) -> ScanResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopProbe;

    #[async_trait]
    impl Probe for NoopProbe {
        fn probe_type(&self) -> ProbeType {
            ProbeType::Compression
        }

        fn properties(&self) -> Vec<AnalyzedProperty> {
            vec![AnalyzedProperty::SupportsBlockCiphers]
        }

        fn requirement(&self) -> Requirement {
            Requirement::new().require_probe_types([ProbeType::ProtocolVersion])
        }

        async fn execute(&self, _context: ProbeContext) -> Result<Box<dyn ProbeResult>> {
            Ok(Box::new(PropertyResult::new(ProbeType::Compression)))
        }
    }

    #[test]
    fn test_default_could_not_execute_explains_missing_probe() {
        let report = Report::new("example.com:443");
        let result = NoopProbe.could_not_execute(&report);
        assert_eq!(result.probe_type(), ProbeType::Compression);

        let mut report = report;
        result.merge(&mut report).unwrap();

        let record = report.get_result(ProbeType::Compression).unwrap();
        assert!(
            record
                .details
                .as_deref()
                .unwrap()
                .contains("ProtocolVersion")
        );
        assert_eq!(
            report.get_property(AnalyzedProperty::SupportsBlockCiphers),
            Some(crate::report::TestResult::CouldNotTest)
        );
    }

    #[test]
    fn test_contributions_default_to_nothing() {
        assert!(NoopProbe.contributions().fact_sets().is_empty());

        let both = Contributions::new().with_versions().with_extensions();
        assert!(both.contains(FactSet::Versions));
        assert_eq!(
            both.fact_sets(),
            BTreeSet::from([FactSet::Versions, FactSet::Extensions])
        );
    }

    #[test]
    fn test_context_without_engine() {
        let context = ProbeContext::new(
            Arc::new(Target::from_addr("127.0.0.1:443".parse().unwrap())),
            Arc::new(ScanConfig::default()),
            Arc::new(Report::new("127.0.0.1:443")),
            None,
        );

        assert!(context.engine().is_err());
        assert_eq!(context.scan_detail(), ScannerDetail::Normal);
        assert_eq!(context.target().port, 443);
    }
}

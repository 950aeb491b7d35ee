// Stock probe results
//
// ErrorResult and CouldNotExecuteResult are synthesized by the scan executor
// so every probe ends the scan with exactly one record. PropertyResult is a
// general purpose result for probes whose findings are plain report facts.

use super::requirement::Requirement;
use super::{ProbeResult, ProbeType};
use crate::error::ScanResult;
use crate::protocols::{ExtensionType, ProtocolVersion};
use crate::report::{AnalyzedProperty, ProbeRecord, Report, TestResult};

/// Why a probe produced no genuine result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The run operation returned an error
    Failed,
    /// The run operation panicked
    Panicked,
    /// The stall watchdog killed the task
    Killed,
}

/// Result merged in place of a probe that failed while running
#[derive(Debug, Clone)]
pub struct ErrorResult {
    probe: ProbeType,
    properties: Vec<AnalyzedProperty>,
    kind: FailureKind,
    message: String,
}

impl ErrorResult {
    pub fn new(
        probe: ProbeType,
        properties: Vec<AnalyzedProperty>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            properties,
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ProbeResult for ErrorResult {
    fn probe_type(&self) -> ProbeType {
        self.probe
    }

    fn merge(self: Box<Self>, report: &mut Report) -> ScanResult<()> {
        let value = match self.kind {
            FailureKind::Killed => TestResult::Timeout,
            FailureKind::Failed | FailureKind::Panicked => TestResult::ErrorDuringTest,
        };
        for property in &self.properties {
            report.put_property(*property, value);
        }

        let details = match self.kind {
            FailureKind::Failed => format!("probe failed: {}", self.message),
            FailureKind::Panicked => format!("probe panicked: {}", self.message),
            FailureKind::Killed => format!("probe killed by stall watchdog: {}", self.message),
        };
        report.put_result(ProbeRecord::error(self.probe, details))
    }
}

/// Result merged for a probe whose requirements never became satisfied
#[derive(Debug, Clone)]
pub struct CouldNotExecuteResult {
    probe: ProbeType,
    properties: Vec<AnalyzedProperty>,
    reason: String,
}

impl CouldNotExecuteResult {
    pub fn new(
        probe: ProbeType,
        properties: Vec<AnalyzedProperty>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            properties,
            reason: reason.into(),
        }
    }

    /// Explain from the report which clauses kept the probe from running
    pub fn diagnose(
        probe: ProbeType,
        properties: Vec<AnalyzedProperty>,
        requirement: &Requirement,
        report: &Report,
    ) -> Self {
        let unmet = requirement.unmet(report);
        let reason = if unmet.is_empty() {
            "internal scheduling error".to_string()
        } else {
            unmet
                .iter()
                .map(|u| u.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        };
        Self::new(probe, properties, reason)
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl ProbeResult for CouldNotExecuteResult {
    fn probe_type(&self) -> ProbeType {
        self.probe
    }

    fn merge(self: Box<Self>, report: &mut Report) -> ScanResult<()> {
        for property in &self.properties {
            report.put_property(*property, TestResult::CouldNotTest);
        }
        report.put_result(ProbeRecord::not_executed(self.probe, self.reason))
    }
}

/// Result made of plain report facts
#[derive(Debug, Clone)]
pub struct PropertyResult {
    probe: ProbeType,
    properties: Vec<(AnalyzedProperty, TestResult)>,
    versions: Option<Vec<ProtocolVersion>>,
    extensions: Option<Vec<ExtensionType>>,
    data: serde_json::Value,
}

impl PropertyResult {
    pub fn new(probe: ProbeType) -> Self {
        Self {
            probe,
            properties: Vec::new(),
            versions: None,
            extensions: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_property(mut self, property: AnalyzedProperty, value: impl Into<TestResult>) -> Self {
        self.properties.push((property, value.into()));
        self
    }

    pub fn with_versions(mut self, versions: impl IntoIterator<Item = ProtocolVersion>) -> Self {
        self.versions.get_or_insert_with(Vec::new).extend(versions);
        self
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = ExtensionType>) -> Self {
        self.extensions
            .get_or_insert_with(Vec::new)
            .extend(extensions);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

impl ProbeResult for PropertyResult {
    fn probe_type(&self) -> ProbeType {
        self.probe
    }

    fn merge(self: Box<Self>, report: &mut Report) -> ScanResult<()> {
        for (property, value) in self.properties {
            report.put_property(property, value);
        }
        if let Some(versions) = self.versions {
            report.add_versions(versions);
        }
        if let Some(extensions) = self.extensions {
            report.add_extensions(extensions);
        }
        report.put_result(ProbeRecord::executed(self.probe, self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ExecutionStatus;

    #[test]
    fn test_error_result_marks_properties() {
        let mut report = Report::new("example.com:443");
        let result = ErrorResult::new(
            ProbeType::Resumption,
            vec![AnalyzedProperty::SupportsSessionIdResumption],
            FailureKind::Failed,
            "connection reset",
        );
        Box::new(result).merge(&mut report).unwrap();

        let record = report.get_result(ProbeType::Resumption).unwrap();
        assert_eq!(record.status, ExecutionStatus::Error);
        assert_eq!(
            record.details.as_deref(),
            Some("probe failed: connection reset")
        );
        assert_eq!(
            report.get_property(AnalyzedProperty::SupportsSessionIdResumption),
            Some(TestResult::ErrorDuringTest)
        );
    }

    #[test]
    fn test_killed_probe_properties_time_out() {
        let mut report = Report::new("example.com:443");
        let result = ErrorResult::new(
            ProbeType::Bleichenbacher,
            vec![AnalyzedProperty::VulnerableToBleichenbacher],
            FailureKind::Killed,
            "no answer",
        );
        Box::new(result).merge(&mut report).unwrap();

        assert_eq!(
            report.get_property(AnalyzedProperty::VulnerableToBleichenbacher),
            Some(TestResult::Timeout)
        );
    }

    #[test]
    fn test_diagnose_falls_back_to_internal_error() {
        let report = Report::new("example.com:443");
        let result =
            CouldNotExecuteResult::diagnose(ProbeType::Alpn, vec![], &Requirement::new(), &report);
        assert_eq!(result.reason(), "internal scheduling error");
    }

    #[test]
    fn test_diagnose_joins_unmet_clauses() {
        let report = Report::new("example.com:443");
        let req = Requirement::new()
            .require_probe_types([ProbeType::CipherSuite])
            .require_properties([AnalyzedProperty::SupportsRsa]);
        let result = CouldNotExecuteResult::diagnose(ProbeType::Bleichenbacher, vec![], &req, &report);

        assert_eq!(
            result.reason(),
            "required probe CipherSuite has no result; SupportsRsa is not tested (required TRUE)"
        );
    }

    #[test]
    fn test_property_result_merges_all_facts() {
        let mut report = Report::new("example.com:443");
        let result = PropertyResult::new(ProbeType::ProtocolVersion)
            .with_versions([ProtocolVersion::TLS12, ProtocolVersion::TLS13])
            .with_extensions([ExtensionType::SupportedVersions])
            .with_property(AnalyzedProperty::SupportsRsa, true)
            .with_data(serde_json::json!({ "probed": 6 }));
        Box::new(result).merge(&mut report).unwrap();

        assert!(report.is_probe_executed(ProbeType::ProtocolVersion));
        assert_eq!(report.versions().unwrap().len(), 2);
        assert_eq!(
            report.get_property(AnalyzedProperty::SupportsRsa),
            Some(TestResult::True)
        );
        assert_eq!(
            report.get_result(ProbeType::ProtocolVersion).unwrap().data["probed"],
            6
        );
    }
}

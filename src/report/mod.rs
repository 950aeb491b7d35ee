// Report module - Shared accumulator of scan facts and per-probe outcomes
//
// The report is written only through result merges performed by the scan
// executor. Once the scan loop ends it is handed out by value and treated as
// read-only by renderers and guideline checks (see `ReportView`).

pub mod property;

pub use property::{AnalyzedProperty, TestResult};

use crate::error::{ScanError, ScanResult};
use crate::probe::ProbeType;
use crate::protocols::{ExtensionType, ProtocolVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How a probe ended up in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The probe ran and its genuine result was merged
    Executed,
    /// The probe failed, panicked or was killed by the stall watchdog
    Error,
    /// The probe's requirements never became satisfied
    NotExecuted,
}

/// One slot in the report's result map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub probe: ProbeType,
    pub status: ExecutionStatus,
    /// Human readable reason for error and not-executed records
    pub details: Option<String>,
    /// Probe specific findings
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl ProbeRecord {
    pub fn executed(probe: ProbeType, data: serde_json::Value) -> Self {
        Self {
            probe,
            status: ExecutionStatus::Executed,
            details: None,
            data,
        }
    }

    pub fn error(probe: ProbeType, details: impl Into<String>) -> Self {
        Self {
            probe,
            status: ExecutionStatus::Error,
            details: Some(details.into()),
            data: serde_json::Value::Null,
        }
    }

    pub fn not_executed(probe: ProbeType, reason: impl Into<String>) -> Self {
        Self {
            probe,
            status: ExecutionStatus::NotExecuted,
            details: Some(reason.into()),
            data: serde_json::Value::Null,
        }
    }
}

/// Supported-value sets a result can add to besides its properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FactSet {
    Versions,
    Extensions,
}

impl fmt::Display for FactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactSet::Versions => write!(f, "protocol versions"),
            FactSet::Extensions => write!(f, "extensions"),
        }
    }
}

/// Everything a merge wrote, drained by the executor after each merge
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct WriteJournal {
    pub properties: BTreeSet<AnalyzedProperty>,
    pub fact_sets: BTreeSet<FactSet>,
}

/// Scan report for one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    target: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    results: BTreeMap<ProbeType, ProbeRecord>,
    properties: BTreeMap<AnalyzedProperty, TestResult>,
    versions: Option<BTreeSet<ProtocolVersion>>,
    extensions: Option<BTreeSet<ExtensionType>>,
    /// Writes since the coordinator last drained the journal
    #[serde(skip)]
    journal: WriteJournal,
}

impl Report {
    /// Create an empty report that only knows its target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            started_at: Utc::now(),
            finished_at: None,
            results: BTreeMap::new(),
            properties: BTreeMap::new(),
            versions: None,
            extensions: None,
            journal: WriteJournal::default(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Store a probe record; each probe owns exactly one slot
    pub fn put_result(&mut self, record: ProbeRecord) -> ScanResult<()> {
        if self.results.contains_key(&record.probe) {
            return Err(ScanError::DuplicateResult {
                probe: record.probe,
            });
        }
        self.results.insert(record.probe, record);
        Ok(())
    }

    /// Record a property value
    ///
    /// A conclusive finding is never replaced by a failure marker, so facts
    /// one probe established survive another probe's error or not-executed
    /// record for the same property.
    pub fn put_property(&mut self, property: AnalyzedProperty, value: impl Into<TestResult>) {
        let value = value.into();
        self.journal.properties.insert(property);

        if let Some(current) = self.properties.get(&property)
            && current.is_conclusive()
            && !value.is_conclusive()
        {
            return;
        }
        self.properties.insert(property, value);
    }

    /// Everything written since the previous call
    pub(crate) fn take_write_journal(&mut self) -> WriteJournal {
        std::mem::take(&mut self.journal)
    }

    /// Add discovered protocol versions to the supported set
    pub fn add_versions(&mut self, versions: impl IntoIterator<Item = ProtocolVersion>) {
        self.versions.get_or_insert_with(BTreeSet::new).extend(versions);
        self.journal.fact_sets.insert(FactSet::Versions);
    }

    /// Add discovered extensions to the supported set
    pub fn add_extensions(&mut self, extensions: impl IntoIterator<Item = ExtensionType>) {
        self.extensions
            .get_or_insert_with(BTreeSet::new)
            .extend(extensions);
        self.journal.fact_sets.insert(FactSet::Extensions);
    }

    pub fn has_result(&self, probe: ProbeType) -> bool {
        self.results.contains_key(&probe)
    }

    pub fn get_result(&self, probe: ProbeType) -> Option<&ProbeRecord> {
        self.results.get(&probe)
    }

    /// True only when the probe's genuine result has been merged
    pub fn is_probe_executed(&self, probe: ProbeType) -> bool {
        self.results
            .get(&probe)
            .is_some_and(|r| r.status == ExecutionStatus::Executed)
    }

    pub fn get_property(&self, property: AnalyzedProperty) -> Option<TestResult> {
        self.properties.get(&property).copied()
    }

    pub fn versions(&self) -> Option<&BTreeSet<ProtocolVersion>> {
        self.versions.as_ref()
    }

    pub fn extensions(&self) -> Option<&BTreeSet<ExtensionType>> {
        self.extensions.as_ref()
    }

    pub fn result_map(&self) -> &BTreeMap<ProbeType, ProbeRecord> {
        &self.results
    }

    pub fn properties(&self) -> &BTreeMap<AnalyzedProperty, TestResult> {
        &self.properties
    }

    /// Probes whose records carry the given status
    pub fn probes_with_status(&self, status: ExecutionStatus) -> Vec<ProbeType> {
        self.results
            .values()
            .filter(|r| r.status == status)
            .map(|r| r.probe)
            .collect()
    }

    /// Serialize the report for downstream renderers
    pub fn to_json(&self, pretty: bool) -> ScanResult<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Read-only access used by renderers and guideline checks
pub trait ReportView {
    fn has_result(&self, probe: ProbeType) -> bool;
    fn get_result(&self, probe: ProbeType) -> Option<&ProbeRecord>;
    fn get_property(&self, property: AnalyzedProperty) -> Option<TestResult>;
    fn versions(&self) -> Option<&BTreeSet<ProtocolVersion>>;
    fn extensions(&self) -> Option<&BTreeSet<ExtensionType>>;
}

impl ReportView for Report {
    fn has_result(&self, probe: ProbeType) -> bool {
        Report::has_result(self, probe)
    }

    fn get_result(&self, probe: ProbeType) -> Option<&ProbeRecord> {
        Report::get_result(self, probe)
    }

    fn get_property(&self, property: AnalyzedProperty) -> Option<TestResult> {
        Report::get_property(self, property)
    }

    fn versions(&self) -> Option<&BTreeSet<ProtocolVersion>> {
        Report::versions(self)
    }

    fn extensions(&self) -> Option<&BTreeSet<ExtensionType>> {
        Report::extensions(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_is_empty() {
        let report = Report::new("example.com:443");
        assert_eq!(report.target(), "example.com:443");
        assert!(report.result_map().is_empty());
        assert!(report.versions().is_none());
        assert!(report.extensions().is_none());
        assert!(report.finished_at().is_none());
    }

    #[test]
    fn test_duplicate_result_rejected() {
        let mut report = Report::new("example.com:443");
        report
            .put_result(ProbeRecord::executed(
                ProbeType::CipherSuite,
                serde_json::Value::Null,
            ))
            .unwrap();

        let err = report
            .put_result(ProbeRecord::error(ProbeType::CipherSuite, "again"))
            .unwrap_err();
        assert!(matches!(err, ScanError::DuplicateResult { .. }));
        assert!(report.is_probe_executed(ProbeType::CipherSuite));
    }

    #[test]
    fn test_error_record_is_not_executed() {
        let mut report = Report::new("example.com:443");
        report
            .put_result(ProbeRecord::error(ProbeType::Resumption, "boom"))
            .unwrap();

        assert!(report.has_result(ProbeType::Resumption));
        assert!(!report.is_probe_executed(ProbeType::Resumption));
        assert_eq!(
            report.probes_with_status(ExecutionStatus::Error),
            vec![ProbeType::Resumption]
        );
    }

    #[test]
    fn test_version_and_extension_sets_accumulate() {
        let mut report = Report::new("example.com:443");
        report.add_versions([ProtocolVersion::TLS12]);
        report.add_versions([ProtocolVersion::TLS13, ProtocolVersion::TLS12]);
        report.add_extensions([ExtensionType::SessionTicket]);

        let versions = report.versions().unwrap();
        assert_eq!(versions.len(), 2);
        assert!(versions.contains(&ProtocolVersion::TLS13));
        assert!(
            report
                .extensions()
                .unwrap()
                .contains(&ExtensionType::SessionTicket)
        );
    }

    #[test]
    fn test_failure_marker_keeps_conclusive_value() {
        let mut report = Report::new("example.com:443");
        report.put_property(AnalyzedProperty::SupportsRsa, TestResult::CouldNotTest);
        report.put_property(AnalyzedProperty::SupportsRsa, true);
        report.put_property(AnalyzedProperty::SupportsRsa, TestResult::ErrorDuringTest);
        report.put_property(AnalyzedProperty::SupportsRsa, TestResult::Timeout);

        assert_eq!(
            report.get_property(AnalyzedProperty::SupportsRsa),
            Some(TestResult::True)
        );

        report.put_property(AnalyzedProperty::SupportsDh, TestResult::ErrorDuringTest);
        report.put_property(AnalyzedProperty::SupportsDh, TestResult::CouldNotTest);
        assert_eq!(
            report.get_property(AnalyzedProperty::SupportsDh),
            Some(TestResult::CouldNotTest)
        );
    }

    #[test]
    fn test_write_journal_tracks_properties_and_sets() {
        let mut report = Report::new("example.com:443");
        report.put_property(AnalyzedProperty::SupportsRsa, true);
        report.put_property(AnalyzedProperty::SupportsRsa, TestResult::CouldNotTest);
        report.add_versions([ProtocolVersion::TLS12]);

        let journal = report.take_write_journal();
        assert_eq!(
            journal.properties,
            BTreeSet::from([AnalyzedProperty::SupportsRsa])
        );
        assert_eq!(journal.fact_sets, BTreeSet::from([FactSet::Versions]));

        report.add_extensions(Vec::new());
        let journal = report.take_write_journal();
        assert!(journal.properties.is_empty());
        assert_eq!(journal.fact_sets, BTreeSet::from([FactSet::Extensions]));
    }

    #[test]
    fn test_report_view_and_json() {
        let mut report = Report::new("example.com:443");
        report.put_property(AnalyzedProperty::SupportsRsa, true);
        report
            .put_result(ProbeRecord::executed(
                ProbeType::CipherSuite,
                serde_json::json!({ "suites": 12 }),
            ))
            .unwrap();

        let view: &dyn ReportView = &report;
        assert!(view.has_result(ProbeType::CipherSuite));
        assert_eq!(
            view.get_property(AnalyzedProperty::SupportsRsa),
            Some(TestResult::True)
        );

        let json = report.to_json(false).unwrap();
        assert!(json.contains("SUPPORTS_RSA"));
        assert!(json.contains("\"suites\":12"));
    }
}

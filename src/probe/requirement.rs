// Probe requirements - Boolean predicates over report facts
//
// Every clause category is optional; an unset category is vacuously satisfied
// and the overall predicate is the AND of all set categories. Evaluation is
// pure: missing or unknown data makes a clause fail, it never panics or waits.

use crate::probe::ProbeType;
use crate::protocols::{ExtensionType, ProtocolVersion};
use crate::report::{AnalyzedProperty, FactSet, Report, TestResult};
use std::collections::BTreeSet;
use std::fmt;

/// Precondition a probe declares against the report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirement {
    probe_types: Option<Vec<ProbeType>>,
    properties: Option<Vec<AnalyzedProperty>>,
    properties_not: Option<Vec<AnalyzedProperty>>,
    protocol_versions: Option<Vec<ProtocolVersion>>,
    extensions: Option<Vec<ExtensionType>>,
    or: Option<Vec<Requirement>>,
    not: Option<Box<Requirement>>,
}

/// A clause that failed during evaluation, used for not-executed reasons
#[derive(Debug, Clone, PartialEq)]
pub enum UnmetRequirement {
    ProbeNotExecuted(ProbeType),
    PropertyNotTrue {
        property: AnalyzedProperty,
        actual: Option<TestResult>,
    },
    PropertyNotFalse {
        property: AnalyzedProperty,
        actual: Option<TestResult>,
    },
    VersionsUnknown,
    VersionNotSupported(ProtocolVersion),
    ExtensionsUnknown,
    ExtensionNotSupported(ExtensionType),
    NoAlternativeSatisfied,
    ExcludedConditionHolds,
}

impl fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmetRequirement::ProbeNotExecuted(probe) => {
                write!(f, "required probe {} has no result", probe)
            }
            UnmetRequirement::PropertyNotTrue { property, actual } => {
                write!(f, "{} is {} (required TRUE)", property, describe(actual))
            }
            UnmetRequirement::PropertyNotFalse { property, actual } => {
                write!(f, "{} is {} (required FALSE)", property, describe(actual))
            }
            UnmetRequirement::VersionsUnknown => {
                write!(f, "supported protocol versions are unknown")
            }
            UnmetRequirement::VersionNotSupported(version) => {
                write!(f, "target lacks required protocol version {}", version)
            }
            UnmetRequirement::ExtensionsUnknown => write!(f, "supported extensions are unknown"),
            UnmetRequirement::ExtensionNotSupported(ext) => {
                write!(f, "target lacks required extension {}", ext)
            }
            UnmetRequirement::NoAlternativeSatisfied => {
                write!(f, "none of the alternative requirements is satisfied")
            }
            UnmetRequirement::ExcludedConditionHolds => {
                write!(f, "an excluded condition holds")
            }
        }
    }
}

fn describe(actual: &Option<TestResult>) -> String {
    match actual {
        Some(value) => value.to_string(),
        None => "not tested".to_string(),
    }
}

impl Requirement {
    /// Requirement without clauses; always satisfied
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_probe_types(mut self, probes: impl IntoIterator<Item = ProbeType>) -> Self {
        self.probe_types
            .get_or_insert_with(Vec::new)
            .extend(probes);
        self
    }

    pub fn require_properties(
        mut self,
        properties: impl IntoIterator<Item = AnalyzedProperty>,
    ) -> Self {
        self.properties
            .get_or_insert_with(Vec::new)
            .extend(properties);
        self
    }

    pub fn require_properties_not(
        mut self,
        properties: impl IntoIterator<Item = AnalyzedProperty>,
    ) -> Self {
        self.properties_not
            .get_or_insert_with(Vec::new)
            .extend(properties);
        self
    }

    pub fn require_protocol_versions(
        mut self,
        versions: impl IntoIterator<Item = ProtocolVersion>,
    ) -> Self {
        self.protocol_versions
            .get_or_insert_with(Vec::new)
            .extend(versions);
        self
    }

    pub fn require_extensions(mut self, extensions: impl IntoIterator<Item = ExtensionType>) -> Self {
        self.extensions
            .get_or_insert_with(Vec::new)
            .extend(extensions);
        self
    }

    /// At least one of the alternatives must hold. An empty group never holds.
    pub fn or(mut self, alternatives: impl IntoIterator<Item = Requirement>) -> Self {
        self.or.get_or_insert_with(Vec::new).extend(alternatives);
        self
    }

    /// The wrapped requirement must not hold
    pub fn not(mut self, excluded: Requirement) -> Self {
        self.not = Some(Box::new(excluded));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Probe completions this requirement needs unconditionally
    pub fn required_probe_types(&self) -> &[ProbeType] {
        self.probe_types.as_deref().unwrap_or_default()
    }

    /// Every probe named anywhere outside a NOT clause
    pub fn referenced_probe_types(&self) -> Vec<ProbeType> {
        let mut probes = self.required_probe_types().to_vec();
        for alternative in self.or.iter().flatten() {
            probes.extend(alternative.referenced_probe_types());
        }
        probes
    }

    /// Every property that must be TRUE or FALSE, outside NOT clauses
    pub fn referenced_properties(&self) -> Vec<AnalyzedProperty> {
        let mut properties: Vec<AnalyzedProperty> = self
            .properties
            .iter()
            .chain(self.properties_not.iter())
            .flatten()
            .copied()
            .collect();
        for alternative in self.or.iter().flatten() {
            properties.extend(alternative.referenced_properties());
        }
        properties
    }

    /// Supported-value sets named anywhere outside NOT clauses
    pub fn referenced_fact_sets(&self) -> BTreeSet<FactSet> {
        let mut sets = BTreeSet::new();
        if self.protocol_versions.is_some() {
            sets.insert(FactSet::Versions);
        }
        if self.extensions.is_some() {
            sets.insert(FactSet::Extensions);
        }
        for alternative in self.or.iter().flatten() {
            sets.extend(alternative.referenced_fact_sets());
        }
        sets
    }

    /// Evaluate against a report snapshot
    pub fn evaluate(&self, report: &Report) -> bool {
        self.probe_types_fulfilled(report)
            && self.protocol_versions_fulfilled(report)
            && self.properties_fulfilled(report)
            && self.properties_not_fulfilled(report)
            && self.extensions_fulfilled(report)
            && self.or_fulfilled(report)
            && self.not_fulfilled(report)
    }

    /// List the clauses that currently fail; empty iff `evaluate` is true
    pub fn unmet(&self, report: &Report) -> Vec<UnmetRequirement> {
        let mut unmet = Vec::new();

        for probe in self.probe_types.iter().flatten() {
            if !report.is_probe_executed(*probe) {
                unmet.push(UnmetRequirement::ProbeNotExecuted(*probe));
            }
        }

        for property in self.properties.iter().flatten() {
            let actual = report.get_property(*property);
            if actual != Some(TestResult::True) {
                unmet.push(UnmetRequirement::PropertyNotTrue {
                    property: *property,
                    actual,
                });
            }
        }

        for property in self.properties_not.iter().flatten() {
            let actual = report.get_property(*property);
            if actual != Some(TestResult::False) {
                unmet.push(UnmetRequirement::PropertyNotFalse {
                    property: *property,
                    actual,
                });
            }
        }

        if let Some(required) = &self.protocol_versions {
            match report.versions() {
                None => unmet.push(UnmetRequirement::VersionsUnknown),
                Some(supported) => unmet.extend(
                    required
                        .iter()
                        .filter(|v| !supported.contains(v))
                        .map(|v| UnmetRequirement::VersionNotSupported(*v)),
                ),
            }
        }

        if let Some(required) = &self.extensions {
            match report.extensions() {
                None => unmet.push(UnmetRequirement::ExtensionsUnknown),
                Some(supported) => unmet.extend(
                    required
                        .iter()
                        .filter(|e| !supported.contains(e))
                        .map(|e| UnmetRequirement::ExtensionNotSupported(*e)),
                ),
            }
        }

        if !self.or_fulfilled(report) {
            unmet.push(UnmetRequirement::NoAlternativeSatisfied);
        }

        if !self.not_fulfilled(report) {
            unmet.push(UnmetRequirement::ExcludedConditionHolds);
        }

        unmet
    }

    fn probe_types_fulfilled(&self, report: &Report) -> bool {
        self.probe_types
            .iter()
            .flatten()
            .all(|probe| report.is_probe_executed(*probe))
    }

    fn properties_fulfilled(&self, report: &Report) -> bool {
        self.properties
            .iter()
            .flatten()
            .all(|p| report.get_property(*p) == Some(TestResult::True))
    }

    fn properties_not_fulfilled(&self, report: &Report) -> bool {
        self.properties_not
            .iter()
            .flatten()
            .all(|p| report.get_property(*p) == Some(TestResult::False))
    }

    fn protocol_versions_fulfilled(&self, report: &Report) -> bool {
        let Some(required) = &self.protocol_versions else {
            return true;
        };
        report
            .versions()
            .is_some_and(|supported| required.iter().all(|v| supported.contains(v)))
    }

    fn extensions_fulfilled(&self, report: &Report) -> bool {
        let Some(required) = &self.extensions else {
            return true;
        };
        report
            .extensions()
            .is_some_and(|supported| required.iter().all(|e| supported.contains(e)))
    }

    fn or_fulfilled(&self, report: &Report) -> bool {
        match &self.or {
            None => true,
            Some(alternatives) => alternatives.iter().any(|req| req.evaluate(report)),
        }
    }

    fn not_fulfilled(&self, report: &Report) -> bool {
        match &self.not {
            None => true,
            Some(excluded) => !excluded.evaluate(report),
        }
    }
}

// Probe set validation - Static checks run before any probe is scheduled
//
// Hard edges are the top-level probe completions a requirement names. A cycle
// among them can never be satisfied and is rejected; soft references (OR
// alternatives, properties or supported-value sets nobody declares, probes
// outside the set) only produce warnings and drain to not-executed at scan end.

use crate::error::{ScanError, ScanResult};
use crate::probe::{Contributions, Probe, ProbeType, Requirement};
use crate::report::{AnalyzedProperty, FactSet};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Scheduling-relevant facts a probe declares, captured once per scan
#[derive(Debug, Clone)]
pub struct ProbeDeclaration {
    pub probe: ProbeType,
    pub requirement: Requirement,
    pub properties: Vec<AnalyzedProperty>,
    pub contributions: Contributions,
}

impl ProbeDeclaration {
    pub fn of(probe: &dyn Probe) -> Self {
        Self {
            probe: probe.probe_type(),
            requirement: probe.requirement(),
            properties: probe.properties(),
            contributions: probe.contributions(),
        }
    }
}

/// Hard probe-completion edges of a probe set
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<ProbeType, Vec<ProbeType>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

impl DependencyGraph {
    /// Build the graph, rejecting duplicate probe identities
    pub fn build<'a>(
        declarations: impl IntoIterator<Item = &'a ProbeDeclaration>,
    ) -> ScanResult<Self> {
        let mut edges = BTreeMap::new();
        for declaration in declarations {
            let dependencies = declaration.requirement.required_probe_types().to_vec();
            if edges.insert(declaration.probe, dependencies).is_some() {
                return Err(ScanError::DuplicateProbe {
                    probe: declaration.probe,
                });
            }
        }
        Ok(Self { edges })
    }

    pub fn contains(&self, probe: ProbeType) -> bool {
        self.edges.contains_key(&probe)
    }

    pub fn dependencies_of(&self, probe: ProbeType) -> &[ProbeType] {
        self.edges.get(&probe).map(Vec::as_slice).unwrap_or_default()
    }

    /// First cycle found, as a path that starts and ends on the same probe
    pub fn find_cycle(&self) -> Option<Vec<ProbeType>> {
        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        for probe in self.edges.keys() {
            if !marks.contains_key(probe)
                && let Some(cycle) = self.visit(*probe, &mut marks, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn visit(
        &self,
        probe: ProbeType,
        marks: &mut BTreeMap<ProbeType, Mark>,
        path: &mut Vec<ProbeType>,
    ) -> Option<Vec<ProbeType>> {
        marks.insert(probe, Mark::InProgress);
        path.push(probe);

        for dependency in self.dependencies_of(probe) {
            if !self.contains(*dependency) {
                continue;
            }
            match marks.get(dependency) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|p| p == dependency)?;
                    let mut cycle = path[start..].to_vec();
                    cycle.push(*dependency);
                    return Some(cycle);
                }
                None => {
                    if let Some(cycle) = self.visit(*dependency, marks, path) {
                        return Some(cycle);
                    }
                }
            }
        }

        path.pop();
        marks.insert(probe, Mark::Done);
        None
    }
}

/// Reject probe sets that can never complete, warn about suspicious ones
pub fn validate_probe_set(declarations: &[ProbeDeclaration]) -> ScanResult<()> {
    let graph = DependencyGraph::build(declarations)?;

    if let Some(cycle) = graph.find_cycle() {
        return Err(ScanError::DependencyCycle { cycle });
    }

    let declared: BTreeSet<AnalyzedProperty> = declarations
        .iter()
        .flat_map(|d| d.properties.iter().copied())
        .collect();
    let provided: BTreeSet<FactSet> = declarations
        .iter()
        .flat_map(|d| d.contributions.fact_sets())
        .collect();

    for declaration in declarations {
        let unknown_probes: BTreeSet<ProbeType> = declaration
            .requirement
            .referenced_probe_types()
            .into_iter()
            .filter(|p| !graph.contains(*p))
            .collect();
        if !unknown_probes.is_empty() {
            warn!(
                "Probe {} requires probes that are not part of this scan: {:?}",
                declaration.probe, unknown_probes
            );
        }

        let undeclared: BTreeSet<AnalyzedProperty> = declaration
            .requirement
            .referenced_properties()
            .into_iter()
            .filter(|p| !declared.contains(p))
            .collect();
        if !undeclared.is_empty() {
            warn!(
                "Probe {} requires properties no probe in this scan provides: {:?}",
                declaration.probe, undeclared
            );
        }

        for set in declaration.requirement.referenced_fact_sets() {
            if !provided.contains(&set) {
                warn!(
                    "Probe {} requires {} no probe in this scan provides",
                    declaration.probe, set
                );
            }
        }
    }

    Ok(())
}

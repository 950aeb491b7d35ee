// Scan executor - Dependency-driven readiness loop over a bounded worker pool
//
// The coordinating task owns the report. Every pass it moves the probes whose
// requirements hold out of the unscheduled set and spawns them, then waits for
// the first task to finish (bounded by the stall watchdog), merges every
// finished result one at a time and runs the next pass. Workers only ever see
// the immutable snapshot they were scheduled against.

use super::config::ScanConfig;
use super::dependency::{ProbeDeclaration, validate_probe_set};
use super::progress::{ScanProgressReporter, SilentProgressReporter};
use crate::engine::ProtocolEngine;
use crate::error::{ScanError, ScanResult};
use crate::merge_defect;
use crate::probe::{ErrorResult, FailureKind, Probe, ProbeContext, ProbeResult};
use crate::report::{AnalyzedProperty, ExecutionStatus, Report};
use crate::utils::network::{Target, check_reachable};
use futures::future::select_all;
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

type ProbeOutcome = crate::Result<Box<dyn ProbeResult>>;

struct ProbeEntry {
    probe: Arc<dyn Probe>,
    declaration: ProbeDeclaration,
}

struct RunningProbe {
    declaration: ProbeDeclaration,
    handle: JoinHandle<ProbeOutcome>,
    started: Instant,
}

/// Runs one probe set against one target
pub struct ScanExecutor {
    target: Arc<Target>,
    config: Arc<ScanConfig>,
    engine: Option<Arc<dyn ProtocolEngine>>,
    reporter: Arc<dyn ScanProgressReporter>,
    entries: Vec<ProbeEntry>,
    semaphore: Arc<Semaphore>,
}

impl ScanExecutor {
    /// Validate configuration and probe set; nothing runs yet
    pub fn new(target: Target, probes: Vec<Arc<dyn Probe>>, config: ScanConfig) -> ScanResult<Self> {
        config.validate()?;

        let entries: Vec<ProbeEntry> = probes
            .into_iter()
            .map(|probe| ProbeEntry {
                declaration: ProbeDeclaration::of(probe.as_ref()),
                probe,
            })
            .collect();

        let declarations: Vec<ProbeDeclaration> =
            entries.iter().map(|e| e.declaration.clone()).collect();
        validate_probe_set(&declarations)?;

        Ok(Self {
            target: Arc::new(target),
            semaphore: Arc::new(Semaphore::new(config.threads)),
            config: Arc::new(config),
            engine: None,
            reporter: Arc::new(SilentProgressReporter::new()),
            entries,
        })
    }

    pub fn with_engine(mut self, engine: Arc<dyn ProtocolEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ScanProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn probe_count(&self) -> usize {
        self.entries.len()
    }

    /// Run the scan to completion and hand back the finished report
    pub async fn execute(mut self) -> ScanResult<Report> {
        if self.config.check_reachability {
            check_reachable(&self.target, self.config.connect_timeout())
                .await
                .map_err(|e| ScanError::SetupFailed {
                    target: self.target.label(),
                    details: format!("{:#}", e),
                })?;
        }

        let mut report = Report::new(self.target.label());
        info!(
            "Starting scan of {} with {} probes on {} workers",
            self.target,
            self.entries.len(),
            self.config.threads
        );

        let mut unscheduled = std::mem::take(&mut self.entries);
        let mut running: Vec<RunningProbe> = Vec::new();

        if let Err(e) = self
            .run_loop(&mut report, &mut unscheduled, &mut running)
            .await
        {
            error!("Scan of {} aborted: {}", self.target, e);
            for task in &running {
                task.handle.abort();
            }
            return Err(e);
        }

        self.drain_unscheduled(&mut report, unscheduled)?;
        report.mark_finished();

        info!(
            "Scan of {} finished: {} executed, {} errors, {} not executed",
            self.target,
            report.probes_with_status(ExecutionStatus::Executed).len(),
            report.probes_with_status(ExecutionStatus::Error).len(),
            report.probes_with_status(ExecutionStatus::NotExecuted).len()
        );

        Ok(report)
    }

    /// Schedule, wait and merge until nothing runs and nothing became ready
    async fn run_loop(
        &self,
        report: &mut Report,
        unscheduled: &mut Vec<ProbeEntry>,
        running: &mut Vec<RunningProbe>,
    ) -> ScanResult<()> {
        let watchdog = self.config.watchdog_interval();
        let mut last_merge = Instant::now();

        loop {
            self.schedule_ready(unscheduled, running, report);
            if running.is_empty() {
                return Ok(());
            }

            let remaining = watchdog.saturating_sub(last_merge.elapsed());
            let finished = timeout(
                remaining,
                select_all(running.iter_mut().map(|r| &mut r.handle)),
            )
            .await
            .map(|(outcome, index, _)| (outcome, index));

            match finished {
                Ok((outcome, index)) => {
                    let done = running.remove(index);
                    self.merge_outcome(report, &done.declaration, outcome)?;

                    while let Some(index) = running.iter().position(|r| r.handle.is_finished()) {
                        let done = running.remove(index);
                        let outcome = done.handle.await;
                        self.merge_outcome(report, &done.declaration, outcome)?;
                    }
                }
                Err(_) => self.break_stall(report, running).await?,
            }
            last_merge = Instant::now();
        }
    }

    /// Move every ready probe out of the unscheduled set and spawn it
    fn schedule_ready(
        &self,
        unscheduled: &mut Vec<ProbeEntry>,
        running: &mut Vec<RunningProbe>,
        report: &Report,
    ) {
        let (ready, pending): (Vec<ProbeEntry>, Vec<ProbeEntry>) = std::mem::take(unscheduled)
            .into_iter()
            .partition(|e| e.declaration.requirement.evaluate(report));
        *unscheduled = pending;

        if ready.is_empty() {
            return;
        }

        let snapshot = Arc::new(report.clone());
        for entry in ready {
            debug!("Scheduling probe {}", entry.declaration.probe);
            self.reporter.on_probe_scheduled(entry.declaration.probe);
            running.push(self.spawn(entry, snapshot.clone()));
        }
    }

    fn spawn(&self, entry: ProbeEntry, snapshot: Arc<Report>) -> RunningProbe {
        let context = ProbeContext::new(
            self.target.clone(),
            self.config.clone(),
            snapshot,
            self.engine.clone(),
        );
        let semaphore = self.semaphore.clone();
        let probe = entry.probe;
        let span = info_span!("probe", probe = %entry.declaration.probe);

        let handle = tokio::spawn(
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow::anyhow!("worker pool closed: {}", e))?;
                debug!("Probe started");
                probe.execute(context).await
            }
            .instrument(span),
        );

        RunningProbe {
            declaration: entry.declaration,
            handle,
            started: Instant::now(),
        }
    }

    /// Force-join the oldest running probe, killing it if it stays silent
    async fn break_stall(
        &self,
        report: &mut Report,
        running: &mut Vec<RunningProbe>,
    ) -> ScanResult<()> {
        if running.is_empty() {
            return Ok(());
        }
        let mut oldest = running.remove(0);
        let probe = oldest.declaration.probe;
        warn!(
            "No probe finished within {:?}, force-joining {} (running for {:?})",
            self.config.watchdog_interval(),
            probe,
            oldest.started.elapsed()
        );

        match timeout(self.config.force_join_timeout(), &mut oldest.handle).await {
            Ok(outcome) => self.merge_outcome(report, &oldest.declaration, outcome),
            Err(_) => {
                oldest.handle.abort();
                warn!(
                    "Killed probe {} after {:?} without a result",
                    probe,
                    oldest.started.elapsed()
                );
                let result = ErrorResult::new(
                    probe,
                    oldest.declaration.properties.clone(),
                    FailureKind::Killed,
                    format!("no result after {:?}", oldest.started.elapsed()),
                );
                self.merge(report, &oldest.declaration, Box::new(result))?;
                self.reporter.on_probe_finished(probe, ExecutionStatus::Error);
                Ok(())
            }
        }
    }

    /// Turn a joined task into a result and merge it
    fn merge_outcome(
        &self,
        report: &mut Report,
        declaration: &ProbeDeclaration,
        outcome: Result<ProbeOutcome, JoinError>,
    ) -> ScanResult<()> {
        let probe = declaration.probe;
        let result: Box<dyn ProbeResult> = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Probe {} failed: {:#}", probe, e);
                Box::new(ErrorResult::new(
                    probe,
                    declaration.properties.clone(),
                    FailureKind::Failed,
                    format!("{:#}", e),
                ))
            }
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                error!("Probe {} panicked: {}", probe, message);
                Box::new(ErrorResult::new(
                    probe,
                    declaration.properties.clone(),
                    FailureKind::Panicked,
                    message,
                ))
            }
            Err(e) => {
                error!("Probe {} was cancelled: {}", probe, e);
                Box::new(ErrorResult::new(
                    probe,
                    declaration.properties.clone(),
                    FailureKind::Failed,
                    "task cancelled",
                ))
            }
        };

        self.merge(report, declaration, result)?;
        if let Some(record) = report.get_result(probe) {
            self.reporter.on_probe_finished(probe, record.status);
        }
        Ok(())
    }

    /// Merge a result and check that it wrote exactly what its probe declared
    fn merge(
        &self,
        report: &mut Report,
        declaration: &ProbeDeclaration,
        result: Box<dyn ProbeResult>,
    ) -> ScanResult<()> {
        let probe = declaration.probe;
        if result.probe_type() != probe {
            merge_defect!(
                probe,
                "result carries identity {} instead of {}",
                result.probe_type(),
                probe
            );
        }

        report.take_write_journal();
        result.merge(report)?;
        let journal = report.take_write_journal();

        if !report.has_result(probe) {
            merge_defect!(probe, "merge left no record under the probe's identity");
        }

        let declared: BTreeSet<AnalyzedProperty> = declaration.properties.iter().copied().collect();
        if let Some(property) = journal.properties.difference(&declared).next() {
            return Err(ScanError::UndeclaredProperty {
                probe,
                property: *property,
            });
        }
        let missing: Vec<&AnalyzedProperty> = declared.difference(&journal.properties).collect();
        if !missing.is_empty() {
            merge_defect!(probe, "declared properties not written: {:?}", missing);
        }

        // Error and not-executed records have nothing to add to the sets
        let declared_sets = declaration.contributions.fact_sets();
        if let Some(set) = journal.fact_sets.difference(&declared_sets).next() {
            return Err(ScanError::UndeclaredFactSet { probe, set: *set });
        }
        if report.is_probe_executed(probe)
            && let Some(set) = declared_sets.difference(&journal.fact_sets).next()
        {
            merge_defect!(probe, "declared {} not written", set);
        }

        debug!("Merged result of {}", probe);
        Ok(())
    }

    /// Give every probe that never became ready its could-not-execute result
    fn drain_unscheduled(&self, report: &mut Report, unscheduled: Vec<ProbeEntry>) -> ScanResult<()> {
        if unscheduled.is_empty() {
            return Ok(());
        }

        let names: Vec<String> = unscheduled
            .iter()
            .map(|e| e.declaration.probe.to_string())
            .collect();
        warn!(
            "{} probes could not be executed: {}",
            names.len(),
            names.join(", ")
        );

        for entry in unscheduled {
            let probe = entry.declaration.probe;
            let result = entry.probe.could_not_execute(report);
            self.merge(report, &entry.declaration, result)?;

            let reason = report
                .get_result(probe)
                .and_then(|r| r.details.clone())
                .unwrap_or_default();
            debug!("Probe {} not executed: {}", probe, reason);
            self.reporter.on_probe_not_executed(probe, &reason);
        }

        Ok(())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// Scan progress reporting
//
// The executor calls the reporter synchronously from its coordinating loop,
// after the corresponding merge has been applied to the report.

use crate::probe::ProbeType;
use crate::report::ExecutionStatus;

/// Trait for reporting scan progress
///
/// Decouples progress output from the scheduling loop:
/// - Terminal output for CLI usage
/// - Silent operation for embedded/headless use
/// - Custom reporters for tests
pub trait ScanProgressReporter: Send + Sync {
    /// Called when a probe is handed to the worker pool
    fn on_probe_scheduled(&self, probe: ProbeType);

    /// Called after a running probe's result (genuine or error) was merged
    fn on_probe_finished(&self, probe: ProbeType, status: ExecutionStatus);

    /// Called at scan end for every probe that never became ready
    fn on_probe_not_executed(&self, probe: ProbeType, reason: &str);
}

/// Terminal progress reporter with colored output
pub struct TerminalProgressReporter;

impl TerminalProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgressReporter for TerminalProgressReporter {
    fn on_probe_scheduled(&self, probe: ProbeType) {
        use colored::*;
        println!("{}", format!("{}...", probe).yellow().bold());
    }

    fn on_probe_finished(&self, probe: ProbeType, status: ExecutionStatus) {
        use colored::*;
        match status {
            ExecutionStatus::Executed => println!("  {} {}", "✓".green(), probe),
            ExecutionStatus::Error => println!("  {} {} (error)", "✗".red(), probe),
            ExecutionStatus::NotExecuted => println!("  {} {}", "-".dimmed(), probe),
        }
    }

    fn on_probe_not_executed(&self, probe: ProbeType, reason: &str) {
        use colored::*;
        println!("  {} {}: {}", "-".dimmed(), probe, reason.dimmed());
    }
}

/// Silent progress reporter for headless operation
pub struct SilentProgressReporter;

impl SilentProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SilentProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgressReporter for SilentProgressReporter {
    fn on_probe_scheduled(&self, _probe: ProbeType) {}

    fn on_probe_finished(&self, _probe: ProbeType, _status: ExecutionStatus) {}

    fn on_probe_not_executed(&self, _probe: ProbeType, _reason: &str) {}
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Reporter that records every callback in order
    #[derive(Default)]
    pub(crate) struct RecordingReporter {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ScanProgressReporter for RecordingReporter {
        fn on_probe_scheduled(&self, probe: ProbeType) {
            self.events.lock().unwrap().push(format!("scheduled {probe}"));
        }

        fn on_probe_finished(&self, probe: ProbeType, status: ExecutionStatus) {
            self.events
                .lock()
                .unwrap()
                .push(format!("finished {probe} {status:?}"));
        }

        fn on_probe_not_executed(&self, probe: ProbeType, _reason: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("not executed {probe}"));
        }
    }

    #[test]
    fn test_terminal_reporter_creation() {
        let reporter = TerminalProgressReporter::new();
        reporter.on_probe_scheduled(ProbeType::CipherSuite);
        reporter.on_probe_finished(ProbeType::CipherSuite, ExecutionStatus::Executed);
        reporter.on_probe_not_executed(ProbeType::Drown, "SSLv2 not supported");
    }

    #[test]
    fn test_silent_reporter_creation() {
        let reporter = SilentProgressReporter::new();
        reporter.on_probe_scheduled(ProbeType::CipherSuite);
        reporter.on_probe_finished(ProbeType::CipherSuite, ExecutionStatus::Error);
    }

    #[test]
    fn test_recording_reporter() {
        let reporter = RecordingReporter::default();
        reporter.on_probe_scheduled(ProbeType::Alpn);
        reporter.on_probe_finished(ProbeType::Alpn, ExecutionStatus::Executed);
        assert_eq!(
            reporter.events(),
            vec!["scheduled Alpn", "finished Alpn Executed"]
        );
    }
}

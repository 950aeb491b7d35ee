// Leak test policy - Round counts and timeouts derived from scan thoroughness

use super::{InformationLeakTest, TestInfo};
use crate::protocols::ScannerDetail;
use std::time::Duration;

/// How many rounds an oracle probe gathers and when it escalates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakTestPolicy {
    detail: ScannerDetail,
}

impl LeakTestPolicy {
    pub fn for_detail(detail: ScannerDetail) -> Self {
        Self { detail }
    }

    pub fn detail(&self) -> ScannerDetail {
        self.detail
    }

    /// Rounds gathered before any escalation decision
    pub fn initial_rounds(&self) -> usize {
        if self.detail.is_greater_equal_to(ScannerDetail::Normal) {
            3
        } else {
            1
        }
    }

    /// Total rounds a test holds once it has been extended
    pub fn escalation_rounds(&self) -> usize {
        match self.detail {
            ScannerDetail::Quick | ScannerDetail::Normal => 10,
            ScannerDetail::Detailed => 12,
            ScannerDetail::All => 15,
        }
    }

    /// Rounds appended by one extension
    pub fn additional_rounds(&self) -> usize {
        self.escalation_rounds() - self.initial_rounds()
    }

    /// Whether the probe escalates at all, given whether any of its tests
    /// already saw distinct answers
    pub fn should_escalate(&self, any_distinct: bool) -> bool {
        any_distinct || self.detail.is_greater_equal_to(ScannerDetail::Normal)
    }

    /// Whether a single test is extended during escalation
    pub fn should_extend<T: TestInfo>(&self, test: &InformationLeakTest<T>) -> bool {
        test.is_distinct_answers() || self.detail.is_greater_equal_to(ScannerDetail::Detailed)
    }

    pub fn additional_timeout(&self) -> Duration {
        if self.detail.is_greater_equal_to(ScannerDetail::Detailed) {
            Duration::from_millis(1000)
        } else {
            Duration::from_millis(50)
        }
    }

    pub fn increasing_timeout(&self) -> bool {
        self.detail.is_greater_equal_to(ScannerDetail::Detailed)
    }
}

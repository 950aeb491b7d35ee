// Analyzed properties and their test outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of testing a single property against the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestResult {
    True,
    False,
    Partially,
    Uncertain,
    NotTestedYet,
    CouldNotTest,
    CannotBeTested,
    ErrorDuringTest,
    Timeout,
}

impl TestResult {
    pub fn from_bool(value: bool) -> Self {
        if value {
            TestResult::True
        } else {
            TestResult::False
        }
    }

    /// Whether the value is a definite finding rather than a failure marker
    pub fn is_conclusive(&self) -> bool {
        matches!(
            self,
            TestResult::True | TestResult::False | TestResult::Partially
        )
    }
}

impl From<bool> for TestResult {
    fn from(value: bool) -> Self {
        TestResult::from_bool(value)
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestResult::True => "TRUE",
            TestResult::False => "FALSE",
            TestResult::Partially => "PARTIALLY",
            TestResult::Uncertain => "UNCERTAIN",
            TestResult::NotTestedYet => "NOT_TESTED_YET",
            TestResult::CouldNotTest => "COULD_NOT_TEST",
            TestResult::CannotBeTested => "CANNOT_BE_TESTED",
            TestResult::ErrorDuringTest => "ERROR_DURING_TEST",
            TestResult::Timeout => "TIMEOUT",
        };
        write!(f, "{}", name)
    }
}

/// Facts about the target that probes write and requirements query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyzedProperty {
    SupportsRsa,
    SupportsDh,
    SupportsEcdh,
    SupportsBlockCiphers,
    SupportsSessionIdResumption,
    SupportsSessionTicketResumption,
    SupportsTls13SessionTickets,
    SupportsTls13PskDhe,
    SupportsTls13Psk,
    SupportsTls13ZeroRtt,
    SupportsTls13PskExchangeModes,
    SupportsDtlsCookieExchangeInSessionIdResumption,
    SupportsDtlsCookieExchangeInSessionTicketResumption,
    SupportsHeartbeat,
    AcceptsUnencryptedFinished,
    AcceptsUnencryptedAppData,
    HasEarlyFinishedBug,
    RespectsSignatureAlgorithmsExtension,
    VulnerableToBleichenbacher,
    VulnerableToPaddingOracle,
    VulnerableToPoodle,
    VulnerableToTlsPoodle,
    VulnerableToHeartbleed,
}

impl fmt::Display for AnalyzedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_from_bool() {
        assert_eq!(TestResult::from(true), TestResult::True);
        assert_eq!(TestResult::from(false), TestResult::False);
    }

    #[test]
    fn test_conclusive_results() {
        assert!(TestResult::True.is_conclusive());
        assert!(TestResult::Partially.is_conclusive());
        assert!(!TestResult::CouldNotTest.is_conclusive());
        assert!(!TestResult::ErrorDuringTest.is_conclusive());
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&AnalyzedProperty::SupportsTls13ZeroRtt).unwrap();
        assert_eq!(json, "\"SUPPORTS_TLS13_ZERO_RTT\"");

        let json = serde_json::to_string(&TestResult::ErrorDuringTest).unwrap();
        assert_eq!(json, "\"ERROR_DURING_TEST\"");
    }
}

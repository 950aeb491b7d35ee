// Oracle leak test - Decide whether a target answers equivalent requests differently
//
// Padding and Bleichenbacher style probes send many structurally different but
// semantically equivalent requests ("vectors") and record how the target
// reacted. If the reactions fall into more than one equivalence class the
// target may act as an oracle; the distinction only counts as significant when
// it survives extension with further rounds and passes a chi-squared test of
// independence between vector and response.

pub mod policy;
pub mod runner;
pub mod statistics;

pub use policy::LeakTestPolicy;
pub use runner::{LeakTestRunner, OracleVector, leak_verdict};

use crate::engine::{ExecutionOutcome, ReceivedMessage, SocketState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Significance level below which a distinction is considered real
pub const SIGNIFICANCE_LEVEL: f64 = 0.01;

/// Configuration a leak test was gathered under
pub trait TestInfo: Clone + fmt::Debug + Send + Sync {
    /// Engine configuration used for every round of this test
    fn protocol_config(&self) -> crate::engine::ProtocolConfig;

    /// Short label used in logs and reports
    fn describe(&self) -> String;
}

/// Observable reaction of the target to one request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResponseFingerprint {
    Observed {
        received: Vec<ReceivedMessage>,
        socket_state: SocketState,
    },
    /// The engine could not complete the request at all
    Unavailable,
}

impl ResponseFingerprint {
    pub fn from_outcome(outcome: &ExecutionOutcome) -> Self {
        ResponseFingerprint::Observed {
            received: outcome.received.clone(),
            socket_state: outcome.socket_state,
        }
    }
}

impl fmt::Display for ResponseFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFingerprint::Observed {
                received,
                socket_state,
            } => {
                let messages: Vec<String> = received
                    .iter()
                    .map(|m| match &m.detail {
                        Some(detail) => format!("{}({})", m.kind, detail),
                        None => m.kind.to_string(),
                    })
                    .collect();
                write!(f, "[{}] {:?}", messages.join(","), socket_state)
            }
            ResponseFingerprint::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// One (vector, fingerprint) observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorResponse {
    pub vector: String,
    pub fingerprint: ResponseFingerprint,
}

impl VectorResponse {
    pub fn new(vector: impl Into<String>, fingerprint: ResponseFingerprint) -> Self {
        Self {
            vector: vector.into(),
            fingerprint,
        }
    }
}

/// Accumulated observations for one test configuration
#[derive(Debug, Clone)]
pub struct InformationLeakTest<T: TestInfo> {
    test_info: T,
    observations: Vec<VectorResponse>,
    /// Size of every batch appended by `extend`
    extensions: Vec<usize>,
}

impl<T: TestInfo> InformationLeakTest<T> {
    pub fn new(test_info: T, observations: Vec<VectorResponse>) -> Self {
        Self {
            test_info,
            observations,
            extensions: Vec::new(),
        }
    }

    pub fn test_info(&self) -> &T {
        &self.test_info
    }

    pub fn observations(&self) -> &[VectorResponse] {
        &self.observations
    }

    pub fn is_extended(&self) -> bool {
        !self.extensions.is_empty()
    }

    /// Append observations gathered under the same configuration
    pub fn extend(&mut self, observations: Vec<VectorResponse>) {
        self.extensions.push(observations.len());
        self.observations.extend(observations);
    }

    /// Observations grouped by fingerprint equality, with their counts
    pub fn equivalence_classes(&self) -> BTreeMap<&ResponseFingerprint, usize> {
        let mut classes = BTreeMap::new();
        for observation in &self.observations {
            *classes.entry(&observation.fingerprint).or_insert(0) += 1;
        }
        classes
    }

    /// More than one equivalence class over everything observed so far
    pub fn is_distinct_answers(&self) -> bool {
        has_distinct_answers(&self.observations)
    }

    /// p-value of the vector/response independence test over all observations
    pub fn p_value(&self) -> f64 {
        statistics::independence_p_value(&self.observations)
    }

    /// Distinct answers that persist through at least one extension, hold in
    /// every extension batch and are statistically unlikely to be noise
    pub fn is_significant_distinct_answers(&self) -> bool {
        if !self.is_extended() || !self.is_distinct_answers() {
            return false;
        }

        let mut end = self.observations.len();
        for size in self.extensions.iter().rev() {
            let start = end - size;
            if !has_distinct_answers(&self.observations[start..end]) {
                return false;
            }
            end = start;
        }

        self.p_value() < SIGNIFICANCE_LEVEL
    }
}

fn has_distinct_answers(observations: &[VectorResponse]) -> bool {
    match observations.split_first() {
        None => false,
        Some((first, rest)) => rest.iter().any(|o| o.fingerprint != first.fingerprint),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::{MessageKind, ProtocolConfig};
    use crate::protocols::ProtocolVersion;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct SuiteInfo {
        pub suite: u16,
    }

    impl TestInfo for SuiteInfo {
        fn protocol_config(&self) -> ProtocolConfig {
            ProtocolConfig::new(ProtocolVersion::TLS12).with_cipher_suite(self.suite)
        }

        fn describe(&self) -> String {
            format!("TLS 1.2 / 0x{:04x}", self.suite)
        }
    }

    pub(crate) fn alert(description: &str) -> ResponseFingerprint {
        ResponseFingerprint::Observed {
            received: vec![ReceivedMessage::alert(description)],
            socket_state: SocketState::Closed,
        }
    }

    fn rounds(rounds: usize, answers: &[(&str, &str)]) -> Vec<VectorResponse> {
        let mut observations = Vec::new();
        for _ in 0..rounds {
            for (vector, description) in answers {
                observations.push(VectorResponse::new(*vector, alert(description)));
            }
        }
        observations
    }

    #[test]
    fn test_single_class_is_not_distinct() {
        let test = InformationLeakTest::new(
            SuiteInfo { suite: 0x002f },
            rounds(3, &[("correct", "bad_record_mac"), ("wrong_pad", "bad_record_mac")]),
        );

        assert!(!test.is_distinct_answers());
        assert!(!test.is_significant_distinct_answers());
        assert_eq!(test.equivalence_classes().len(), 1);
    }

    #[test]
    fn test_empty_test_is_not_distinct() {
        let test = InformationLeakTest::new(SuiteInfo { suite: 0x002f }, Vec::new());
        assert!(!test.is_distinct_answers());
        assert_eq!(test.p_value(), 1.0);
    }

    #[test]
    fn test_distinct_but_unextended_small_sample_not_significant() {
        let test = InformationLeakTest::new(
            SuiteInfo { suite: 0x002f },
            rounds(1, &[("correct", "bad_record_mac"), ("wrong_pad", "decrypt_error")]),
        );

        assert!(test.is_distinct_answers());
        assert!(!test.is_significant_distinct_answers());
    }

    #[test]
    fn test_low_p_value_without_extension_not_significant() {
        // 4 vectors x 3 rounds split 2/2: chi-squared 12 on 3 df, p ~ 0.007
        let test = InformationLeakTest::new(
            SuiteInfo { suite: 0x002f },
            rounds(
                3,
                &[
                    ("correct", "bad_record_mac"),
                    ("no_zero", "bad_record_mac"),
                    ("wrong_first", "decode_error"),
                    ("wrong_second", "decode_error"),
                ],
            ),
        );

        assert!(test.is_distinct_answers());
        assert!(test.p_value() < SIGNIFICANCE_LEVEL);
        assert!(!test.is_extended());
        assert!(!test.is_significant_distinct_answers());
    }

    #[test]
    fn test_collapsing_extension_is_not_significant() {
        let mut test = InformationLeakTest::new(
            SuiteInfo { suite: 0x002f },
            rounds(1, &[("correct", "bad_record_mac"), ("wrong_pad", "decrypt_error")]),
        );
        test.extend(rounds(
            9,
            &[("correct", "bad_record_mac"), ("wrong_pad", "bad_record_mac")],
        ));

        assert!(test.is_extended());
        assert_eq!(test.observations().len(), 20);
        assert!(test.is_distinct_answers());
        assert!(!test.is_significant_distinct_answers());
    }

    #[test]
    fn test_persistent_distinction_is_significant() {
        let answers = [("correct", "bad_record_mac"), ("wrong_pad", "decrypt_error")];
        let mut test = InformationLeakTest::new(SuiteInfo { suite: 0x002f }, rounds(1, &answers));
        test.extend(rounds(9, &answers));

        assert!(test.is_distinct_answers());
        assert!(test.p_value() < SIGNIFICANCE_LEVEL);
        assert!(test.is_significant_distinct_answers());

        let classes = test.equivalence_classes();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes.values().sum::<usize>(), 20);
    }

    #[test]
    fn test_fingerprint_display() {
        let fingerprint = ResponseFingerprint::Observed {
            received: vec![
                ReceivedMessage::new(MessageKind::ServerHello),
                ReceivedMessage::alert("bad_record_mac"),
            ],
            socket_state: SocketState::Closed,
        };
        assert_eq!(
            fingerprint.to_string(),
            "[ServerHello,Alert(bad_record_mac)] Closed"
        );
        assert_eq!(ResponseFingerprint::Unavailable.to_string(), "unavailable");
    }
}

// Leak test runner - Gathers oracle observations through the protocol engine

use super::{InformationLeakTest, LeakTestPolicy, ResponseFingerprint, TestInfo, VectorResponse};
use crate::Result;
use crate::engine::{MessagePlan, ProtocolEngine};
use crate::report::TestResult;
use std::sync::Arc;
use tracing::{debug, info};

/// One request variant sent to the target every round
#[derive(Debug, Clone)]
pub struct OracleVector {
    pub name: String,
    pub plan: MessagePlan,
}

impl OracleVector {
    pub fn new(name: impl Into<String>, plan: MessagePlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Drives the engine for the rounds an oracle probe needs
pub struct LeakTestRunner {
    engine: Arc<dyn ProtocolEngine>,
    policy: LeakTestPolicy,
}

impl LeakTestRunner {
    pub fn new(engine: Arc<dyn ProtocolEngine>, policy: LeakTestPolicy) -> Self {
        Self { engine, policy }
    }

    pub fn policy(&self) -> LeakTestPolicy {
        self.policy
    }

    /// Gather the initial rounds for one configuration
    pub async fn run<T: TestInfo>(
        &self,
        info: T,
        vectors: &[OracleVector],
    ) -> Result<InformationLeakTest<T>> {
        let observations = self
            .gather(&info, vectors, self.policy.initial_rounds(), false)
            .await?;
        Ok(InformationLeakTest::new(info, observations))
    }

    /// Append the policy's additional rounds to an existing test
    pub async fn extend<T: TestInfo>(
        &self,
        test: &mut InformationLeakTest<T>,
        vectors: &[OracleVector],
    ) -> Result<()> {
        let observations = self
            .gather(test.test_info(), vectors, self.policy.additional_rounds(), true)
            .await?;
        test.extend(observations);
        Ok(())
    }

    /// Run every configuration, then escalate the ones the policy selects
    pub async fn run_with_escalation<T: TestInfo>(
        &self,
        infos: Vec<T>,
        vectors: &[OracleVector],
    ) -> Result<Vec<InformationLeakTest<T>>> {
        let mut tests = Vec::with_capacity(infos.len());
        for info in infos {
            tests.push(self.run(info, vectors).await?);
        }

        let any_distinct = tests.iter().any(|t| t.is_distinct_answers());
        if !self.policy.should_escalate(any_distinct) {
            return Ok(tests);
        }

        for test in tests.iter_mut() {
            if self.policy.should_extend(test) {
                info!(
                    "Extending leak test {} by {} rounds",
                    test.test_info().describe(),
                    self.policy.additional_rounds()
                );
                self.extend(test, vectors).await?;
            }
        }

        Ok(tests)
    }

    async fn gather<T: TestInfo>(
        &self,
        info: &T,
        vectors: &[OracleVector],
        rounds: usize,
        escalated: bool,
    ) -> Result<Vec<VectorResponse>> {
        let mut config = info.protocol_config();
        if escalated {
            config.additional_timeout = self.policy.additional_timeout();
            config.increasing_timeout = self.policy.increasing_timeout();
        }

        let mut observations = Vec::with_capacity(rounds * vectors.len());
        for round in 0..rounds {
            let mut failed = 0;
            for vector in vectors {
                let fingerprint = match self.engine.execute(&config, &vector.plan).await {
                    Ok(outcome) => ResponseFingerprint::from_outcome(&outcome),
                    Err(e) => {
                        debug!("Vector {} failed in round {}: {}", vector.name, round, e);
                        failed += 1;
                        ResponseFingerprint::Unavailable
                    }
                };
                observations.push(VectorResponse::new(vector.name.clone(), fingerprint));
            }

            if !vectors.is_empty() && failed == vectors.len() {
                anyhow::bail!(
                    "oracle unstable: every vector failed in round {} of {}",
                    round + 1,
                    info.describe()
                );
            }
        }

        Ok(observations)
    }
}

/// TRUE when any test shows significant distinct answers
pub fn leak_verdict<T: TestInfo>(tests: &[InformationLeakTest<T>]) -> TestResult {
    if tests.is_empty() {
        return TestResult::CouldNotTest;
    }
    TestResult::from_bool(tests.iter().any(|t| t.is_significant_distinct_answers()))
}

// Statistics - Pearson chi-squared test of independence between vector and response

use super::{ResponseFingerprint, VectorResponse};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeMap;

/// Contingency table with vectors as rows and fingerprints as columns
#[derive(Debug, Clone, Default)]
pub struct ContingencyTable<'a> {
    counts: BTreeMap<&'a str, BTreeMap<&'a ResponseFingerprint, usize>>,
    columns: BTreeMap<&'a ResponseFingerprint, usize>,
    total: usize,
}

impl<'a> ContingencyTable<'a> {
    pub fn from_observations(observations: &'a [VectorResponse]) -> Self {
        let mut table = Self::default();
        for observation in observations {
            *table
                .counts
                .entry(observation.vector.as_str())
                .or_default()
                .entry(&observation.fingerprint)
                .or_insert(0) += 1;
            *table.columns.entry(&observation.fingerprint).or_insert(0) += 1;
            table.total += 1;
        }
        table
    }

    pub fn rows(&self) -> usize {
        self.counts.len()
    }

    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.rows().saturating_sub(1) * self.columns().saturating_sub(1)
    }

    /// Pearson's statistic: sum of (observed - expected)^2 / expected
    pub fn chi_squared(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;

        let mut statistic = 0.0;
        for row in self.counts.values() {
            let row_total: usize = row.values().sum();
            for (fingerprint, column_total) in &self.columns {
                let expected = row_total as f64 * *column_total as f64 / total;
                let observed = row.get(fingerprint).copied().unwrap_or(0) as f64;
                statistic += (observed - expected).powi(2) / expected;
            }
        }
        statistic
    }
}

/// p-value for "response is independent of vector". 1.0 when the table is
/// degenerate (a single vector or a single response class).
pub fn independence_p_value(observations: &[VectorResponse]) -> f64 {
    let table = ContingencyTable::from_observations(observations);
    let df = table.degrees_of_freedom();
    if df == 0 {
        return 1.0;
    }

    match ChiSquared::new(df as f64) {
        Ok(distribution) => distribution.sf(table.chi_squared()),
        Err(_) => 1.0,
    }
}

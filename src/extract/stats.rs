#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The statistics block printed after extraction.

use crate::extract::direct_amo::DirectAmo;
use crate::extract::encoded_amo::EncodedAmo;
use crate::extract::engine::ExtractionEngine;
use crate::knf::literal::Var;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// The engines that ran, in pipeline order, plus totals over the whole run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// The direct AMO engine, if it ran.
    pub direct: Option<DirectAmo>,
    /// The encoded AMO pass, if it ran.
    pub encoded: Option<EncodedAmo>,
    /// The generalized encoded pass, if it ran.
    pub others: Option<EncodedAmo>,
    /// Clauses left in the formula after extraction.
    pub clausal_constraints: usize,
    /// Clusters accepted by the BDD analysis.
    pub bdd_successes: usize,
    /// Clusters rejected by the BDD analysis.
    pub bdd_failures: usize,
    /// Wall-clock time of the whole pipeline.
    pub elapsed: Duration,
}

impl ExtractionReport {
    /// The engines that ran, in pipeline order.
    pub fn engines(&self) -> impl Iterator<Item = &dyn ExtractionEngine> {
        let direct = self.direct.iter().map(|e| e as &dyn ExtractionEngine);
        let encoded = self
            .encoded
            .iter()
            .chain(&self.others)
            .map(|e| e as &dyn ExtractionEngine);
        direct.chain(encoded)
    }

    /// Cardinality constraints committed by all engines.
    #[must_use]
    pub fn total_constraints(&self) -> usize {
        self.engines().map(|e| e.stats().constraints).sum()
    }

    /// Encoding variables eliminated by any engine.
    #[must_use]
    pub fn eliminated_variables(&self) -> BTreeSet<Var> {
        self.engines()
            .flat_map(|e| e.stats().eliminated_variables.iter().copied())
            .collect()
    }

    /// Whether any engine ran out of time.
    #[must_use]
    pub fn reached_timeout(&self) -> bool {
        self.engines().any(|e| e.stats().reached_timeout)
    }
}

impl fmt::Display for ExtractionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "c Clausal constraints: {}", self.clausal_constraints)?;
        for engine in self.engines() {
            engine.write_stats(f)?;
        }
        writeln!(f, "c BDD analyze successes: {}", self.bdd_successes)?;
        writeln!(f, "c BDD analyze failures: {}", self.bdd_failures)?;
        writeln!(f, "c Total seconds: {:.3}", self.elapsed.as_secs_f64())?;
        writeln!(f, "c Total extracted constraints: {}", self.total_constraints())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::config::EncodedAmoConfig;

    #[test]
    fn test_empty_report() {
        let report = ExtractionReport {
            clausal_constraints: 7,
            ..ExtractionReport::default()
        };
        let text = report.to_string();
        assert!(text.starts_with("c Clausal constraints: 7\n"));
        assert!(text.ends_with("c Total extracted constraints: 0\n"));
        assert_eq!(report.engines().count(), 0);
    }

    #[test]
    fn test_engines_in_pipeline_order() {
        let report = ExtractionReport {
            direct: Some(DirectAmo::new(Duration::from_secs(1))),
            encoded: Some(EncodedAmo::new(EncodedAmoConfig::amo(), Duration::from_secs(1))),
            others: Some(EncodedAmo::new(EncodedAmoConfig::others(), Duration::from_secs(1))),
            ..ExtractionReport::default()
        };
        let names: Vec<&str> = report.engines().map(|e| e.name()).collect();
        assert_eq!(names, ["Direct AMO", "Encoded AMO", "Encoded Others"]);

        let text = report.to_string();
        let direct = text.find("c Direct AMO constraints").unwrap();
        let others = text.find("c Encoded Others constraints").unwrap();
        assert!(direct < others);
        assert!(!report.reached_timeout());
    }
}

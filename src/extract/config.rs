#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Configuration of the extraction pipeline.
//!
//! Defaults reproduce the usual command-line behaviour: direct and encoded AMO
//! detection with the deferred small-clique pass, no generalized encoded pass,
//! and a 1000 second budget per engine.

use crate::bdd::DEFAULT_SEED;
use std::time::Duration;

/// Default per-engine time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1000);

/// Size and density limits a traced cluster must meet before it is analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionThresholds {
    /// Fewest problem variables worth analysing.
    pub min_problem_vars: usize,
    /// Most problem variables the BDD analysis is attempted on.
    pub max_problem_vars: usize,
    /// Most encoding variables the BDD analysis is attempted on.
    pub max_encoding_vars: usize,
    /// AMO-biased mode rejects clusters with more than this many encoding
    /// variables per problem variable.
    pub amo_encoding_ratio: usize,
    /// General mode rejects clusters where `general_encoding_factor * |E|`
    /// exceeds `|P|^2`.
    pub general_encoding_factor: usize,
    /// Problem-variable count above which sparse clusters are rejected.
    pub sparse_floor: usize,
    /// A cluster above the floor needs at least one encoding variable per
    /// `sparse_ratio` problem variables.
    pub sparse_ratio: usize,
}

impl Default for AdmissionThresholds {
    fn default() -> Self {
        Self {
            min_problem_vars: 3,
            max_problem_vars: 300,
            max_encoding_vars: 600,
            amo_encoding_ratio: 3,
            general_encoding_factor: 2,
            sparse_floor: 10,
            sparse_ratio: 3,
        }
    }
}

impl AdmissionThresholds {
    /// Whether a closed cluster of `problem` problem variables and `encoding`
    /// encoding variables passes the filters.
    #[must_use]
    pub const fn admits(&self, problem: usize, encoding: usize, amo_biased: bool) -> bool {
        if problem < self.min_problem_vars
            || problem > self.max_problem_vars
            || encoding > self.max_encoding_vars
        {
            return false;
        }
        if amo_biased {
            if encoding > self.amo_encoding_ratio * problem {
                return false;
            }
        } else if self.general_encoding_factor * encoding > problem * problem {
            return false;
        }
        !(problem > self.sparse_floor && self.sparse_ratio * encoding < problem)
    }
}

/// Settings of one encoded-constraint pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedAmoConfig {
    /// Use the admission filter tuned for at-most-one encodings.
    pub amo_biased: bool,
    /// Only clauses up to this size take part in role classification.
    pub max_clause_size: usize,
    /// Admission filters for traced clusters.
    pub thresholds: AdmissionThresholds,
}

impl EncodedAmoConfig {
    /// The at-most-one pass: binary clauses, AMO-biased admission.
    #[must_use]
    pub fn amo() -> Self {
        Self {
            amo_biased: true,
            max_clause_size: 2,
            thresholds: AdmissionThresholds::default(),
        }
    }

    /// The generalized pass: clauses up to size 3, general admission.
    #[must_use]
    pub fn others() -> Self {
        Self {
            amo_biased: false,
            max_clause_size: 3,
            thresholds: AdmissionThresholds::default(),
        }
    }
}

impl Default for EncodedAmoConfig {
    fn default() -> Self {
        Self::amo()
    }
}

/// Which engines run, their budgets, and their settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExtractorConfig {
    /// Run direct AMO detection.
    pub direct_amo: bool,
    /// Run the deferred pass over cliques of four or fewer literals.
    pub direct_amo_small: bool,
    /// Run encoded AMO detection.
    pub encoded_amo: bool,
    /// Run the generalized encoded pass last.
    pub encoded_others: bool,
    /// Write the reduced formula.
    pub write_knf: bool,
    /// Budget of the direct engine.
    pub direct_timeout: Duration,
    /// Budget of each encoded pass.
    pub encoded_timeout: Duration,
    /// Seed of the BDD variable-ordering heuristic.
    pub seed: u64,
    /// Settings of the encoded AMO pass.
    pub encoded: EncodedAmoConfig,
    /// Settings of the generalized encoded pass.
    pub others: EncodedAmoConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            direct_amo: true,
            direct_amo_small: true,
            encoded_amo: true,
            encoded_others: false,
            write_knf: true,
            direct_timeout: DEFAULT_TIMEOUT,
            encoded_timeout: DEFAULT_TIMEOUT,
            seed: DEFAULT_SEED,
            encoded: EncodedAmoConfig::amo(),
            others: EncodedAmoConfig::others(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert!(config.direct_amo && config.direct_amo_small && config.encoded_amo);
        assert!(!config.encoded_others);
        assert_eq!(config.direct_timeout, Duration::from_secs(1000));
        assert_eq!(config.others.max_clause_size, 3);
        assert!(!config.others.amo_biased);
    }

    #[test]
    fn test_admission_bounds() {
        let t = AdmissionThresholds::default();
        assert!(!t.admits(2, 1, true));
        assert!(t.admits(3, 1, true));
        assert!(!t.admits(301, 100, true));
        assert!(!t.admits(200, 601, false));
    }

    #[test]
    fn test_admission_ratios() {
        let t = AdmissionThresholds::default();
        // AMO-biased: at most three encoding variables per problem variable.
        assert!(t.admits(4, 12, true));
        assert!(!t.admits(4, 13, true));
        // General: 2|E| <= |P|^2.
        assert!(t.admits(4, 8, false));
        assert!(!t.admits(4, 9, false));
        // Sparse: above ten problem variables, 3|E| >= |P|.
        assert!(!t.admits(12, 3, true));
        assert!(t.admits(12, 4, true));
        assert!(t.admits(10, 1, true));
    }

    #[test]
    fn test_general_encoding_factor() {
        let strict = AdmissionThresholds {
            general_encoding_factor: 4,
            ..AdmissionThresholds::default()
        };
        assert!(strict.admits(4, 4, false));
        assert!(!strict.admits(4, 5, false));
        // The AMO-biased filter ignores it.
        assert!(strict.admits(4, 12, true));

        let loose = AdmissionThresholds {
            general_encoding_factor: 1,
            ..AdmissionThresholds::default()
        };
        assert!(loose.admits(4, 16, false));
        assert!(!loose.admits(4, 17, false));
    }
}

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Validation and commitment of candidate clusters.
//!
//! Engines propose a cluster as three disjoint lists: problem variables,
//! encoding variables, and the ids of the clauses over them. The extractor
//! renumbers the cluster densely (problem variables first), runs the BDD
//! analysis, and if the clauses project onto a cardinality constraint it
//! replaces them with the resulting klauses.

use crate::bdd::bdd_analyze;
use crate::knf::formula::{ClauseId, Formula};
use crate::knf::klause::Klause;
use crate::knf::literal::{Lit, Var, lit_of, var_of};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// Owns the formula while engines run, and counts analysis outcomes.
#[derive(Debug, Clone)]
pub struct Extractor {
    /// The formula being reduced.
    pub formula: Formula,
    seed: u64,
    /// Clusters the analysis turned into klauses.
    pub bdd_successes: usize,
    /// Clusters the analysis rejected.
    pub bdd_failures: usize,
}

impl Extractor {
    /// Takes ownership of `formula`; `seed` drives the variable ordering.
    #[must_use]
    pub const fn new(formula: Formula, seed: u64) -> Self {
        Self {
            formula,
            seed,
            bdd_successes: 0,
            bdd_failures: 0,
        }
    }

    /// The reduced formula.
    #[must_use]
    pub fn into_formula(self) -> Formula {
        self.formula
    }

    /// Commits a klause and deletes the clauses it replaces.
    pub fn add_klause(&mut self, klause: Klause, consumed: &[ClauseId]) {
        trace!(%klause, consumed = consumed.len(), "klause committed");
        self.formula.add_klause(klause, consumed);
    }

    /// Analyses a candidate cluster and, if it encodes a cardinality
    /// constraint over `problem`, replaces `clause_ids` with it.
    ///
    /// Returns whether at least one klause was committed.
    ///
    /// # Panics
    ///
    /// If a variable is listed twice, a clause mentions a variable outside
    /// `problem` and `encoding`, or a clause is already deleted.
    pub fn validate_constraint(
        &mut self,
        problem: &[Var],
        encoding: &[Var],
        clause_ids: &[ClauseId],
    ) -> bool {
        let mut dense: FxHashMap<Var, Var> = FxHashMap::default();
        let mut original: Vec<Var> = vec![0];
        for &v in problem.iter().chain(encoding) {
            let next = Var::try_from(original.len()).expect("cluster is smaller than the formula");
            assert!(dense.insert(v, next).is_none(), "variable {v} listed twice");
            original.push(v);
        }

        let clauses: Vec<Vec<Lit>> = clause_ids
            .iter()
            .map(|&id| {
                let clause = self.formula.clause(id);
                assert!(!clause.deleted, "clause {id} is already deleted");
                clause
                    .iter()
                    .map(|&l| {
                        let v = dense.get(&var_of(l)).unwrap_or_else(|| {
                            panic!("variable {} of clause {id} is outside the cluster", var_of(l))
                        });
                        lit_of(*v, l > 0)
                    })
                    .collect()
            })
            .collect();

        let nvar = problem.len() + encoding.len();
        let klauses = match bdd_analyze(nvar, problem.len(), &clauses, self.seed) {
            Ok(klauses) => klauses,
            Err(e) => {
                debug!(problem = problem.len(), encoding = encoding.len(), "analysis failed: {e}");
                Vec::new()
            }
        };
        if klauses.is_empty() {
            self.bdd_failures += 1;
            return false;
        }

        for klause in klauses {
            let literals = klause
                .literals
                .iter()
                .map(|&l| lit_of(original[var_of(l) as usize], l > 0));
            self.add_klause(Klause::cardinality(literals, klause.bound), clause_ids);
        }
        self.bdd_successes += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commander() -> Formula {
        Formula::from_clauses([
            vec![-10, -20],
            vec![-30, -40],
            vec![-10, 50],
            vec![-20, 50],
            vec![-30, -50],
            vec![-40, -50],
            vec![10, 60],
        ])
    }

    #[test]
    fn test_success_commits_mapped_klause() {
        let mut ex = Extractor::new(commander(), 123_456);
        assert!(ex.validate_constraint(&[10, 20, 30, 40], &[50], &[0, 1, 2, 3, 4, 5]));
        assert_eq!(ex.bdd_successes, 1);
        assert_eq!(ex.formula.klauses, vec![Klause::new([-10, -20, -30, -40], 3)]);
        assert_eq!(ex.formula.live_clauses().map(|(id, _)| id).collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn test_failure_leaves_formula_untouched() {
        let mut ex = Extractor::new(
            Formula::from_clauses([vec![-1, 3], vec![-2, 3], vec![1, -3], vec![2, -3]]),
            123_456,
        );
        let before = ex.formula.clone();
        assert!(!ex.validate_constraint(&[1, 2], &[3], &[0, 1, 2, 3]));
        assert_eq!(ex.bdd_failures, 1);
        assert_eq!(ex.formula, before);
    }

    #[test]
    #[should_panic(expected = "already deleted")]
    fn test_deleted_clause_is_an_invariant_violation() {
        let mut ex = Extractor::new(commander(), 123_456);
        ex.formula.mark_deleted([0]);
        ex.validate_constraint(&[10, 20, 30, 40], &[50], &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    #[should_panic(expected = "outside the cluster")]
    fn test_unmapped_variable_is_an_invariant_violation() {
        let mut ex = Extractor::new(commander(), 123_456);
        ex.validate_constraint(&[10, 20, 30, 40], &[50], &[0, 6]);
    }
}

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Recovery of cardinality constraints hidden behind auxiliary variables.
//!
//! Encodings such as the commander or sequential-counter AMO introduce
//! auxiliary variables that occur in both polarities, while the constrained
//! literals occur in only one. Variables are classified that way over the
//! short clauses, clusters are traced outward from each encoding variable,
//! and every cluster that passes the admission filters is handed to
//! [`Extractor::validate_constraint`].

use crate::extract::config::EncodedAmoConfig;
use crate::extract::engine::{Deadline, EngineStats, ExtractionEngine};
use crate::extract::extractor::Extractor;
use crate::knf::formula::{ClauseId, Formula};
use crate::knf::literal::{Var, var_of};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default)]
struct Polarity {
    positive: bool,
    negative: bool,
}

/// A traced cluster before normalization.
#[derive(Debug, Clone, Default)]
struct Cluster {
    problem: BTreeSet<Var>,
    encoding: BTreeSet<Var>,
    clause_ids: BTreeSet<ClauseId>,
    /// A clause reached a variable that is neither problem nor encoding.
    open: bool,
}

/// Finds constraints encoded through auxiliary variables.
///
/// The same engine runs the AMO pass and the generalized pass; its
/// [`EncodedAmoConfig`] selects the clause size and admission mode.
#[derive(Debug, Clone)]
pub struct EncodedAmo {
    config: EncodedAmoConfig,
    /// Unconsumed encoding variables and the live clauses containing them.
    encoding_index: BTreeMap<Var, Vec<ClauseId>>,
    problem_index: BTreeMap<Var, Vec<ClauseId>>,
    stats: EngineStats,
}

impl EncodedAmo {
    /// An engine for one pass, with empty indices.
    #[must_use]
    pub fn new(config: EncodedAmoConfig, timeout: Duration) -> Self {
        Self {
            config,
            encoding_index: BTreeMap::new(),
            problem_index: BTreeMap::new(),
            stats: EngineStats::new(timeout),
        }
    }

    /// Encoding variables not yet traced.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.encoding_index.len()
    }

    fn classify(&self, formula: &Formula) -> BTreeMap<Var, Polarity> {
        let mut polarity: BTreeMap<Var, Polarity> = BTreeMap::new();
        for (_, clause) in formula.live_clauses() {
            if clause.len() > self.config.max_clause_size {
                continue;
            }
            for &lit in clause.iter() {
                let entry = polarity.entry(var_of(lit)).or_default();
                if lit > 0 {
                    entry.positive = true;
                } else {
                    entry.negative = true;
                }
            }
        }
        polarity
    }

    fn trace_cluster(&mut self, formula: &Formula, seed: Var) -> Cluster {
        let mut cluster = Cluster::default();
        let mut queue = BTreeSet::from([seed]);
        cluster.encoding.insert(seed);

        while let Some(current) = queue.pop_first() {
            let ids = self.encoding_index.remove(&current).unwrap_or_default();
            for id in ids {
                if formula.is_deleted(id) {
                    continue;
                }
                cluster.clause_ids.insert(id);
                for var in formula.clause(id).variables() {
                    if var == current
                        || cluster.problem.contains(&var)
                        || cluster.encoding.contains(&var)
                    {
                        continue;
                    }
                    if self.encoding_index.contains_key(&var) {
                        queue.insert(var);
                        cluster.encoding.insert(var);
                    } else if self.problem_index.contains_key(&var) {
                        cluster.problem.insert(var);
                    } else {
                        cluster.open = true;
                    }
                }
            }
        }
        cluster
    }

    /// Pulls in the short clauses among the problem variables.
    fn expand(&self, formula: &Formula, cluster: &mut Cluster) {
        let inside = |v: Var| cluster.problem.contains(&v) || cluster.encoding.contains(&v);
        let mut absorbed = Vec::new();
        for p in &cluster.problem {
            let Some(ids) = self.problem_index.get(p) else {
                continue;
            };
            for &id in ids {
                let clause = formula.clause(id);
                if clause.is_deleted() || clause.len() > 2 {
                    continue;
                }
                if clause.variables().all(inside) {
                    absorbed.push(id);
                }
            }
        }
        cluster.clause_ids.extend(absorbed);
    }

    /// Lists the cluster's variables in order of first appearance over the
    /// sorted clause ids.
    fn normalize(formula: &Formula, cluster: &Cluster) -> Option<(Vec<Var>, Vec<Var>)> {
        let mut problem_left = cluster.problem.clone();
        let mut encoding_left = cluster.encoding.clone();
        let mut problem = Vec::with_capacity(problem_left.len());
        let mut encoding = Vec::with_capacity(encoding_left.len());

        for &id in &cluster.clause_ids {
            for var in formula.clause(id).variables() {
                if problem_left.remove(&var) {
                    problem.push(var);
                } else if encoding_left.remove(&var) {
                    encoding.push(var);
                } else if !problem.contains(&var) && !encoding.contains(&var) {
                    return None;
                }
            }
        }
        (problem_left.is_empty() && encoding_left.is_empty()).then_some((problem, encoding))
    }
}

impl ExtractionEngine for EncodedAmo {
    fn name(&self) -> &'static str {
        if self.config.amo_biased {
            "Encoded AMO"
        } else {
            "Encoded Others"
        }
    }

    fn init(&mut self, formula: &Formula) {
        self.encoding_index.clear();
        self.problem_index.clear();
        for (var, polarity) in self.classify(formula) {
            if polarity.positive && polarity.negative {
                self.encoding_index.insert(var, Vec::new());
            } else {
                self.problem_index.insert(var, Vec::new());
            }
        }

        for (id, clause) in formula.live_clauses() {
            for var in clause.variables() {
                let ids = match self.encoding_index.get_mut(&var) {
                    Some(ids) => Some(ids),
                    None => self.problem_index.get_mut(&var),
                };
                if let Some(ids) = ids {
                    if ids.last() != Some(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        debug!(
            engine = self.name(),
            encoding = self.encoding_index.len(),
            problem = self.problem_index.len(),
            "variables classified"
        );
    }

    fn run(&mut self, extractor: &mut Extractor) {
        let deadline = Deadline::start(self.stats.timeout);
        let thresholds = self.config.thresholds;
        let amo_biased = self.config.amo_biased;

        while let Some((&seed, _)) = self.encoding_index.first_key_value() {
            if deadline.expired() {
                self.stats.reached_timeout = true;
                break;
            }

            let mut cluster = self.trace_cluster(&extractor.formula, seed);
            trace!(
                seed,
                problem = cluster.problem.len(),
                encoding = cluster.encoding.len(),
                clauses = cluster.clause_ids.len(),
                open = cluster.open,
                "cluster traced"
            );
            if cluster.open
                || !thresholds.admits(cluster.problem.len(), cluster.encoding.len(), amo_biased)
            {
                continue;
            }

            self.expand(&extractor.formula, &mut cluster);
            let Some((problem, encoding)) = Self::normalize(&extractor.formula, &cluster) else {
                continue;
            };

            let clause_ids: Vec<ClauseId> = cluster.clause_ids.into_iter().collect();
            if extractor.validate_constraint(&problem, &encoding, &clause_ids) {
                self.stats.record_constraint(problem.len());
                self.stats.eliminated_variables.extend(encoding);
            }
        }

        self.stats.elapsed = deadline.elapsed();
        debug!(
            engine = self.name(),
            constraints = self.stats.constraints,
            eliminated = self.stats.eliminated_variables.len(),
            timeout = self.stats.reached_timeout,
            "encoded extraction finished"
        );
    }

    fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdd::DEFAULT_SEED;
    use crate::knf::klause::Klause;
    use crate::knf::literal::Lit;
    use proptest::prelude::*;

    fn commander() -> Vec<Vec<Lit>> {
        vec![
            vec![-1, -2],
            vec![-3, -4],
            vec![-1, 5],
            vec![-2, 5],
            vec![-3, -5],
            vec![-4, -5],
        ]
    }

    fn sequential(n: u32) -> Vec<Vec<Lit>> {
        // x1..xn data, s(n+1)..s(2n-1) auxiliaries.
        let x = |i: u32| i32::try_from(i).unwrap();
        let s = |i: u32| x(n + i);
        let mut clauses = vec![vec![-x(1), s(1)]];
        for i in 2..n {
            clauses.push(vec![-x(i), s(i)]);
            clauses.push(vec![-s(i - 1), s(i)]);
            clauses.push(vec![-x(i), -s(i - 1)]);
        }
        clauses.push(vec![-x(n), -s(n - 1)]);
        clauses
    }

    fn run_with(formula: Formula, config: EncodedAmoConfig, timeout: Duration) -> (EncodedAmo, Extractor) {
        let mut engine = EncodedAmo::new(config, timeout);
        let mut extractor = Extractor::new(formula, DEFAULT_SEED);
        engine.init(&extractor.formula);
        engine.run(&mut extractor);
        (engine, extractor)
    }

    fn run(formula: Formula) -> (EncodedAmo, Extractor) {
        run_with(formula, EncodedAmoConfig::amo(), Duration::from_secs(10))
    }

    #[test]
    fn test_commander_cluster_becomes_amo() {
        let mut clauses = commander();
        clauses.push(vec![1, 6, 7]);
        let (engine, extractor) = run(Formula::from_clauses(clauses));

        assert_eq!(extractor.formula.klauses, vec![Klause::new([-1, -2, -3, -4], 3)]);
        assert_eq!(
            extractor.formula.live_clauses().map(|(id, _)| id).collect::<Vec<_>>(),
            vec![6]
        );
        let stats = engine.stats();
        assert_eq!(stats.constraints, 1);
        assert_eq!(stats.constraint_sizes.get(&4), Some(&1));
        assert_eq!(stats.eliminated_variables, BTreeSet::from([5]));
        assert_eq!(engine.pending(), 0);
    }

    #[test]
    fn test_sequential_counter_becomes_amo() {
        let (engine, extractor) = run(Formula::from_clauses(sequential(4)));
        assert_eq!(extractor.formula.klauses, vec![Klause::new([-1, -2, -3, -4], 3)]);
        assert_eq!(extractor.formula.kept_clause_count(), 0);
        assert_eq!(engine.stats().eliminated_variables, BTreeSet::from([5, 6, 7]));
    }

    #[test]
    fn test_independent_clusters_are_both_found() {
        let mut clauses = commander();
        clauses.extend(
            commander()
                .into_iter()
                .map(|c| c.into_iter().map(|l| l + 10 * l.signum()).collect()),
        );
        let (engine, extractor) = run(Formula::from_clauses(clauses));
        assert_eq!(
            extractor.formula.klauses,
            vec![
                Klause::new([-1, -2, -3, -4], 3),
                Klause::new([-11, -12, -13, -14], 3),
            ]
        );
        assert_eq!(engine.stats().eliminated_variables, BTreeSet::from([5, 15]));
        assert_eq!(extractor.bdd_successes, 2);
    }

    #[test]
    fn test_open_cluster_is_rejected() {
        let mut clauses = commander();
        // 8 and 9 only occur in a clause too long to be classified.
        clauses.push(vec![5, 8, 9]);
        let formula = Formula::from_clauses(clauses);
        let (engine, extractor) = run(formula.clone());
        assert_eq!(extractor.formula, formula);
        assert_eq!(extractor.bdd_successes + extractor.bdd_failures, 0);
        assert_eq!(engine.stats().constraints, 0);
    }

    #[test]
    fn test_too_few_problem_variables_is_rejected() {
        let formula = Formula::from_clauses([vec![-1, 5], vec![-2, -5]]);
        let (_, extractor) = run(formula.clone());
        assert_eq!(extractor.formula, formula);
        assert_eq!(extractor.bdd_failures, 0);
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let mut clauses = commander();
        clauses.push(vec![1, 6, 7]);
        let (_, first) = run(Formula::from_clauses(clauses));
        let after_first = first.formula.clone();
        let (engine, second) = run(first.into_formula());
        assert_eq!(second.formula, after_first);
        assert_eq!(engine.stats().constraints, 0);
    }

    #[test]
    fn test_zero_timeout() {
        let formula = Formula::from_clauses(commander());
        let (engine, extractor) =
            run_with(formula.clone(), EncodedAmoConfig::amo(), Duration::ZERO);
        assert!(engine.stats().reached_timeout);
        assert_eq!(extractor.formula, formula);
    }

    #[test]
    fn test_engine_names() {
        let amo = EncodedAmo::new(EncodedAmoConfig::amo(), Duration::ZERO);
        let others = EncodedAmo::new(EncodedAmoConfig::others(), Duration::ZERO);
        assert_eq!(amo.name(), "Encoded AMO");
        assert_eq!(others.name(), "Encoded Others");
    }

    /// Whether `formula` holds under `fixed` for some values of `hidden`.
    fn extends(formula: &Formula, nvar: u32, hidden: &[Var], fixed: &[(Var, bool)]) -> bool {
        (0..1u32 << hidden.len()).any(|bits| {
            let mut assignment = vec![false; nvar as usize + 1];
            for &(v, value) in fixed {
                assignment[v as usize] = value;
            }
            for (i, &v) in hidden.iter().enumerate() {
                assignment[v as usize] = bits >> i & 1 == 1;
            }
            formula.is_satisfied_by(&assignment)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn extraction_projects_out_eliminated_variables(
            n in 3u32..=6,
            extra in prop::collection::vec((1i32..=6, 1i32..=6), 0..3),
        ) {
            let mut clauses = sequential(n);
            let n_lit = i32::try_from(n).unwrap();
            for (a, b) in extra {
                clauses.push(vec![a.min(n_lit), -b.min(n_lit)]);
            }
            let nvar = 2 * n - 1;
            let original = Formula::from_clauses(clauses);
            let (engine, extractor) = run(original.clone());

            let eliminated: Vec<Var> = engine.stats().eliminated_variables.iter().copied().collect();
            let visible: Vec<Var> = (1..=nvar).filter(|v| !eliminated.contains(v)).collect();
            for bits in 0..1u32 << visible.len() {
                let fixed: Vec<(Var, bool)> = visible
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| (v, bits >> i & 1 == 1))
                    .collect();
                prop_assert_eq!(
                    extends(&original, nvar, &eliminated, &fixed),
                    extends(&extractor.formula, nvar, &[], &fixed)
                );
            }
        }
    }
}

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Direct at-most-one detection.
//!
//! A binary clause `(a | b)` forbids `-a` and `-b` from both being true, so it
//! is an edge between `-a` and `-b` in a conflict graph. A clique in that graph
//! is a set of literals of which at most one can be true, and the clauses on
//! its edges are exactly the pairwise encoding of that AMO constraint.
//!
//! Cliques are grown greedily from the smallest remaining edge. Every edge a
//! clique uses is removed from the graph so no clause is consumed twice.
//! Cliques of three or four literals are deferred: they are often part of a
//! larger encoded constraint that a later engine can recover, so they are
//! emitted only by [`DirectAmo::find_small_amos`] if their clauses survive.

use crate::extract::engine::{Deadline, EngineStats, ExtractionEngine};
use crate::extract::extractor::Extractor;
use crate::knf::formula::{ClauseId, Formula};
use crate::knf::klause::Klause;
use crate::knf::literal::{Lit, var_of};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Largest clique size that is deferred rather than emitted right away.
pub const SMALL_CLIQUE: usize = 4;

/// Edge key: the literal with the smaller variable first.
fn edge_key(a: Lit, b: Lit) -> (Lit, Lit) {
    if var_of(a) <= var_of(b) { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone)]
struct DeferredClique {
    clique: Vec<Lit>,
    clause_ids: Vec<ClauseId>,
}

/// Finds at-most-one constraints written pairwise as binary clauses.
#[derive(Debug, Clone)]
pub struct DirectAmo {
    edges: BTreeMap<Lit, BTreeSet<Lit>>,
    clause_ids: BTreeMap<(Lit, Lit), ClauseId>,
    deferred: Vec<DeferredClique>,
    stats: EngineStats,
}

impl DirectAmo {
    /// An engine with an empty conflict graph and the given budget.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            edges: BTreeMap::new(),
            clause_ids: BTreeMap::new(),
            deferred: Vec::new(),
            stats: EngineStats::new(timeout),
        }
    }

    fn remove_edge(&mut self, a: Lit, b: Lit) -> Option<ClauseId> {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(neighbors) = self.edges.get_mut(&from) {
                neighbors.remove(&to);
                if neighbors.is_empty() {
                    self.edges.remove(&from);
                }
            }
        }
        self.clause_ids.remove(&edge_key(a, b))
    }

    fn adjacent(&self, a: Lit, b: Lit) -> bool {
        self.edges.get(&a).is_some_and(|n| n.contains(&b))
    }

    /// Greedy clique containing `seed`, sorted by variable.
    fn expand_clique(&self, seed: Lit) -> Vec<Lit> {
        let mut clique = vec![seed];
        if let Some(neighbors) = self.edges.get(&seed) {
            for &candidate in neighbors {
                if clique.iter().all(|&member| self.adjacent(member, candidate)) {
                    clique.push(candidate);
                }
            }
        }
        clique.sort_by_key(|&l| (var_of(l), l));
        clique
    }

    /// Removes every edge of the clique and returns the clauses behind them.
    fn take_clique_clauses(&mut self, clique: &[Lit]) -> Vec<ClauseId> {
        let mut ids = Vec::with_capacity(clique.len() * (clique.len() - 1) / 2);
        for (i, &a) in clique.iter().enumerate() {
            for &b in &clique[i + 1..] {
                if let Some(id) = self.remove_edge(a, b) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    fn emit(&mut self, extractor: &mut Extractor, clique: &[Lit], clause_ids: &[ClauseId]) {
        trace!(size = clique.len(), "direct AMO");
        extractor.add_klause(Klause::at_most_one(clique.iter().copied()), clause_ids);
        self.stats.record_constraint(clique.len());
    }

    /// Emits the deferred cliques whose clauses are all still present.
    pub fn find_small_amos(&mut self, extractor: &mut Extractor) {
        let start = Instant::now();
        let deferred = std::mem::take(&mut self.deferred);
        let mut emitted = 0usize;
        for DeferredClique { clique, clause_ids } in deferred {
            if clause_ids.iter().any(|&id| extractor.formula.is_deleted(id)) {
                continue;
            }
            self.emit(extractor, &clique, &clause_ids);
            emitted += 1;
        }
        self.stats.extra_time += start.elapsed();
        debug!(emitted, "small direct AMOs");
    }

    /// Number of cliques waiting for [`Self::find_small_amos`].
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }
}

impl ExtractionEngine for DirectAmo {
    fn name(&self) -> &'static str {
        "Direct AMO"
    }

    fn init(&mut self, formula: &Formula) {
        self.edges.clear();
        self.clause_ids.clear();
        for (id, clause) in formula.live_clauses() {
            if clause.len() != 2 {
                continue;
            }
            let (a, b) = (-clause[0], -clause[1]);
            if var_of(a) == var_of(b) {
                continue;
            }
            self.clause_ids.entry(edge_key(a, b)).or_insert(id);
            self.edges.entry(a).or_default().insert(b);
            self.edges.entry(b).or_default().insert(a);
        }
        debug!(edges = self.clause_ids.len(), "direct AMO graph built");
    }

    fn run(&mut self, extractor: &mut Extractor) {
        let deadline = Deadline::start(self.stats.timeout);
        while let Some((&(seed, _), _)) = self.clause_ids.first_key_value() {
            if deadline.expired() {
                self.stats.reached_timeout = true;
                break;
            }

            let clique = self.expand_clique(seed);
            if clique.len() < 3 {
                self.remove_edge(clique[0], clique[1]);
                continue;
            }

            let clause_ids = self.take_clique_clauses(&clique);
            if clique.len() <= SMALL_CLIQUE {
                self.deferred.push(DeferredClique { clique, clause_ids });
            } else {
                self.emit(extractor, &clique, &clause_ids);
            }
        }
        self.stats.elapsed = deadline.elapsed();
        debug!(
            constraints = self.stats.constraints,
            deferred = self.deferred.len(),
            timeout = self.stats.reached_timeout,
            "direct AMO finished"
        );
    }

    fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

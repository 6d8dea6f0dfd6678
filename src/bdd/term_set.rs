#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Bucket elimination of encoding variables.
//!
//! Every clause of a cluster becomes a [`Term`]. Terms are filed into buckets
//! by the level of their root-most encoding variable (bucket 0 holds terms over
//! data variables only). Buckets are then swept from the top of the order
//! down, conjoining the terms of a bucket and quantifying its variable away,
//! until a single term over the data variables remains.
//!
//! Terms form an append-only log. Consuming a term deactivates it and adds its
//! node count to a dead-node estimate that drives garbage collection.

use crate::bdd::error::OracleError;
use crate::bdd::manager::{BddManager, FALSE, NodeId, TRUE};
use crate::knf::literal::{Lit, Var};
use tracing::{debug, trace};

/// Minimum estimated dead nodes before collecting.
const COLLECT_MIN: usize = 10_000;
/// Minimum fraction of dead to live nodes before collecting.
const COLLECT_FRACTION: f64 = 0.10;

/// Result of a successful bucket elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketOutcome {
    /// The single remaining function over the data variables.
    Reduced(NodeId),
    /// Some conjunction was unsatisfiable.
    ConstantFalse,
}

#[derive(Debug, Clone)]
struct Term {
    root: NodeId,
    active: bool,
    node_count: usize,
}

impl Term {
    /// Deactivates the term, returning its node count.
    const fn deactivate(&mut self) -> usize {
        self.active = false;
        let count = self.node_count;
        self.node_count = 0;
        count
    }
}

/// Counters for one analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermStats {
    /// Pairwise conjunctions of terms.
    pub conjunctions: usize,
    /// Existential quantifications of a bucket variable.
    pub quantifications: usize,
    /// Largest term seen, in nodes.
    pub max_bdd: usize,
    /// Garbage collections triggered.
    pub collections: usize,
}

/// The terms of one cluster and the manager they live in.
#[derive(Debug)]
pub struct TermSet {
    manager: BddManager,
    terms: Vec<Term>,
    ndata: usize,
    dead_count: usize,
    stats: TermStats,
}

impl TermSet {
    /// Creates an empty term set over `manager`, whose order covers all
    /// variables, the first `ndata` of which are data variables.
    #[must_use]
    pub const fn new(manager: BddManager, ndata: usize) -> Self {
        Self {
            manager,
            terms: Vec::new(),
            ndata,
            dead_count: 0,
            stats: TermStats {
                conjunctions: 0,
                quantifications: 0,
                max_bdd: 0,
                collections: 0,
            },
        }
    }

    /// The manager holding every term.
    #[must_use]
    pub const fn manager(&self) -> &BddManager {
        &self.manager
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> TermStats {
        self.stats
    }

    /// Largest BDD (in nodes) any term may reach.
    #[must_use]
    pub const fn size_limit(&self) -> usize {
        self.ndata * self.ndata
    }

    fn add(&mut self, root: NodeId) -> Result<usize, OracleError> {
        let node_count = self.manager.node_count(root);
        self.terms.push(Term {
            root,
            active: true,
            node_count,
        });
        self.stats.max_bdd = self.stats.max_bdd.max(node_count);
        let limit = self.size_limit();
        if node_count > limit {
            debug!(size = node_count, limit, "BDD size limit exceeded");
            return Err(OracleError::SizeExceeded {
                size: node_count,
                limit,
            });
        }
        Ok(self.terms.len() - 1)
    }

    fn root(&self, tid: usize) -> NodeId {
        debug_assert!(self.terms[tid].active, "term {tid} used after deactivation");
        self.terms[tid].root
    }

    /// Adds the BDD of a clause as a new term and returns its id.
    ///
    /// # Errors
    ///
    /// [`OracleError::SizeExceeded`] if the clause BDD is over the size limit.
    pub fn add_clause(&mut self, literals: &[Lit]) -> Result<usize, OracleError> {
        let root = self.manager.clause(literals);
        self.add(root)
    }

    fn check_gc(&mut self) {
        let total = self.manager.live_nodes();
        #[allow(clippy::cast_precision_loss)]
        let fraction = if total == 0 {
            0.0
        } else {
            self.dead_count as f64 / total as f64
        };
        if self.dead_count >= COLLECT_MIN && fraction >= COLLECT_FRACTION {
            let roots: Vec<NodeId> = self
                .terms
                .iter()
                .filter(|t| t.active)
                .map(|t| t.root)
                .collect();
            debug!(total, dead = self.dead_count, "initiating GC");
            self.manager.collect_garbage(&roots);
            self.dead_count = 0;
            self.stats.collections += 1;
        }
    }

    fn conjunct(&mut self, t1: usize, t2: usize) -> Result<usize, OracleError> {
        let (r1, r2) = (self.root(t1), self.root(t2));
        let root = self.manager.and(r1, r2);
        let tid = self.add(root)?;
        self.dead_count += self.terms[t1].deactivate();
        self.dead_count += self.terms[t2].deactivate();
        self.check_gc();
        self.stats.conjunctions += 1;
        Ok(tid)
    }

    fn quantify(&mut self, t: usize, var: Var) -> Result<usize, OracleError> {
        let source = self.root(t);
        let root = self.manager.exists(source, var);
        let tid = self.add(root)?;
        self.dead_count += self.terms[t].deactivate();
        self.check_gc();
        self.stats.quantifications += 1;
        Ok(tid)
    }

    /// Level of the root-most encoding variable of a term, 0 if it has none.
    fn bucket_level(&self, tid: usize) -> usize {
        let ndata = self.ndata;
        self.manager
            .support(self.root(tid))
            .into_iter()
            .find(|&v| v as usize > ndata)
            .map_or(0, |v| self.manager.level_of(v) as usize)
    }

    /// Eliminates all encoding variables.
    ///
    /// # Errors
    ///
    /// - [`OracleError::SizeExceeded`] if an intermediate term grows past [`Self::size_limit`].
    /// - [`OracleError::NotReducible`] if no single term over the data variables remains.
    pub fn bucket_reduce(&mut self) -> Result<BucketOutcome, OracleError> {
        let nvar = self.manager.num_vars();
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); nvar + 1];

        for tid in 0..self.terms.len() {
            let term = &self.terms[tid];
            if !term.active || term.root == TRUE {
                continue;
            }
            if term.root == FALSE {
                return Ok(BucketOutcome::ConstantFalse);
            }
            buckets[self.bucket_level(tid)].push(tid);
        }
        trace!(
            terms = buckets.iter().map(Vec::len).sum::<usize>(),
            buckets = buckets.iter().filter(|b| !b.is_empty()).count(),
            "terms placed"
        );

        // Level 0 is visited last.
        for blevel in (1..=nvar).chain(std::iter::once(0)) {
            if buckets[blevel].is_empty() {
                continue;
            }

            let mut next = 0;
            while next + 1 < buckets[blevel].len() {
                let (t1, t2) = (buckets[blevel][next], buckets[blevel][next + 1]);
                next += 2;
                let tid = self.conjunct(t1, t2)?;
                if self.root(tid) == FALSE {
                    trace!(blevel, t1, t2, "conjunction yields FALSE");
                    return Ok(BucketOutcome::ConstantFalse);
                }
                let level = self.bucket_level(tid);
                buckets[level].push(tid);
            }

            if next + 1 == buckets[blevel].len() {
                let last = buckets[blevel][next];
                if blevel == 0 {
                    let root = self.root(last);
                    debug!(
                        nodes = self.terms[last].node_count,
                        conjunctions = self.stats.conjunctions,
                        quantifications = self.stats.quantifications,
                        max_bdd = self.stats.max_bdd,
                        collections = self.stats.collections,
                        "bucket reduction finished"
                    );
                    return Ok(BucketOutcome::Reduced(root));
                }
                let order_level =
                    u32::try_from(blevel).expect("bucket level is a variable level");
                let var = self.manager.var_at(order_level);
                let tid = self.quantify(last, var)?;
                if self.root(tid) != TRUE {
                    let level = self.bucket_level(tid);
                    buckets[level].push(tid);
                }
            }
        }

        debug!("ran off the end of the buckets with no result");
        Err(OracleError::NotReducible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdd::analyze::DEFAULT_SEED;
    use crate::bdd::ordering::Ordering;

    fn term_set(order: &[Var], ndata: usize) -> TermSet {
        TermSet::new(BddManager::new(order), ndata)
    }

    #[test]
    fn test_commander_reduces_to_at_most_one() {
        // Data 1..=4, encoding 5 at the top of the order.
        let mut ts = term_set(&[5, 1, 2, 3, 4], 4);
        for clause in [
            vec![-1, -2],
            vec![-3, -4],
            vec![-1, 5],
            vec![-2, 5],
            vec![-3, -5],
            vec![-4, -5],
        ] {
            ts.add_clause(&clause).unwrap();
        }
        let BucketOutcome::Reduced(root) = ts.bucket_reduce().unwrap() else {
            panic!("expected a reduced function");
        };
        let bdd = ts.manager();
        assert_eq!(bdd.support(root), vec![1, 2, 3, 4]);
        for mask in 0u32..16 {
            let expected = mask.count_ones() <= 1;
            assert_eq!(bdd.evaluate(root, |v| mask & (1 << (v - 1)) != 0), expected);
        }
        assert_eq!(ts.stats().quantifications, 1);
    }

    #[test]
    fn test_contradiction_is_constant_false() {
        let mut ts = term_set(&[3, 1, 2], 2);
        ts.add_clause(&[1, 3]).unwrap();
        ts.add_clause(&[1, -3]).unwrap();
        ts.add_clause(&[-1]).unwrap();
        assert_eq!(ts.bucket_reduce(), Ok(BucketOutcome::ConstantFalse));
    }

    #[test]
    fn test_only_encoding_clauses_is_not_reducible() {
        // Quantifying the encoding variable leaves a tautology and bucket 0 stays empty.
        let mut ts = term_set(&[3, 1, 2], 2);
        ts.add_clause(&[1, 3]).unwrap();
        ts.add_clause(&[2, 3]).unwrap();
        assert_eq!(ts.bucket_reduce(), Err(OracleError::NotReducible));
    }

    #[test]
    fn test_long_sequential_counter_collects_garbage() {
        // Sequential counter over 1..=300 with auxiliaries 301..=599.
        let n: Lit = 300;
        let s = |i: Lit| n + i;
        let mut clauses = vec![vec![-1, s(1)]];
        for i in 2..n {
            clauses.push(vec![-i, s(i)]);
            clauses.push(vec![-s(i - 1), s(i)]);
            clauses.push(vec![-i, -s(i - 1)]);
        }
        clauses.push(vec![-n, -s(n - 1)]);

        let mut ordering = Ordering::new(599, 300);
        for clause in &clauses {
            ordering.add_clause(clause);
        }
        let mut ts = term_set(&ordering.generate_ordering(DEFAULT_SEED), 300);
        for clause in &clauses {
            ts.add_clause(clause).unwrap();
        }
        let BucketOutcome::Reduced(root) = ts.bucket_reduce().unwrap() else {
            panic!("expected a reduced function");
        };
        assert!(ts.stats().collections > 0);
        assert_eq!(ts.stats().quantifications, 299);

        let bdd = ts.manager();
        assert!(bdd.evaluate(root, |_| false));
        for single in [1, 150, 300] {
            assert!(bdd.evaluate(root, |v| v == single));
        }
        for (a, b) in [(1, 2), (1, 300), (17, 211)] {
            assert!(!bdd.evaluate(root, |v| v == a || v == b));
        }
        assert!(!bdd.evaluate(root, |_| true));
    }

    #[test]
    fn test_size_limit() {
        let mut ts = term_set(&[1, 2, 3], 1);
        assert_eq!(ts.size_limit(), 1);
        assert!(ts.add_clause(&[1]).is_ok());
        assert_eq!(
            ts.add_clause(&[1, 2]),
            Err(OracleError::SizeExceeded { size: 2, limit: 1 })
        );
    }
}

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Recognizes threshold functions in reduced BDDs.
//!
//! A function counting how many of `n` literals are true has a "staircase"
//! BDD: after reading `i` variables, the nodes reached form a layer indexed by
//! how many literals were true so far. Reading the next variable either keeps
//! that count (low or high child, depending on the literal's sign) or moves it
//! one step right. Each layer therefore has exactly one more entry than the
//! previous, and the high and low children of adjacent entries coincide.
//!
//! Walking the layers recovers the literals; a layer made only of terminals
//! contributes none. After `n` layers every entry is a terminal, and the true
//! entries must be a single contiguous range
//! `lower..=upper`: the function is "at least `lower`" and "at most `upper`".

use crate::bdd::error::OracleError;
use crate::bdd::manager::{BddManager, FALSE, NodeId, TRUE};
use crate::knf::klause::Klause;
use crate::knf::literal::{Lit, Var, lit_of};

/// A decoded threshold function: between `lower` and `upper` of `literals` are true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Threshold {
    /// The counted literals, in order of their layers.
    pub literals: Vec<Lit>,
    /// Fewest literals that may be true.
    pub lower: usize,
    /// Most literals that may be true.
    pub upper: usize,
}

impl Threshold {
    /// The klauses equivalent to this threshold, zero, one or two of them.
    ///
    /// The lower bound gives `at least lower of literals`; the upper bound
    /// gives `at least n - upper of the negated literals`. Trivial bounds are
    /// skipped.
    #[must_use]
    pub fn klauses(&self) -> Vec<Klause> {
        let n = self.literals.len();
        let mut klauses = Vec::with_capacity(2);
        if self.lower > 0 && self.lower < n {
            klauses.push(Klause::cardinality(
                self.literals.iter().copied(),
                bound(self.lower),
            ));
        }
        if self.upper > 0 && self.upper < n {
            klauses.push(Klause::cardinality(
                self.literals.iter().map(|&l| -l),
                bound(n - self.upper),
            ));
        }
        klauses
    }
}

fn bound(value: usize) -> u32 {
    u32::try_from(value).expect("bound is at most the number of data variables")
}

/// Decodes `root`, a function over the data variables `1..=ndata`.
///
/// Constant functions decode to the trivial bounds over all data variables:
/// `TRUE` is `0..=ndata` and `FALSE` is the empty range `ndata..=0`.
///
/// # Errors
///
/// [`OracleError::NotCardinality`] if the layers do not line up or the true
/// terminals are not contiguous.
pub fn cardinality_converter(
    manager: &BddManager,
    root: NodeId,
    ndata: usize,
) -> Result<Threshold, OracleError> {
    if BddManager::is_constant(root) {
        let literals = (1..=ndata)
            .map(|v| lit_of(Var::try_from(v).expect("data variable fits in Var"), true))
            .collect();
        let (lower, upper) = if root == TRUE { (0, ndata) } else { (ndata, 0) };
        return Ok(Threshold {
            literals,
            lower,
            upper,
        });
    }

    let mut layer = vec![root];
    let mut literals = Vec::with_capacity(ndata);
    for _ in 0..ndata {
        let mut var = None;
        let mut high = Vec::with_capacity(layer.len());
        let mut low = Vec::with_capacity(layer.len());
        for &node in &layer {
            match manager.top_var(node) {
                None => {
                    high.push(node);
                    low.push(node);
                }
                Some(v) => {
                    if var.is_some_and(|seen| seen != v) {
                        return Err(OracleError::NotCardinality);
                    }
                    var = Some(v);
                    high.push(manager.high(node));
                    low.push(manager.low(node));
                }
            }
        }
        let width = layer.len();
        // Negative literal: counting moves along the low edge.
        let negative = (0..width - 1).all(|i| high[i + 1] == low[i]);
        let positive = (0..width - 1).all(|i| high[i] == low[i + 1]);
        layer = if negative {
            literals.extend(var.map(|v| lit_of(v, false)));
            std::iter::once(high[0]).chain(low).collect()
        } else if positive {
            literals.extend(var.map(|v| lit_of(v, true)));
            std::iter::once(low[0]).chain(high).collect()
        } else {
            return Err(OracleError::NotCardinality);
        };
    }

    if layer.iter().any(|&node| !BddManager::is_constant(node)) {
        return Err(OracleError::NotCardinality);
    }
    let lower = layer
        .iter()
        .position(|&node| node == TRUE)
        .ok_or(OracleError::NotCardinality)?;
    let upper = layer
        .iter()
        .rposition(|&node| node == TRUE)
        .ok_or(OracleError::NotCardinality)?;
    if layer[lower..=upper].contains(&FALSE) {
        return Err(OracleError::NotCardinality);
    }

    Ok(Threshold {
        literals,
        lower,
        upper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds "between lo and hi of vars 1..=n are true" by dynamic programming.
    fn counting(bdd: &mut BddManager, n: usize, lo: usize, hi: usize) -> NodeId {
        // row[c] = function of the remaining variables given c trues so far
        let mut row: Vec<NodeId> = (0..=n)
            .map(|c| if (lo..=hi).contains(&c) { TRUE } else { FALSE })
            .collect();
        for v in (1..=n).rev() {
            let x = bdd.var(Var::try_from(v).unwrap());
            let not_x = bdd.clause(&[-i32::try_from(v).unwrap()]);
            let mut next = Vec::with_capacity(v);
            for c in 0..v {
                let hi_branch = bdd.and(x, row[c + 1]);
                let lo_branch = bdd.and(not_x, row[c]);
                next.push(bdd.or(hi_branch, lo_branch));
            }
            row = next;
        }
        row[0]
    }

    fn manager(n: Var) -> BddManager {
        BddManager::new(&(1..=n).collect::<Vec<_>>())
    }

    #[test]
    fn test_at_most_one_decodes_to_single_klause() {
        let mut bdd = manager(4);
        let f = counting(&mut bdd, 4, 0, 1);
        let threshold = cardinality_converter(&bdd, f, 4).unwrap();
        assert_eq!(threshold.literals, vec![-1, -2, -3, -4]);
        assert_eq!((threshold.lower, threshold.upper), (3, 4));
        let klauses = threshold.klauses();
        assert_eq!(klauses, vec![Klause::new([-1, -2, -3, -4], 3)]);
    }

    #[test]
    fn test_exactly_two_of_four_round_trips() {
        let mut bdd = manager(4);
        let f = counting(&mut bdd, 4, 2, 2);
        let threshold = cardinality_converter(&bdd, f, 4).unwrap();
        assert_eq!(threshold.lower, threshold.upper);
        assert_eq!(threshold.lower, 2);
        let klauses = threshold.klauses();
        assert_eq!(klauses.len(), 2);
        assert_eq!(klauses[0], Klause::new([-1, -2, -3, -4], 2));
        assert_eq!(klauses[1], Klause::new([1, 2, 3, 4], 2));
    }

    #[test]
    fn test_at_least_two_of_five() {
        let mut bdd = manager(5);
        let f = counting(&mut bdd, 5, 2, 5);
        let threshold = cardinality_converter(&bdd, f, 5).unwrap();
        // Counted over the negations: at most three false.
        assert_eq!(threshold.literals, vec![-1, -2, -3, -4, -5]);
        assert_eq!((threshold.lower, threshold.upper), (0, 3));
        assert_eq!(threshold.klauses(), vec![Klause::new([1, 2, 3, 4, 5], 2)]);
    }

    #[test]
    fn test_constants_are_trivial() {
        let bdd = manager(3);
        let t = cardinality_converter(&bdd, TRUE, 3).unwrap();
        assert_eq!((t.lower, t.upper), (0, 3));
        assert!(t.klauses().is_empty());
        let f = cardinality_converter(&bdd, FALSE, 3).unwrap();
        assert_eq!((f.lower, f.upper), (3, 0));
        assert!(f.klauses().is_empty());
    }

    #[test]
    fn test_parity_is_rejected() {
        // Odd parity over three variables: true at counts 1 and 3.
        let mut bdd = manager(3);
        let mut xor = TRUE;
        for clause in [[1, 2, 3], [1, -2, -3], [-1, 2, -3], [-1, -2, 3]] {
            let c = bdd.clause(&clause);
            xor = bdd.and(xor, c);
        }
        assert_eq!(
            cardinality_converter(&bdd, xor, 3),
            Err(OracleError::NotCardinality)
        );
    }

    #[test]
    fn test_equivalence_is_rejected() {
        // 1 <-> 2 is true at counts 0 and 2 only.
        let mut bdd = manager(2);
        let a = bdd.clause(&[-1, 2]);
        let b = bdd.clause(&[1, -2]);
        let eq = bdd.and(a, b);
        assert_eq!(
            cardinality_converter(&bdd, eq, 2),
            Err(OracleError::NotCardinality)
        );
    }

    #[test]
    fn test_missing_variable_is_rejected() {
        let mut bdd = manager(3);
        let f = bdd.clause(&[1, 2]);
        assert_eq!(
            cardinality_converter(&bdd, f, 3),
            Err(OracleError::NotCardinality)
        );
    }
}

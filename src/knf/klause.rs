#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Cardinality constraints ("klauses").
//!
//! A klause `k b l1 .. ln` holds when at least `b` of its literals are true.
//! An ordinary clause is the `b = 1` case. Klauses produced by extraction
//! always satisfy `1 <= b < n`: a bound of zero is trivially true and a bound
//! equal to the length is a conjunction of units, neither of which is worth
//! emitting.

use crate::knf::clause::Literals;
use crate::knf::literal::Lit;
use itertools::Itertools;
use std::fmt;

/// A cardinality constraint: at least `bound` of `literals` are true.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Klause {
    /// The literals the bound counts over. Stored by value, never by reference
    /// into the clause store.
    pub literals: Literals,
    /// Lower bound on the number of true literals.
    pub bound: u32,
}

impl Klause {
    /// Creates a klause without checking the bound.
    ///
    /// Used when loading existing `k` lines, which may carry any bound.
    pub fn new(literals: impl IntoIterator<Item = Lit>, bound: u32) -> Self {
        Self {
            literals: literals.into_iter().collect(),
            bound,
        }
    }

    /// Creates an extracted cardinality constraint.
    ///
    /// # Panics
    ///
    /// In debug builds, if the bound is outside `1..len`.
    pub fn cardinality(literals: impl IntoIterator<Item = Lit>, bound: u32) -> Self {
        let klause = Self::new(literals, bound);
        debug_assert!(
            klause.bound >= 1 && (klause.bound as usize) < klause.len(),
            "klause bound {} out of range for {} literals",
            klause.bound,
            klause.len()
        );
        klause
    }

    /// The at-most-one constraint over `literals`, written as
    /// "at least `n - 1` of the negations".
    ///
    /// # Panics
    ///
    /// In debug builds, if fewer than two literals are given.
    pub fn at_most_one(literals: impl IntoIterator<Item = Lit>) -> Self {
        let negated: Literals = literals.into_iter().map(|l| -l).collect();
        let bound =
            u32::try_from(negated.len().saturating_sub(1)).expect("literal count fits in u32");
        Self::cardinality(negated, bound)
    }

    /// Number of literals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Whether the klause has no literals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// `true` for the `bound = 1` case, which is written as a plain clause.
    #[must_use]
    pub const fn is_clause(&self) -> bool {
        self.bound == 1
    }

    /// Evaluates the klause under `value`, which answers whether a literal is true.
    pub fn is_satisfied_by(&self, value: impl Fn(Lit) -> bool) -> bool {
        let count = self.literals.iter().filter(|&&l| value(l)).count();
        count >= self.bound as usize
    }
}

impl fmt::Display for Klause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lits = self.literals.iter().join(" ");
        if self.is_clause() {
            write!(f, "{lits} 0")
        } else {
            write!(f, "k {} {lits} 0", self.bound)
        }
    }
}

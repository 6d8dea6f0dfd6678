#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The clause/klause store shared by every extraction engine.
//!
//! Clauses are addressed by their index in the store (`ClauseId`). Indices are
//! stable for the lifetime of the store: deleting a clause only sets its flag,
//! the slot is never reclaimed or reused. Extracted cardinality constraints
//! are appended to a separate klause list together with the deletion of the
//! clauses they replace.

use crate::knf::clause::Clause;
use crate::knf::klause::Klause;
use crate::knf::literal::{Lit, Var, var_of};
use std::fmt;

/// Stable index of a clause in a [`Formula`].
pub type ClauseId = usize;

/// A CNF formula being rewritten into KNF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formula {
    /// Number of variables, the larger of the declared count and the largest variable seen.
    pub num_vars: Var,
    /// All clauses ever added, including deleted ones.
    pub clauses: Vec<Clause>,
    /// Cardinality constraints, both loaded and extracted.
    pub klauses: Vec<Klause>,
}

impl Formula {
    /// Builds a formula from DIMACS-style literal lists.
    pub fn from_clauses<I, C>(clauses: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = Lit>,
    {
        let mut formula = Self::default();
        for clause in clauses {
            formula.add_clause(clause);
        }
        formula
    }

    /// Appends a clause and returns its id.
    pub fn add_clause(&mut self, literals: impl IntoIterator<Item = Lit>) -> ClauseId {
        let clause = Clause::new(literals);
        self.bump_vars(clause.literals.iter().copied());
        self.clauses.push(clause);
        self.clauses.len() - 1
    }

    fn bump_vars(&mut self, literals: impl Iterator<Item = Lit>) {
        for l in literals {
            self.num_vars = self.num_vars.max(var_of(l));
        }
    }

    /// The clause with id `id`, deleted or not.
    #[must_use]
    pub fn clause(&self, id: ClauseId) -> &Clause {
        &self.clauses[id]
    }

    /// Whether clause `id` was replaced.
    #[must_use]
    pub fn is_deleted(&self, id: ClauseId) -> bool {
        self.clauses[id].deleted
    }

    /// Marks clauses deleted. Already deleted ids are left as they are.
    pub fn mark_deleted(&mut self, ids: impl IntoIterator<Item = ClauseId>) {
        for id in ids {
            self.clauses[id].delete();
        }
    }

    /// Records an extracted klause and deletes the clauses it replaces.
    pub fn add_klause(&mut self, klause: Klause, consumed: &[ClauseId]) {
        self.bump_vars(klause.literals.iter().copied());
        self.klauses.push(klause);
        self.mark_deleted(consumed.iter().copied());
    }

    /// Non-deleted clauses with their ids, in id order.
    pub fn live_clauses(&self) -> impl Iterator<Item = (ClauseId, &Clause)> {
        self.clauses.iter().enumerate().filter(|(_, c)| !c.deleted)
    }

    /// Clauses not yet replaced.
    #[must_use]
    pub fn kept_clause_count(&self) -> usize {
        self.clauses.iter().filter(|c| !c.deleted).count()
    }

    /// Clauses replaced by klauses.
    #[must_use]
    pub fn deleted_clause_count(&self) -> usize {
        self.clauses.len() - self.kept_clause_count()
    }

    /// Evaluates every kept clause and every klause under a total assignment.
    ///
    /// `assignment[v]` is the value of variable `v`; index 0 is unused.
    #[must_use]
    pub fn is_satisfied_by(&self, assignment: &[bool]) -> bool {
        let value = |l: Lit| assignment[var_of(l) as usize] == (l > 0);
        self.live_clauses().all(|(_, c)| c.is_satisfied_by(value))
            && self.klauses.iter().all(|k| k.is_satisfied_by(value))
    }
}

/// Writes the formula in KNF: header, klause lines, then the kept clauses.
impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "p knf {} {}",
            self.num_vars,
            self.kept_clause_count() + self.klauses.len()
        )?;
        for klause in &self.klauses {
            writeln!(f, "{klause}")?;
        }
        for (_, clause) in self.live_clauses() {
            for lit in clause.iter() {
                write!(f, "{lit} ")?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable_across_deletion() {
        let mut f = Formula::from_clauses([vec![1, 2], vec![-1, 3], vec![2, 3]]);
        f.mark_deleted([1]);
        let id = f.add_clause([4]);
        assert_eq!(id, 3);
        assert!(f.is_deleted(1));
        assert_eq!(f.clause(2).literals.as_slice(), &[2, 3]);
        assert_eq!(f.num_vars, 4);
    }

    #[test]
    fn test_mark_deleted_is_idempotent() {
        let mut f = Formula::from_clauses([vec![1, 2], vec![-1, 3]]);
        f.mark_deleted([0, 0]);
        f.mark_deleted([0]);
        assert_eq!(f.kept_clause_count(), 1);
        assert_eq!(f.deleted_clause_count(), 1);
    }

    #[test]
    fn test_add_klause_consumes_clauses() {
        let mut f = Formula::from_clauses([vec![-1, -2], vec![-1, -3], vec![-2, -3], vec![4, 5]]);
        f.add_klause(Klause::at_most_one([1, 2, 3]), &[0, 1, 2]);
        assert_eq!(f.klauses.len(), 1);
        assert_eq!(f.live_clauses().map(|(id, _)| id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_knf_output() {
        let mut f = Formula::from_clauses([vec![-1, -2], vec![-1, -3], vec![-2, -3], vec![1, 4]]);
        f.add_klause(Klause::at_most_one([1, 2, 3]), &[0, 1, 2]);
        assert_eq!(f.to_string(), "p knf 4 2\nk 2 -1 -2 -3 0\n1 4 0\n");
    }

    #[test]
    fn test_satisfaction_includes_klauses() {
        let mut f = Formula::from_clauses([vec![1, 2, 3]]);
        f.add_klause(Klause::at_most_one([1, 2, 3]), &[]);
        assert!(f.is_satisfied_by(&[false, true, false, false]));
        assert!(!f.is_satisfied_by(&[false, true, true, false]));
        assert!(!f.is_satisfied_by(&[false, false, false, false]));
    }
}

//! The KNF data model: literals, clauses, cardinality constraints and the
//! clause store, plus DIMACS reading.

/// A single disjunctive clause with a deletion flag.
pub mod clause;

/// DIMACS CNF/KNF parsing.
pub mod dimacs;

/// Input errors.
pub mod error;

/// The clause/klause store.
pub mod formula;

/// Cardinality constraints.
pub mod klause;

/// Signed DIMACS literals and helpers.
pub mod literal;

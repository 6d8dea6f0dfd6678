#![deny(missing_docs)]
//! Extraction of cardinality constraints from CNF formulas.
//!
//! A CNF formula often contains at-most-one and other cardinality constraints
//! written out as clauses, either pairwise or through auxiliary encoding
//! variables. This crate recovers them and rewrites the formula in KNF, where
//! each recovered constraint is a single `k <bound> <lits> 0` line.

/// BDD-based analysis that decides whether a cluster of clauses is a cardinality constraint.
pub mod bdd;

/// Extraction engines and the pipeline that runs them.
pub mod extract;

/// Clauses, klauses, and the DIMACS/KNF formats.
pub mod knf;

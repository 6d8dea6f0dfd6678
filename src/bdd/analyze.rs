//! Entry point of the BDD analysis of a normalized cluster.

use crate::bdd::decoder::cardinality_converter;
use crate::bdd::error::OracleError;
use crate::bdd::manager::{BddManager, FALSE};
use crate::bdd::ordering::Ordering;
use crate::bdd::term_set::{BucketOutcome, TermSet};
use crate::knf::klause::Klause;
use crate::knf::literal::Lit;
use tracing::{debug, trace};

/// Seed used for the ordering heuristic unless configured otherwise.
pub const DEFAULT_SEED: u64 = 123_456;

/// Decides whether `clauses`, with the encoding variables quantified away, is
/// a cardinality constraint over the data variables, and returns its klauses.
///
/// Variables must be numbered densely: data variables `1..=ndata`, encoding
/// variables `ndata+1..=nvar`. Returned klauses use the same numbering. An
/// empty result means the projection is constant.
///
/// # Errors
///
/// Any [`OracleError`]; the caller should discard the candidate.
pub fn bdd_analyze(
    nvar: usize,
    ndata: usize,
    clauses: &[Vec<Lit>],
    seed: u64,
) -> Result<Vec<Klause>, OracleError> {
    let mut ordering = Ordering::new(nvar, ndata);
    for clause in clauses {
        ordering.add_clause(clause);
    }
    let order = ordering.generate_ordering(seed);
    trace!(?order, "variable order");

    let mut terms = TermSet::new(BddManager::new(&order), ndata);
    for clause in clauses {
        terms.add_clause(clause)?;
    }

    let root = match terms.bucket_reduce()? {
        BucketOutcome::Reduced(root) => root,
        BucketOutcome::ConstantFalse => FALSE,
    };
    let threshold = cardinality_converter(terms.manager(), root, ndata)?;
    let stats = terms.stats();
    debug!(
        nvar,
        ndata,
        lower = threshold.lower,
        upper = threshold.upper,
        conjunctions = stats.conjunctions,
        quantifications = stats.quantifications,
        max_bdd = stats.max_bdd,
        produced = terms.manager().produced(),
        "cardinality analysis"
    );
    Ok(threshold.klauses())
}

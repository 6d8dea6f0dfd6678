//! BDD-based validation of candidate clusters.
//!
//! [`analyze::bdd_analyze`] orders the variables of a cluster, eliminates the
//! encoding variables by bucket elimination, and decodes the remaining
//! function as a threshold over the data variables.

/// Analysis entry point.
pub mod analyze;

/// Threshold function decoding.
pub mod decoder;

/// Soft failures of the analysis.
pub mod error;

/// The BDD kernel.
pub mod manager;

/// Variable ordering heuristic.
pub mod ordering;

/// Bucket elimination over clause terms.
pub mod term_set;

pub use analyze::{DEFAULT_SEED, bdd_analyze};
pub use error::OracleError;

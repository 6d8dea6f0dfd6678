use thiserror::Error;

/// Reasons the BDD analysis gives up on a candidate cluster.
///
/// All of these are soft failures: the caller discards the candidate and
/// leaves the formula untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// A term grew past the size limit.
    #[error("BDD size {size} exceeds limit {limit}")]
    SizeExceeded {
        /// Nodes in the offending term.
        size: usize,
        /// The limit in force.
        limit: usize,
    },

    /// Some encoding variable survived elimination.
    #[error("bucket elimination did not reduce to a single data-only term")]
    NotReducible,

    /// The projection is not a threshold function.
    #[error("reduced function is not a cardinality constraint")]
    NotCardinality,
}

use thiserror::Error;

/// Errors raised while reading DIMACS CNF/KNF input.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The reader failed.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// A `p` line that is not `p cnf <vars> <clauses>` or `p knf ..`.
    #[error("line {line}: malformed problem line `{text}`")]
    Header {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A token that is not an integer.
    #[error("line {line}: invalid literal `{token}`")]
    Literal {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// A `k` line with nothing after the `k`.
    #[error("line {line}: klause line without a bound")]
    MissingBound {
        /// 1-based line number.
        line: usize,
    },
}

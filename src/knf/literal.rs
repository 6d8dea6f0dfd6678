#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Signed DIMACS literals.
//!
//! Literals are kept in their DIMACS form throughout the crate: a non-zero
//! `i32` whose absolute value is the variable and whose sign is the polarity.
//! Keeping the raw form means literals move between the clause store, the
//! extractors and the BDD analysis without any conversion.

/// A signed, non-zero DIMACS literal.
pub type Lit = i32;

/// A variable index, always `>= 1`.
pub type Var = u32;

/// Returns the variable of a literal.
///
/// # Examples
///
/// ```
/// use knf_extract::knf::literal::var_of;
///
/// assert_eq!(var_of(-7), 7);
/// assert_eq!(var_of(3), 3);
/// ```
#[must_use]
pub const fn var_of(lit: Lit) -> Var {
    lit.unsigned_abs()
}

/// Builds a literal from a variable and a polarity.
///
/// # Panics
///
/// If `var` does not fit into an `i32`.
#[must_use]
pub fn lit_of(var: Var, positive: bool) -> Lit {
    let v = i32::try_from(var).unwrap_or_else(|_| panic!("variable {var} out of literal range"));
    if positive { v } else { -v }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_of() {
        assert_eq!(var_of(-12), 12);
        assert_eq!(var_of(12), 12);
    }

    #[test]
    fn test_lit_of() {
        assert_eq!(lit_of(5, true), 5);
        assert_eq!(lit_of(5, false), -5);
        assert_eq!(var_of(lit_of(9, false)), 9);
    }
}

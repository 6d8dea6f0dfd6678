use crate::knf::literal::{Lit, Var, var_of};
use core::ops::Index;
use smallvec::SmallVec;

/// Inline capacity for clause literals. Most clauses the extractors touch are binary.
pub const INLINE_LITERALS: usize = 8;

/// Literal storage shared by clauses and klauses.
pub type Literals = SmallVec<[Lit; INLINE_LITERALS]>;

/// A disjunction of literals in the clause store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Clause {
    /// The literals, in input order.
    pub literals: Literals,
    /// Replaced by a klause; kept so clause ids stay stable.
    pub deleted: bool,
}

impl Clause {
    /// A live clause over `literals`.
    pub fn new(literals: impl IntoIterator<Item = Lit>) -> Self {
        Self {
            literals: literals.into_iter().collect(),
            deleted: false,
        }
    }

    /// Number of literals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Whether the clause has no literals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Iterates over the literals.
    pub fn iter(&self) -> impl Iterator<Item = &Lit> {
        self.literals.iter()
    }

    /// The variable of each literal, in order.
    pub fn variables(&self) -> impl Iterator<Item = Var> + '_ {
        self.literals.iter().map(|&l| var_of(l))
    }

    /// Whether the clause was replaced.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Marks the clause replaced.
    pub const fn delete(&mut self) {
        self.deleted = true;
    }

    /// Evaluates the clause under `value`, which answers whether a literal is true.
    pub fn is_satisfied_by(&self, value: impl Fn(Lit) -> bool) -> bool {
        self.literals.iter().any(|&l| value(l))
    }
}

impl Index<usize> for Clause {
    type Output = Lit;

    fn index(&self, index: usize) -> &Self::Output {
        &self.literals[index]
    }
}

impl From<Vec<Lit>> for Clause {
    fn from(literals: Vec<Lit>) -> Self {
        Self::new(literals)
    }
}

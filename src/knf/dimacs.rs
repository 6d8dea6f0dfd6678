#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! A reader for DIMACS CNF and KNF text.
//!
//! The accepted input is a superset of plain DIMACS CNF:
//! - Comment lines start with `c`.
//! - The problem line is `p cnf <vars> <clauses>` or `p knf <vars> <constraints>`.
//!   The declared variable count is a lower bound; the constraint count is not checked.
//! - Klause lines are `k <bound> <lits> 0` and load as existing cardinality constraints.
//! - Proof-style `d` (deletion) lines are skipped.
//! - A `%` line ends the data, as in the SATLIB benchmark files.
//! - Every other token is a clause literal. Each `0` ends a clause, so a line
//!   may hold several clauses and a clause may span lines. Literals left
//!   without a terminating `0` at the end of the input form a last clause.

use crate::knf::error::ParseError;
use crate::knf::formula::Formula;
use crate::knf::klause::Klause;
use crate::knf::literal::{Lit, Var};
use itertools::Itertools;
use std::io::{self, BufRead};
use std::path::Path;

/// Parses DIMACS CNF/KNF data from a `BufRead` source into a [`Formula`].
///
/// # Errors
///
/// - [`ParseError::Io`] if a line cannot be read.
/// - [`ParseError::Header`] if the problem line is not `p cnf|knf <vars> <count>`.
/// - [`ParseError::Literal`] if a token that should be a literal is not an integer.
/// - [`ParseError::MissingBound`] if a `k` line has no bound.
pub fn parse_dimacs<R: BufRead>(reader: R) -> Result<Formula, ParseError> {
    let mut formula = Formula::default();
    let mut declared_vars: Var = 0;
    let mut pending: Vec<Lit> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let mut parts = line.split_whitespace().peekable();

        match parts.peek() {
            Some(&"%") => break,
            None | Some(&"c" | &"d") => {}
            Some(&"p") => declared_vars = parse_header(&line, number)?,
            Some(&"k") => {
                parts.next();
                let bound = parts
                    .next()
                    .ok_or(ParseError::MissingBound { line: number })
                    .and_then(|token| {
                        token.parse::<u32>().map_err(|_| ParseError::Literal {
                            line: number,
                            token: token.to_string(),
                        })
                    })?;
                let literals = parse_literals(parts, number)?;
                let end = literals.iter().position(|&l| l == 0).unwrap_or(literals.len());
                formula.klauses.push(Klause::new(literals[..end].iter().copied(), bound));
            }
            Some(_) => {
                for lit in parse_literals(parts, number)? {
                    if lit != 0 {
                        pending.push(lit);
                    } else if !pending.is_empty() {
                        formula.add_clause(pending.drain(..));
                    }
                }
            }
        }
    }
    if !pending.is_empty() {
        formula.add_clause(pending);
    }

    let seen = formula
        .klauses
        .iter()
        .flat_map(|k| k.literals.iter())
        .map(|l| l.unsigned_abs())
        .max()
        .unwrap_or(0);
    formula.num_vars = formula.num_vars.max(declared_vars).max(seen);
    Ok(formula)
}

fn parse_header(line: &str, number: usize) -> Result<Var, ParseError> {
    let malformed = || ParseError::Header {
        line: number,
        text: line.to_string(),
    };
    let fields = line.split_whitespace().collect_vec();
    match fields.as_slice() {
        ["p", "cnf" | "knf", vars, count] => {
            count.parse::<usize>().map_err(|_| malformed())?;
            vars.parse::<Var>().map_err(|_| malformed())
        }
        _ => Err(malformed()),
    }
}

/// Parses every token of a line, `0` terminators included.
fn parse_literals<'a>(
    tokens: impl Iterator<Item = &'a str>,
    number: usize,
) -> Result<Vec<Lit>, ParseError> {
    tokens
        .map(|token| {
            token.parse::<Lit>().map_err(|_| ParseError::Literal {
                line: number,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Parses a DIMACS file.
///
/// # Errors
///
/// If the file cannot be opened, or any error from [`parse_dimacs`].
pub fn parse_file(path: &Path) -> Result<Formula, ParseError> {
    let file = std::fs::File::open(path)?;
    parse_dimacs(io::BufReader::new(file))
}

/// Parses DIMACS text held in memory.
///
/// # Errors
///
/// Any error from [`parse_dimacs`].
pub fn parse_str(text: &str) -> Result<Formula, ParseError> {
    parse_dimacs(text.as_bytes())
}

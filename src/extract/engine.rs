#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The lifecycle shared by extraction engines, and their statistics.

use crate::extract::extractor::Extractor;
use crate::knf::formula::Formula;
use crate::knf::literal::Var;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, Instant};

/// Per-engine counters reported after the pipeline finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Cardinality constraints this engine committed.
    pub constraints: usize,
    /// Histogram of committed constraint sizes.
    pub constraint_sizes: BTreeMap<usize, usize>,
    /// Time spent in the main run.
    pub elapsed: Duration,
    /// Time spent in follow-up passes (deferred small cliques).
    pub extra_time: Duration,
    /// The budget ran out before the candidates did.
    pub reached_timeout: bool,
    /// The budget of the main run.
    pub timeout: Duration,
    /// Encoding variables whose clusters were replaced.
    pub eliminated_variables: BTreeSet<Var>,
}

impl EngineStats {
    /// Empty counters for an engine with the given budget.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Counts a committed constraint over `size` problem variables.
    pub fn record_constraint(&mut self, size: usize) {
        self.constraints += 1;
        *self.constraint_sizes.entry(size).or_insert(0) += 1;
    }

    /// Wall-clock seconds including follow-up passes.
    #[must_use]
    pub fn seconds(&self) -> f64 {
        (self.elapsed + self.extra_time).as_secs_f64()
    }

    /// The size histogram as `size:count` pairs in increasing size.
    #[must_use]
    pub fn sizes_line(&self) -> String {
        self.constraint_sizes
            .iter()
            .map(|(size, count)| format!("{size}:{count}"))
            .join(" ")
    }
}

/// Cooperative deadline checked once per outer iteration.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    /// Starts the clock.
    #[must_use]
    pub fn start(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// Whether the budget is used up.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.start.elapsed() >= self.budget
    }

    /// Time since [`Self::start`].
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// An extraction engine.
///
/// Engines are created with their configuration, prepared against the
/// current formula with [`init`](Self::init), and then [`run`](Self::run)
/// once, committing constraints through the [`Extractor`].
pub trait ExtractionEngine {
    /// Short name used in logs and statistics.
    fn name(&self) -> &'static str;

    /// Builds the engine's indices from the formula as it is now.
    fn init(&mut self, formula: &Formula);

    /// Searches for constraints until the candidate space or the time budget runs out.
    fn run(&mut self, extractor: &mut Extractor);

    /// Counters collected so far.
    fn stats(&self) -> &EngineStats;

    /// Writes the engine's statistics as DIMACS comment lines.
    ///
    /// # Errors
    ///
    /// If writing to `out` fails.
    fn write_stats(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let stats = self.stats();
        let name = self.name();
        writeln!(out, "c {name} constraints: {}", stats.constraints)?;
        if stats.constraints > 0 {
            writeln!(out, "c {name} sizes: {}", stats.sizes_line())?;
        }
        if !stats.eliminated_variables.is_empty() {
            writeln!(
                out,
                "c {name} variables eliminated: {}",
                stats.eliminated_variables.len()
            )?;
            writeln!(
                out,
                "c {name} eliminated variable IDs: {}",
                stats.eliminated_variables.iter().join(" ")
            )?;
        }
        writeln!(out, "c {name} seconds: {:.3}", stats.seconds())?;
        if stats.reached_timeout {
            writeln!(
                out,
                "c {name} reached timeout: {}",
                stats.timeout.as_secs_f64()
            )?;
        }
        Ok(())
    }
}

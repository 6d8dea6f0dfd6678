//! Cardinality constraint extraction.
//!
//! [`extract`] runs the configured engines over a formula in a fixed order:
//! direct AMO detection, encoded AMO detection, the deferred small direct
//! cliques, and finally the generalized encoded pass. Every engine commits
//! through the same [`extractor::Extractor`], so later engines only see the
//! clauses earlier ones left behind.

/// Pipeline settings.
pub mod config;

/// Pairwise AMO detection on the binary-clause conflict graph.
pub mod direct_amo;

/// Detection of constraints encoded with auxiliary variables.
pub mod encoded_amo;

/// The engine lifecycle and per-engine counters.
pub mod engine;

/// Cluster validation and commitment.
pub mod extractor;

/// The final statistics block.
pub mod stats;

use crate::knf::formula::Formula;
use config::ExtractorConfig;
use direct_amo::DirectAmo;
use encoded_amo::EncodedAmo;
use engine::ExtractionEngine;
use extractor::Extractor;
use stats::ExtractionReport;
use std::time::Instant;
use tracing::info;

/// Runs the enabled engines and returns the reduced formula with its report.
#[must_use]
pub fn extract(formula: Formula, config: &ExtractorConfig) -> (Formula, ExtractionReport) {
    let start = Instant::now();
    let mut extractor = Extractor::new(formula, config.seed);
    let mut report = ExtractionReport::default();

    let mut direct = config.direct_amo.then(|| DirectAmo::new(config.direct_timeout));
    if let Some(engine) = direct.as_mut() {
        run_engine(engine, &mut extractor);
    }

    if config.encoded_amo {
        let mut engine = EncodedAmo::new(config.encoded, config.encoded_timeout);
        run_engine(&mut engine, &mut extractor);
        report.encoded = Some(engine);
    }

    if config.direct_amo_small {
        if let Some(engine) = direct.as_mut() {
            engine.find_small_amos(&mut extractor);
        }
    }
    report.direct = direct;

    if config.encoded_others {
        let mut engine = EncodedAmo::new(config.others, config.encoded_timeout);
        run_engine(&mut engine, &mut extractor);
        report.others = Some(engine);
    }

    report.clausal_constraints = extractor.formula.kept_clause_count();
    report.bdd_successes = extractor.bdd_successes;
    report.bdd_failures = extractor.bdd_failures;
    report.elapsed = start.elapsed();
    info!(
        constraints = report.total_constraints(),
        clauses = report.clausal_constraints,
        seconds = report.elapsed.as_secs_f64(),
        "extraction finished"
    );
    (extractor.into_formula(), report)
}

fn run_engine(engine: &mut impl ExtractionEngine, extractor: &mut Extractor) {
    info!(engine = engine.name(), "starting");
    engine.init(&extractor.formula);
    engine.run(extractor);
    info!(
        engine = engine.name(),
        constraints = engine.stats().constraints,
        "done"
    );
}

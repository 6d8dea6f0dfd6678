#![allow(clippy::cast_precision_loss)]

use anyhow::{Context, Result, anyhow, ensure};
use clap::{ArgAction, Args, Parser, Subcommand};
use knf_extract::bdd::DEFAULT_SEED;
use knf_extract::extract::config::ExtractorConfig;
use knf_extract::extract::extract;
use knf_extract::extract::stats::ExtractionReport;
use knf_extract::knf::dimacs::{parse_file, parse_str};
use knf_extract::knf::formula::Formula;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tikv_jemalloc_ctl::{epoch, stats};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Defines the command-line interface for the extractor.
///
/// Uses `clap` for parsing arguments.
#[derive(Parser, Debug)]
#[command(
    name = "knf-extract",
    version,
    about = "Extracts cardinality constraints from CNF formulas and writes KNF"
)]
pub(crate) struct Cli {
    /// Path to a DIMACS file. Used when no subcommand is given.
    pub path: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub common: CommonOptions,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Extract from a DIMACS CNF file.
    File {
        /// Path to the DIMACS .cnf file.
        #[arg(long)]
        path: PathBuf,
    },

    /// Extract from a formula given as plain text (e.g. "-1 -2 0\n-1 -3 0").
    Text {
        #[arg(short, long, allow_hyphen_values = true)]
        input: String,
    },

    /// Extract from every .cnf file under a directory, writing `<file>.knf` next to each.
    Batch {
        #[arg(long)]
        dir: PathBuf,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Options shared by every extraction command.
///
/// All of them are global, so they are accepted before or after the subcommand.
#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CommonOptions {
    /// Log verbosity on stderr: -v info, -vv debug, -vvv trace.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    /// Do not print the `c` statistics block.
    #[arg(long, default_value_t = false, global = true)]
    pub(crate) no_stats: bool,

    /// Do not write the KNF formula.
    #[arg(long, default_value_t = false, global = true)]
    pub(crate) no_write_knf: bool,

    /// Write the KNF formula to this file instead of stdout.
    #[arg(short, long, global = true)]
    pub(crate) output: Option<PathBuf>,

    /// Time budget of the direct AMO engine, in seconds.
    #[arg(long, default_value_t = 1000.0, global = true)]
    direct_timeout: f64,

    /// Time budget of each encoded engine, in seconds.
    #[arg(long, default_value_t = 1000.0, global = true)]
    encoded_timeout: f64,

    /// Skip direct AMO detection.
    #[arg(long, default_value_t = false, global = true)]
    no_direct_amo: bool,

    /// Drop the deferred three and four literal direct cliques.
    #[arg(long, default_value_t = false, global = true)]
    no_direct_amo_small: bool,

    /// Skip encoded AMO detection.
    #[arg(long, default_value_t = false, global = true)]
    no_encoded_amo: bool,

    /// Run the generalized encoded pass over clauses of up to three literals.
    #[arg(long, default_value_t = false, global = true)]
    encoded_others: bool,

    /// Seed of the BDD variable-ordering heuristic.
    #[arg(long, default_value_t = DEFAULT_SEED, global = true)]
    seed: u64,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            verbose: 0,
            no_stats: false,
            no_write_knf: false,
            output: None,
            direct_timeout: 1000.0,
            encoded_timeout: 1000.0,
            no_direct_amo: false,
            no_direct_amo_small: false,
            no_encoded_amo: false,
            encoded_others: false,
            seed: DEFAULT_SEED,
        }
    }
}

impl CommonOptions {
    /// Converts the options into the pipeline configuration.
    ///
    /// # Errors
    ///
    /// If a timeout is negative or not finite.
    pub(crate) fn to_config(&self) -> Result<ExtractorConfig> {
        let timeout = |secs: f64, name: &str| {
            Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid {name} timeout: {secs}"))
        };
        Ok(ExtractorConfig {
            direct_amo: !self.no_direct_amo,
            direct_amo_small: !self.no_direct_amo_small,
            encoded_amo: !self.no_encoded_amo,
            encoded_others: self.encoded_others,
            write_knf: !self.no_write_knf,
            direct_timeout: timeout(self.direct_timeout, "direct")?,
            encoded_timeout: timeout(self.encoded_timeout, "encoded")?,
            seed: self.seed,
            ..ExtractorConfig::default()
        })
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v` when set.
pub(crate) fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Parses, extracts, and reports a single DIMACS file.
///
/// # Errors
///
/// If the file cannot be parsed or the output cannot be written.
pub(crate) fn extract_file(path: &Path, common: &CommonOptions) -> Result<()> {
    let time = Instant::now();
    let formula =
        parse_file(path).with_context(|| format!("failed to parse {}", path.display()))?;
    let parse_time = time.elapsed();
    info!(path = %path.display(), clauses = formula.clauses.len(), "parsed");

    extract_and_report(formula, common, common.output.as_deref(), parse_time)
}

/// Extracts from a formula given inline.
///
/// # Errors
///
/// If the text is not valid DIMACS or the output cannot be written.
pub(crate) fn extract_text(input: &str, common: &CommonOptions) -> Result<()> {
    let time = Instant::now();
    let formula = parse_str(input).context("failed to parse text input")?;
    let parse_time = time.elapsed();

    extract_and_report(formula, common, common.output.as_deref(), parse_time)
}

/// Extracts from every `.cnf` file under `dir`.
///
/// Each result is written to the file's path with `.knf` appended.
///
/// # Errors
///
/// If `dir` is not a directory, or a file cannot be parsed or written.
pub(crate) fn extract_dir(dir: &Path, common: &CommonOptions) -> Result<()> {
    ensure!(dir.is_dir(), "not a directory: {}", dir.display());

    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let file_path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if file_path.extension().is_none_or(|ext| ext != "cnf") {
            warn!(path = %file_path.display(), "skipping non-CNF file");
            continue;
        }

        let time = Instant::now();
        let formula = parse_file(file_path)
            .with_context(|| format!("failed to parse {}", file_path.display()))?;
        let parse_time = time.elapsed();

        let output = PathBuf::from(format!("{}.knf", file_path.display()));
        if !common.no_stats {
            println!("c File: {}", file_path.display());
        }
        extract_and_report(formula, common, Some(&output), parse_time)?;
    }
    Ok(())
}

/// Runs the pipeline, writes the formula, and prints statistics.
///
/// `output` of `None` writes the formula to stdout.
fn extract_and_report(
    formula: Formula,
    common: &CommonOptions,
    output: Option<&Path>,
    parse_time: Duration,
) -> Result<()> {
    let config = common.to_config()?;
    let variables = formula.num_vars;
    let clauses = formula.clauses.len();

    let (reduced, report) = extract(formula, &config);

    if config.write_knf {
        write_knf(&reduced, output)?;
    }

    if !common.no_stats {
        print!("{report}");
        let (allocated, resident) = memory_mib()?;
        let removed = reduced.deleted_clause_count();
        print_stats(parse_time, variables, clauses, removed, &report, allocated, resident);
    }
    Ok(())
}

fn write_knf(formula: &Formula, output: Option<&Path>) -> Result<()> {
    let text = formula.to_string();
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("unable to write {}", path.display()))?,
        None => io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("unable to write to stdout")?,
    }
    Ok(())
}

/// Allocated and resident memory in MiB, as reported by jemalloc.
fn memory_mib() -> Result<(f64, f64)> {
    epoch::advance().map_err(|e| anyhow!("jemalloc epoch: {e}"))?;
    let allocated = stats::allocated::mib()
        .and_then(|mib| mib.read())
        .map_err(|e| anyhow!("jemalloc stats: {e}"))?;
    let resident = stats::resident::mib()
        .and_then(|mib| mib.read())
        .map_err(|e| anyhow!("jemalloc stats: {e}"))?;
    Ok((
        allocated as f64 / (1024.0 * 1024.0),
        resident as f64 / (1024.0 * 1024.0),
    ))
}

/// Prints one row of the statistics table as a DIMACS comment.
pub(crate) fn stat_line(label: &str, value: impl std::fmt::Display) {
    println!("c |  {label:<28} {value:>18}  |");
}

fn print_stats(
    parse_time: Duration,
    variables: u32,
    clauses: usize,
    removed: usize,
    report: &ExtractionReport,
    allocated: f64,
    resident: f64,
) {
    println!("c =======================[ Problem Statistics ]=========================");
    stat_line("Parse time (s)", format!("{:.3}", parse_time.as_secs_f64()));
    stat_line("Variables", variables);
    stat_line("Clauses (original)", clauses);
    println!("c ======================[ Extraction Statistics ]=======================");
    stat_line("Clauses (kept)", report.clausal_constraints);
    stat_line("Clauses (removed)", removed);
    stat_line("Klauses extracted", report.total_constraints());
    stat_line("Variables eliminated", report.eliminated_variables().len());
    stat_line("Memory usage (MiB)", format!("{allocated:.2}"));
    stat_line("Resident memory (MiB)", format!("{resident:.2}"));
    stat_line("Extraction time (s)", format!("{:.3}", report.elapsed.as_secs_f64()));
    stat_line("Reached timeout", report.reached_timeout());
    println!("c ======================================================================");
}

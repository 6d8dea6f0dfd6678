//! # knf-extract
//!
//! Reads a DIMACS CNF formula, recovers the cardinality constraints encoded
//! in it, and writes the result in KNF.
//!
//! ## Usage
//!
//! ```sh
//! # Extract from a file, KNF on stdout, statistics as `c` lines
//! knf-extract problem.cnf
//!
//! # Same, with debug logging on stderr and the generalized encoded pass
//! knf-extract file --path problem.cnf -vv --encoded-others
//!
//! # Extract from inline text
//! knf-extract text --input "-1 -2 0
//! -1 -3 0
//! -2 -3 0"
//!
//! # Convert every .cnf under a directory, writing <file>.knf next to each
//! knf-extract batch --dir benchmarks/
//!
//! # Shell completions
//! knf-extract completions zsh
//! ```
//!
//! Statistics go to stdout as DIMACS comments, so the output stays a valid
//! KNF file. Logs go to stderr.

use anyhow::{Result, bail};
use clap::{CommandFactory, Parser};
use command_line::cli::{Cli, Commands, extract_dir, extract_file, extract_text, init_logging};
use std::io;

mod command_line;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let common = &cli.common;
    init_logging(common.verbose);

    match &cli.command {
        Some(Commands::File { path }) => extract_file(path, common),
        Some(Commands::Text { input }) => extract_text(input, common),
        Some(Commands::Batch { dir }) => extract_dir(dir, common),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => match &cli.path {
            Some(path) => extract_file(path, common),
            None => bail!("no input given, use --help for more information"),
        },
    }
}

//! Command-line parsing and the drivers behind each subcommand.

pub(crate) mod cli;

//! Command-line interface for ticket-forge.
//!
//! Provides the `generate` and `check` commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, CheckArgs, Cli, Commands, GenerateArgs};

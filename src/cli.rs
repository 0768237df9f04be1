//! Command-line interface for the strata IR tools.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Parse and check textual IR", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log parser progress
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a file and print it in generic form
    Parse {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Parse and verify a file without printing it
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
pub struct InputArgs {
    /// Source file, or `-` for standard input
    pub file: PathBuf,

    /// Accept operations from dialects that are not registered
    #[arg(long)]
    pub allow_unknown_dialects: bool,

    /// Skip structural verification after parsing
    #[arg(long)]
    pub no_verify: bool,

    /// Parser options as JSON. Flags on the command line take precedence.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

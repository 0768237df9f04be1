//! Strata CLI entry point.

mod cli;
mod error;

use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use strata_asm::{DialectRegistry, ParserConfig, parse_source_str};
use strata_ir::IrContext;
use strata_ir::printer::print_block_ops;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, InputArgs};
use error::{Error, Result};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Command::Parse { input } => run(input, true),
        Command::Check { input } => run(input, false),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(input: &InputArgs, print: bool) -> Result<()> {
    let config = parser_config(input)?;
    let source = read_source(&input.file)?;

    let mut ctx = IrContext::new();
    let mut registry = DialectRegistry::with_builtin_dialects();
    let parsed = parse_source_str(&mut ctx, &mut registry, &config, &source)
        .map_err(|err| Error::Parse(err.render(&config.source_name, &source).trim_end().to_owned()))?;
    tracing::debug!(dialects = ?registry.loaded_dialects(), "Parse succeeded");

    if print {
        print!("{}", print_block_ops(&ctx, parsed.block));
    } else {
        println!("{}: ok", config.source_name);
    }
    Ok(())
}

/// Start from the JSON config if one is given, then apply flags.
fn parser_config(input: &InputArgs) -> Result<ParserConfig> {
    let mut config = match &input.config {
        Some(path) => serde_json::from_str(&read_file(path)?)?,
        None => ParserConfig::default(),
    };
    if input.allow_unknown_dialects {
        config.allow_unknown_dialects = true;
    }
    if input.no_verify {
        config.verify_after_parse = false;
    }
    config.source_name = input.file.display().to_string();
    Ok(config)
}

fn read_source(path: &Path) -> Result<String> {
    if path != Path::new("-") {
        return read_file(path);
    }
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .map_err(|source| Error::Read {
            path: "<stdin>".to_owned(),
            source,
        })?;
    Ok(source)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })
}

//! The Rossa Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::io;
use std::path::Path;
use std::process;

use clap::Parser;
use termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, OutputFormat, RossaArgs};
use crate::diagnostics::{Result, RossaError};
use crate::harness::run_checks;
use crate::loader::GeneratorConfig;
use crate::plan::TestPlan;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = RossaArgs::parse();
    init_logging(args.verbose);

    // Dispatch to the appropriate subcommand handler.
    let result = match args.command {
        Command::Expand {
            file,
            entry,
            format,
        } => handle_expand(&file, GeneratorConfig::new(entry), format),
        Command::Summary { file, entry } => handle_summary(&file, GeneratorConfig::new(entry)),
        Command::Check { path, entry } => handle_check(&path, GeneratorConfig::new(entry)),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(1);
        }
    }
}

/// Logs go to stderr so that stdout stays machine-readable.
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn stdout_error(source: io::Error) -> RossaError {
    RossaError::Io {
        path: "<stdout>".to_string(),
        source,
    }
}

/// Handles the `expand` subcommand.
fn handle_expand(file: &Path, config: GeneratorConfig, format: OutputFormat) -> Result<bool> {
    let plan = TestPlan::from_file(file, &config)?;
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    match format {
        OutputFormat::Pretty => output::print_steps(&mut stdout, plan.steps()),
        OutputFormat::Json => output::print_json(&mut stdout, plan.steps()),
        OutputFormat::Yaml => output::print_yaml(&mut stdout, plan.steps()),
    }
    .map_err(stdout_error)?;
    Ok(true)
}

/// Handles the `summary` subcommand.
fn handle_summary(file: &Path, config: GeneratorConfig) -> Result<bool> {
    let plan = TestPlan::from_file(file, &config)?;
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    output::print_summary(&mut stdout, &plan.summary()).map_err(stdout_error)?;
    Ok(true)
}

/// Handles the `check` subcommand; fails when any file fails.
fn handle_check(path: &Path, config: GeneratorConfig) -> Result<bool> {
    let report = run_checks(path, &config)?;
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    output::print_report(&mut stdout, &report).map_err(stdout_error)?;
    Ok(report.failed() == 0)
}

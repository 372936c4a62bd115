//! Defines the command-line arguments and subcommands for the Rossa CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::loader::DEFAULT_ENTRY_POINT;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "rossa",
    version,
    about = "Expands nested bench-test loop specifications into ordered setup, test and teardown steps."
)]
pub struct RossaArgs {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG is used otherwise.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the full step sequence of a specification.
    Expand {
        /// The specification file (.yaml, .yml or .json).
        #[arg(required = true)]
        file: PathBuf,
        /// Root key where the loop chain starts.
        #[arg(long, default_value = DEFAULT_ENTRY_POINT)]
        entry: String,
        /// How to print the steps.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
    /// Print counts and index ranges of a specification's sequence.
    Summary {
        /// The specification file (.yaml, .yml or .json).
        #[arg(required = true)]
        file: PathBuf,
        /// Root key where the loop chain starts.
        #[arg(long, default_value = DEFAULT_ENTRY_POINT)]
        entry: String,
    },
    /// Check every specification file below a path.
    Check {
        /// A specification file or a directory searched recursively.
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Root key where the loop chain starts.
        #[arg(long, default_value = DEFAULT_ENTRY_POINT)]
        entry: String,
    },
}

/// Output encodings for `expand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, one line per step.
    Pretty,
    Json,
    Yaml,
}

//! Unified, `miette`-based diagnostics for the Rossa engine.
//!
//! Every failure of the combination engine is reported synchronously as a
//! single [`RossaError`]. Nothing is recovered internally: a structural
//! problem is detected before any output is produced, while reference and
//! shape problems abort generation mid-way and no partial sequence is
//! returned.

use miette::Diagnostic;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = RossaError> = std::result::Result<T, E>;

/// Type-safe error classification that corresponds to `RossaError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Missing entry point, missing inner loop, parallel outer loops
    Structural,
    /// Setup/teardown template that cannot be resolved
    Reference,
    /// Zip-group members of unequal length
    Shape,
    /// Unreadable or undecodable specification files
    Input,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Structural => "Structural",
            ErrorType::Reference => "Reference",
            ErrorType::Shape => "Shape",
            ErrorType::Input => "Input",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single error type of the crate.
#[derive(Error, Diagnostic, Debug)]
pub enum RossaError {
    #[error("No {entry_point} loop found.")]
    #[diagnostic(
        code(rossa::structure::missing_entry_point),
        help("add a top-level entry point mapping holding the outermost loop")
    )]
    MissingEntryPoint { entry_point: String },

    #[error("Entry point '{entry_point}' must be a mapping, found {found}.")]
    #[diagnostic(code(rossa::structure::entry_point_not_mapping))]
    EntryPointNotMapping { entry_point: String, found: String },

    #[error("No inner loops found below '{level}', see manual for construction of main loop.")]
    #[diagnostic(
        code(rossa::structure::no_inner_loops),
        help("every loop level needs at least one nested mapping; the innermost ones are the tests")
    )]
    NoInnerLoops { level: String },

    #[error("Outer loops must not consist of parallel loops (below '{level}': {})", .siblings.join(", "))]
    #[diagnostic(
        code(rossa::structure::parallel_outer_loops),
        help("only the innermost level may hold several sibling mappings, and those must be tests")
    )]
    ParallelOuterLoops { level: String, siblings: Vec<String> },

    #[error("Template {name} not found in parameters.")]
    #[diagnostic(
        code(rossa::reference::template_not_found),
        help("setup and teardown entries must name a top-level mapping other than the entry point")
    )]
    TemplateNotFound { name: String },

    #[error(
        "Mismatch in zip_group length. Please ensure that zip groups have the same amount of values \
         (group '{group}': {})",
        format_lengths(.lengths)
    )]
    #[diagnostic(code(rossa::shape::zip_group_mismatch))]
    ZipGroupMismatch {
        group: String,
        lengths: Vec<(String, usize)>,
    },

    #[error("Failed to read '{path}'")]
    #[diagnostic(code(rossa::input::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode '{path}': {message}")]
    #[diagnostic(code(rossa::input::format))]
    Format { path: String, message: String },

    #[error("Unsupported specification format '{path}'")]
    #[diagnostic(
        code(rossa::input::unsupported_format),
        help("use a .yaml, .yml or .json file")
    )]
    UnsupportedFormat { path: String },
}

fn format_lengths(lengths: &[(String, usize)]) -> String {
    lengths
        .iter()
        .map(|(name, len)| format!("{}={}", name, len))
        .collect::<Vec<_>>()
        .join(", ")
}

impl RossaError {
    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            RossaError::MissingEntryPoint { .. }
            | RossaError::EntryPointNotMapping { .. }
            | RossaError::NoInnerLoops { .. }
            | RossaError::ParallelOuterLoops { .. } => ErrorType::Structural,
            RossaError::TemplateNotFound { .. } => ErrorType::Reference,
            RossaError::ZipGroupMismatch { .. } => ErrorType::Shape,
            RossaError::Io { .. }
            | RossaError::Format { .. }
            | RossaError::UnsupportedFormat { .. } => ErrorType::Input,
        }
    }
}

//! Rossa expands a nested specification of bench-test loops into the ordered
//! sequence of setup, test and teardown steps a runner has to follow.
//!
//! The pipeline runs one way: the specification is validated and decomposed
//! into a loop skeleton ([`skeleton`]), whose per-level parameter sweeps
//! ([`params`]) and setup/teardown templates ([`template`]) are combined into
//! the final step list ([`sequence`]). Nothing is executed; generation is a
//! pure function of the specification.

pub use crate::diagnostics::{ErrorType, Result, RossaError};
pub use crate::plan::{PlanSummary, TestPlan};
pub use crate::sequence::{get_combinations, Combination, Generator, Scope, Step};
pub use crate::value::{Mapping, Value};

pub mod cli;
pub mod diagnostics;
pub mod harness;
pub mod loader;
pub mod params;
pub mod plan;
pub mod sequence;
pub mod skeleton;
pub mod template;
pub mod value;

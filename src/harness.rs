//! Checking a directory of specification files.
//!
//! Every `.yaml`, `.yml` or `.json` file found below a root is loaded and
//! expanded; the outcome of each file is collected into a [`CheckReport`].
//!
//! ```rust,no_run
//! use rossa::harness::run_checks;
//! use rossa::loader::GeneratorConfig;
//!
//! let report = run_checks("benches/specs", &GeneratorConfig::default()).unwrap();
//! if report.failed() > 0 {
//!     std::process::exit(1);
//! }
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::diagnostics::{ErrorType, Result, RossaError};
use crate::loader::{GeneratorConfig, SpecFormat};
use crate::plan::{PlanSummary, TestPlan};

/// Outcome of checking one specification file.
#[derive(Debug, Clone)]
pub enum CheckResult {
    Pass {
        file: PathBuf,
        summary: PlanSummary,
    },
    Fail {
        file: PathBuf,
        error_type: ErrorType,
        error: String,
    },
}

impl CheckResult {
    pub fn file(&self) -> &Path {
        match self {
            CheckResult::Pass { file, .. } | CheckResult::Fail { file, .. } => file,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, CheckResult::Pass { .. })
    }
}

/// All results of one run, in file order.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

/// Recursively finds specification files below `root`, sorted for a
/// deterministic order. A file given as root is returned as it is.
pub fn discover_spec_files<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| RossaError::Io {
            path: root.display().to_string(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if SpecFormat::from_path(entry.path()).is_none() {
            continue;
        }
        files.push(entry.path().to_path_buf());
    }
    files.sort();
    Ok(files)
}

/// Loads and expands one file.
pub fn check_file(path: &Path, config: &GeneratorConfig) -> CheckResult {
    match TestPlan::from_file(path, config) {
        Ok(plan) => {
            debug!(file = %path.display(), "specification expanded");
            CheckResult::Pass {
                file: path.to_path_buf(),
                summary: plan.summary(),
            }
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "specification rejected");
            CheckResult::Fail {
                file: path.to_path_buf(),
                error_type: e.error_type(),
                error: e.to_string(),
            }
        }
    }
}

/// Checks every specification file below `root`.
pub fn run_checks<P: AsRef<Path>>(root: P, config: &GeneratorConfig) -> Result<CheckReport> {
    let results = discover_spec_files(root)?
        .iter()
        .map(|file| check_file(file, config))
        .collect();
    Ok(CheckReport { results })
}

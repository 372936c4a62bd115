//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for pretty-printing and colorizing steps,
//! summaries and check reports, and for the JSON/YAML encodings. Every
//! printer writes to a `WriteColor` so the same code serves the terminal and
//! in-memory buffers.

use std::io::{self, Write};

use serde::Serialize;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::harness::{CheckReport, CheckResult};
use crate::plan::PlanSummary;
use crate::sequence::{Combination, Scope, Step};
use crate::template::SetupEntry;

// ============================================================================
// STEPS
// ============================================================================

/// Prints one line per step: setups in green, teardowns in yellow.
pub fn print_steps(out: &mut impl WriteColor, steps: &[Step]) -> io::Result<()> {
    for step in steps {
        match step {
            Step::Setup { scope, entries } => {
                print_boundary(out, "setup", Color::Green, *scope, entries)?
            }
            Step::Teardown { scope, entries } => {
                print_boundary(out, "teardown", Color::Yellow, *scope, entries)?
            }
            Step::Test(combination) => print_combination(out, combination)?,
        }
    }
    Ok(())
}

/// Serializes steps as pretty JSON.
pub fn print_json(out: &mut impl Write, steps: &[Step]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, steps).map_err(io::Error::other)?;
    writeln!(out)
}

/// Serializes any value as YAML.
pub fn print_yaml<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> io::Result<()> {
    serde_yaml::to_writer(&mut *out, value).map_err(io::Error::other)
}

fn print_boundary(
    out: &mut impl WriteColor,
    label: &str,
    color: Color,
    scope: Scope,
    entries: &[SetupEntry],
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{:<9}", label)?;
    out.reset()?;
    write!(out, "{:<10}", scope_label(scope))?;
    let rendered: Vec<String> = entries.iter().map(entry_label).collect();
    writeln!(out, "{}", rendered.join("; "))
}

fn print_combination(out: &mut impl WriteColor, combination: &Combination) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{:<9}", "test")?;
    out.reset()?;
    let index: Vec<String> = combination.index.iter().map(usize::to_string).collect();
    write!(out, "{} [{}]", combination.test, index.join(","))?;
    for (name, value) in &combination.parameters {
        write!(out, " {}={}", name, value)?;
    }
    if let Some(labels) = &combination.yield_values {
        let labels: Vec<String> = labels.iter().map(ToString::to_string).collect();
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, " -> {}", labels.join(", "))?;
        out.reset()?;
    }
    writeln!(out)
}

fn scope_label(scope: Scope) -> String {
    match scope {
        Scope::Loop => "loop".to_string(),
        Scope::Level(level) => format!("level {}", level),
        Scope::Test(test) => format!("test {}", test),
    }
}

fn entry_label(entry: &SetupEntry) -> String {
    match entry {
        SetupEntry::Empty => "-".to_string(),
        SetupEntry::Literal(mapping) => crate::value::Value::Map(mapping.clone()).to_string(),
        SetupEntry::Template {
            template,
            expansions,
        } => format!("{} (x{})", template, expansions.len()),
    }
}

// ============================================================================
// SUMMARIES AND REPORTS
// ============================================================================

pub fn print_summary(out: &mut impl WriteColor, summary: &PlanSummary) -> io::Result<()> {
    writeln!(out, "levels:       {}", summary.levels.join(" > "))?;
    writeln!(out, "tests:        {}", summary.tests.join(", "))?;
    writeln!(out, "combinations: {}", summary.combinations)?;
    writeln!(out, "setups:       {}", summary.setups)?;
    writeln!(out, "teardowns:    {}", summary.teardowns)?;
    let max: Vec<String> = summary.max_index.iter().map(usize::to_string).collect();
    writeln!(out, "max index:    [{}]", max.join(", "))
}

/// Prints PASS/FAIL per file and the totals.
pub fn print_report(out: &mut impl WriteColor, report: &CheckReport) -> io::Result<()> {
    for result in &report.results {
        match result {
            CheckResult::Pass { file, summary } => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
                write!(out, "PASS")?;
                out.reset()?;
                writeln!(
                    out,
                    " {} ({} combinations)",
                    file.display(),
                    summary.combinations
                )?;
            }
            CheckResult::Fail {
                file,
                error_type,
                error,
            } => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                write!(out, "FAIL")?;
                out.reset()?;
                writeln!(out, " {} [{}] {}", file.display(), error_type, error)?;
            }
        }
    }
    writeln!(
        out,
        "\n{} passed, {} failed",
        report.passed(),
        report.failed()
    )
}

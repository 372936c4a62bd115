//! Resolution of setup and teardown entries.
//!
//! A setup/teardown list may nest arbitrarily; it is flattened depth-first.
//! `null` entries and literal mappings pass through, while a string names a
//! top-level mapping of the specification (a template) which is expanded into
//! one concrete mapping per parameter combination. Templates do not chain: a
//! template's own `setup`/`teardown` keys are ignored.

use serde::Serialize;
use tracing::debug;

use crate::diagnostics::{Result, RossaError};
use crate::params::ParameterCombination;
use crate::value::{Mapping, Value};

pub const SETUP_KEY: &str = "setup";
pub const TEARDOWN_KEY: &str = "teardown";

/// One resolved item of a setup or teardown list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SetupEntry {
    /// A `null` entry in the specification.
    Empty,
    /// A mapping written inline in the specification.
    Literal(Mapping),
    /// A named template expanded into its parameter combinations.
    Template {
        template: String,
        expansions: Vec<Mapping>,
    },
}

/// A top-level named mapping usable as a setup/teardown reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub parameters: Mapping,
}

impl Template {
    pub fn expand(&self) -> Result<Vec<Mapping>> {
        ParameterCombination::new(&self.parameters).combinations()
    }
}

/// The root of a specification viewed as a table of templates. Every root
/// key except the entry point is eligible.
#[derive(Debug, Clone, Copy)]
pub struct TemplateTable<'a> {
    root: &'a Mapping,
    entry_point: &'a str,
}

impl<'a> TemplateTable<'a> {
    pub fn new(root: &'a Mapping, entry_point: &'a str) -> Self {
        Self { root, entry_point }
    }

    /// Looks up a template, leaving out its `setup`/`teardown` keys.
    pub fn lookup(&self, name: &str) -> Result<Template> {
        let not_found = || RossaError::TemplateNotFound {
            name: name.to_string(),
        };
        if name == self.entry_point {
            return Err(not_found());
        }
        let mapping = self
            .root
            .get(name)
            .and_then(Value::as_map)
            .ok_or_else(not_found)?;
        let parameters = mapping
            .iter()
            .filter(|(key, _)| key.as_str() != SETUP_KEY && key.as_str() != TEARDOWN_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Template {
            name: name.to_string(),
            parameters,
        })
    }

    /// Resolves a raw setup/teardown value. A missing or `null` value is an
    /// empty list; a bare entry is treated as a one-element list.
    pub fn fill(&self, entries: Option<&Value>) -> Result<Vec<SetupEntry>> {
        let Some(entries) = entries else {
            return Ok(Vec::new());
        };
        if entries.is_nil() {
            return Ok(Vec::new());
        }
        flatten_entries(entries)
            .into_iter()
            .map(|entry| self.resolve_entry(entry))
            .collect()
    }

    fn resolve_entry(&self, entry: &Value) -> Result<SetupEntry> {
        match entry {
            Value::Nil => Ok(SetupEntry::Empty),
            Value::Map(mapping) => Ok(SetupEntry::Literal(mapping.clone())),
            Value::String(name) => {
                let template = self.lookup(name)?;
                let expansions = template.expand()?;
                debug!(template = %name, expansions = expansions.len(), "resolved template");
                Ok(SetupEntry::Template {
                    template: template.name,
                    expansions,
                })
            }
            other => Err(RossaError::TemplateNotFound {
                name: other.to_string(),
            }),
        }
    }
}

/// Flattens nested lists depth-first, preserving order. A non-list value is
/// returned as its own single entry.
pub fn flatten_entries(value: &Value) -> Vec<&Value> {
    let mut flat = Vec::new();
    collect_entries(value, &mut flat);
    flat
}

fn collect_entries<'v>(value: &'v Value, flat: &mut Vec<&'v Value>) {
    match value {
        Value::List(items) => {
            for item in items {
                collect_entries(item, flat);
            }
        }
        other => flat.push(other),
    }
}

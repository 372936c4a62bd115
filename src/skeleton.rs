//! Loop skeleton extraction.
//!
//! Below the entry point a specification is a single chain of loop levels.
//! Each level holds its own setup/teardown, optional yield labels and the
//! parameters it sweeps, plus exactly one nested mapping for the next level
//! down. The first level whose children contain no further mappings is the
//! last one: its children are the leaf tests, and only there may several
//! sibling mappings appear.
//!
//! [`check_validity`] rejects malformed chains before anything is generated;
//! [`extract_skeleton`] then reads the chain into typed [`OuterLevel`] and
//! [`LeafTest`] nodes without modifying the specification.

use tracing::debug;

use crate::diagnostics::{Result, RossaError};
use crate::params::{IndexedCombination, ParameterCombination};
use crate::template::{SetupEntry, TemplateTable, SETUP_KEY, TEARDOWN_KEY};
use crate::value::{Mapping, Value};

/// Yield labels declared on an outer level.
pub const YIELD_VALUES_KEY: &str = "yield_values";
/// Yield labels declared on a leaf test.
pub const YIELD_KEY: &str = "yield";

/// What a nested mapping stands for inside the loop chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Holds further nested mappings: another loop level.
    OuterLevel,
    /// Holds no nested mapping: a test to execute.
    LeafTest,
}

impl NodeKind {
    pub fn of(mapping: &Mapping) -> Self {
        if mapping
            .iter()
            .any(|(key, value)| !is_reserved(key) && value.is_map())
        {
            NodeKind::OuterLevel
        } else {
            NodeKind::LeafTest
        }
    }
}

/// One loop level above the leaf tests.
#[derive(Debug, Clone, PartialEq)]
pub struct OuterLevel {
    pub name: String,
    pub depth: usize,
    pub setup: Vec<SetupEntry>,
    pub teardown: Vec<SetupEntry>,
    /// Own, non-nested parameters (setup, teardown and yield keys removed).
    pub parameters: Mapping,
}

/// An innermost test definition.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafTest {
    pub name: String,
    pub setup: Vec<SetupEntry>,
    pub teardown: Vec<SetupEntry>,
    /// Effective labels: the test's own `yield`, else the inherited list.
    pub yield_values: Option<Vec<Value>>,
    pub parameters: Mapping,
}

/// The decomposed loop chain.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSkeleton {
    /// Outer levels, index 0 = outermost (the entry point).
    pub levels: Vec<OuterLevel>,
    /// Yield labels inherited from the deepest level declaring them.
    pub yield_values: Option<Vec<Value>>,
    pub tests: Vec<LeafTest>,
    /// One combination set per outer level, outermost first.
    pub outer_combinations: Vec<Vec<IndexedCombination>>,
}

impl LoopSkeleton {
    /// Number of outer levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn setups(&self) -> impl DoubleEndedIterator<Item = &[SetupEntry]> {
        self.levels.iter().map(|level| level.setup.as_slice())
    }

    pub fn teardowns(&self) -> impl DoubleEndedIterator<Item = &[SetupEntry]> {
        self.levels.iter().map(|level| level.teardown.as_slice())
    }
}

fn entry<'a>(spec: &'a Mapping, entry_point: &str) -> Result<&'a Mapping> {
    let value = spec
        .get(entry_point)
        .ok_or_else(|| RossaError::MissingEntryPoint {
            entry_point: entry_point.to_string(),
        })?;
    value.as_map().ok_or_else(|| RossaError::EntryPointNotMapping {
        entry_point: entry_point.to_string(),
        found: value.type_name().to_string(),
    })
}

/// Setup, teardown and yield keys never name a nested level, even when a
/// bare mapping is given as their value.
fn is_reserved(key: &str) -> bool {
    matches!(key, SETUP_KEY | TEARDOWN_KEY | YIELD_VALUES_KEY | YIELD_KEY)
}

fn child_mappings(level: &Mapping) -> Vec<(&str, &Mapping)> {
    level
        .iter()
        .filter(|(name, _)| !is_reserved(name))
        .filter_map(|(name, value)| value.as_map().map(|m| (name.as_str(), m)))
        .collect()
}

fn labels(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Nil => None,
        other => Some(other.to_list()),
    }
}

/// Checks that the entry point exists and that no outer level consists of
/// parallel loops.
pub fn check_validity(spec: &Mapping, entry_point: &str) -> Result<()> {
    let mut name = entry_point;
    let mut level = entry(spec, entry_point)?;
    loop {
        let children = child_mappings(level);
        let Some(&(first_name, first)) = children.first() else {
            return Ok(());
        };
        if children.len() > 1
            && children
                .iter()
                .any(|(_, child)| NodeKind::of(child) == NodeKind::OuterLevel)
        {
            return Err(RossaError::ParallelOuterLoops {
                level: name.to_string(),
                siblings: children.iter().map(|(n, _)| n.to_string()).collect(),
            });
        }
        name = first_name;
        level = first;
    }
}

/// Reads the loop chain below `entry_point` into a [`LoopSkeleton`].
///
/// Setup and teardown references on every level and on every leaf test are
/// resolved against the root of `spec`.
pub fn extract_skeleton(spec: &Mapping, entry_point: &str) -> Result<LoopSkeleton> {
    let table = TemplateTable::new(spec, entry_point);
    let mut name = entry_point;
    let mut level = entry(spec, entry_point)?;
    let mut levels = Vec::new();
    let mut outer_combinations = Vec::new();
    let mut yield_values = None;

    loop {
        let depth = levels.len();
        if let Some(declared) = level.get(YIELD_VALUES_KEY) {
            yield_values = labels(declared);
        }
        let parameters: Mapping = level
            .iter()
            .filter(|(key, value)| {
                !value.is_map()
                    && !matches!(key.as_str(), SETUP_KEY | TEARDOWN_KEY | YIELD_VALUES_KEY)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let combinations = ParameterCombination::new(&parameters).indexed()?;
        debug!(level = %name, depth, combinations = combinations.len(), "extracted loop level");

        levels.push(OuterLevel {
            name: name.to_string(),
            depth,
            setup: table.fill(level.get(SETUP_KEY))?,
            teardown: table.fill(level.get(TEARDOWN_KEY))?,
            parameters,
        });
        outer_combinations.push(combinations);

        let children = child_mappings(level);
        let Some(&(child_name, child)) = children.first() else {
            return Err(RossaError::NoInnerLoops {
                level: name.to_string(),
            });
        };
        if NodeKind::of(child) == NodeKind::LeafTest {
            let tests = children
                .iter()
                .map(|(test_name, test)| build_test(test_name, test, &table, &yield_values))
                .collect::<Result<Vec<_>>>()?;
            debug!(level = %name, tests = tests.len(), "found leaf tests");
            return Ok(LoopSkeleton {
                levels,
                yield_values,
                tests,
                outer_combinations,
            });
        }
        name = child_name;
        level = child;
    }
}

fn build_test(
    name: &str,
    test: &Mapping,
    table: &TemplateTable<'_>,
    inherited: &Option<Vec<Value>>,
) -> Result<LeafTest> {
    let yield_values = match test.get(YIELD_KEY) {
        Some(declared) => labels(declared),
        None => inherited.clone(),
    };
    let parameters = test
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), SETUP_KEY | TEARDOWN_KEY | YIELD_KEY))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Ok(LeafTest {
        name: name.to_string(),
        setup: table.fill(test.get(SETUP_KEY))?,
        teardown: table.fill(test.get(TEARDOWN_KEY))?,
        yield_values,
        parameters,
    })
}

//! Parameter combination via cartesian products and zips.
//!
//! A flat mapping of names to scalar-or-list values describes a sweep: every
//! list with more than one element is a swept dimension, everything else is
//! held fixed. Parameters whose names carry the same `#zip_<group>` tag vary
//! in lockstep instead of independently.
//!
//! The tag is parsed once into a [`ParamName`]; the valid tuples are found by
//! walking the cartesian product of the swept dimensions lazily and keeping
//! only the tuples in which every zip group sits on its diagonal.

use indexmap::IndexMap;
use tracing::trace;

use crate::diagnostics::{Result, RossaError};
use crate::value::{Mapping, Value};

/// Marker that introduces a zip-group tag inside a parameter name.
pub const ZIP_MARKER: &str = "#zip_";

/// A parameter name split into its plain name and optional zip-group tag.
///
/// # Examples
///
/// ```rust
/// use rossa::params::ParamName;
/// let name = ParamName::parse("param_1#zip_corner");
/// assert_eq!(name.name, "param_1");
/// assert_eq!(name.zip_group.as_deref(), Some("corner"));
/// assert_eq!(ParamName::parse("temperature").zip_group, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamName {
    pub name: String,
    pub zip_group: Option<String>,
}

impl ParamName {
    /// Parses a raw specification key. Everything after the first `#` is
    /// decoration; the group is the text between `#zip_` and the next `#`.
    pub fn parse(raw: &str) -> Self {
        let name = raw.split('#').next().unwrap_or(raw).to_string();
        let zip_group = raw
            .split_once(ZIP_MARKER)
            .map(|(_, rest)| rest.split('#').next().unwrap_or(rest))
            .filter(|group| !group.is_empty())
            .map(str::to_string);
        Self { name, zip_group }
    }

    /// A name without any zip-group tag.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zip_group: None,
        }
    }
}

/// A single named parameter with its candidate values.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: ParamName,
    pub values: Vec<Value>,
}

impl Parameter {
    /// Builds a parameter from a raw key and a scalar-or-list value.
    pub fn from_raw(raw: &str, value: &Value) -> Self {
        Self {
            name: ParamName::parse(raw),
            values: value.to_list(),
        }
    }

    /// A parameter pinned to one value.
    pub fn fixed(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: ParamName::plain(name),
            values: vec![value],
        }
    }

    /// Swept parameters contribute a dimension to the product.
    pub fn is_swept(&self) -> bool {
        self.values.len() > 1
    }
}

/// A flat mapping produced by [`ParameterCombination::indexed`], tagged with
/// its position among the valid combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedCombination {
    pub index: usize,
    pub parameters: Mapping,
}

/// Parameter combination via product and zips.
///
/// # Examples
///
/// ```rust
/// use rossa::params::ParameterCombination;
/// use rossa::value::{Mapping, Value};
///
/// let mut mapping = Mapping::new();
/// mapping.insert("temperature".into(), Value::from(vec![25i64, 26, 27]));
/// mapping.insert("param_1#zip_corner".into(), Value::from(vec![1i64, 2]));
/// mapping.insert("param_2#zip_corner".into(), Value::from(vec!["a", "b"]));
///
/// let combination = ParameterCombination::new(&mapping);
/// assert_eq!(combination.shape(), vec![3, 2, 2]);
/// assert_eq!(combination.combinations().unwrap().len(), 6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCombination {
    parameters: Vec<Parameter>,
}

impl ParameterCombination {
    /// Normalizes every value of the mapping to a list.
    pub fn new(mapping: &Mapping) -> Self {
        Self {
            parameters: mapping
                .iter()
                .map(|(raw, value)| Parameter::from_raw(raw, value))
                .collect(),
        }
    }

    pub fn from_parameters(parameters: Vec<Parameter>) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Lengths of all swept parameters, in declaration order.
    pub fn shape(&self) -> Vec<usize> {
        self.parameters
            .iter()
            .filter(|p| p.is_swept())
            .map(|p| p.values.len())
            .collect()
    }

    /// Zip-group tag of every swept parameter, in declaration order.
    pub fn zip_groups(&self) -> Vec<Option<&str>> {
        self.parameters
            .iter()
            .filter(|p| p.is_swept())
            .map(|p| p.name.zip_group.as_deref())
            .collect()
    }

    /// Flattened (row-major over [`shape`](Self::shape)) validity mask of the
    /// full product. An entry is valid when every zip group with at least two
    /// swept members sits on its diagonal.
    pub fn combination_index(&self) -> Result<Vec<bool>> {
        let groups = self.zip_axes()?;
        Ok(CartesianIndices::new(self.shape())
            .map(|positions| on_diagonal(&groups, &positions))
            .collect())
    }

    /// All valid combinations in nested cartesian order (first-declared
    /// parameter varies slowest), with zip tags stripped from the names.
    pub fn combinations(&self) -> Result<Vec<Mapping>> {
        let groups = self.zip_axes()?;
        if self.parameters.iter().any(|p| p.values.is_empty()) {
            return Ok(Vec::new());
        }
        let combinations: Vec<Mapping> = CartesianIndices::new(self.shape())
            .filter(|positions| on_diagonal(&groups, positions))
            .map(|positions| self.resolve(&positions))
            .collect();
        trace!(
            parameters = self.parameters.len(),
            shape = ?self.shape(),
            combinations = combinations.len(),
            "combined parameters"
        );
        Ok(combinations)
    }

    /// Valid combinations paired with their running index.
    pub fn indexed(&self) -> Result<Vec<IndexedCombination>> {
        Ok(self
            .combinations()?
            .into_iter()
            .enumerate()
            .map(|(index, parameters)| IndexedCombination { index, parameters })
            .collect())
    }

    // Swept axes of every zip group with two or more swept members.
    fn zip_axes(&self) -> Result<Vec<Vec<usize>>> {
        let mut groups: IndexMap<&str, Vec<(usize, &Parameter)>> = IndexMap::new();
        for (axis, parameter) in self.parameters.iter().filter(|p| p.is_swept()).enumerate() {
            if let Some(group) = parameter.name.zip_group.as_deref() {
                groups.entry(group).or_default().push((axis, parameter));
            }
        }

        let mut axes = Vec::new();
        for (group, members) in groups {
            if members.len() < 2 {
                continue;
            }
            let len = members[0].1.values.len();
            if members.iter().any(|(_, p)| p.values.len() != len) {
                return Err(RossaError::ZipGroupMismatch {
                    group: group.to_string(),
                    lengths: members
                        .iter()
                        .map(|(_, p)| (p.name.name.clone(), p.values.len()))
                        .collect(),
                });
            }
            axes.push(members.iter().map(|(axis, _)| *axis).collect());
        }
        Ok(axes)
    }

    fn resolve(&self, positions: &[usize]) -> Mapping {
        let mut mapping = Mapping::with_capacity(self.parameters.len());
        let mut axis = 0;
        for parameter in &self.parameters {
            let value = if parameter.is_swept() {
                let value = parameter.values[positions[axis]].clone();
                axis += 1;
                value
            } else {
                parameter.values[0].clone()
            };
            // a repeated plain name keeps its first position, the later value wins
            mapping.insert(parameter.name.name.clone(), value);
        }
        mapping
    }
}

fn on_diagonal(groups: &[Vec<usize>], positions: &[usize]) -> bool {
    groups.iter().all(|axes| {
        let first = positions[axes[0]];
        axes.iter().all(|&axis| positions[axis] == first)
    })
}

/// Lazy odometer over the index tuples of a cartesian product; the last axis
/// varies fastest. An empty shape yields exactly one empty tuple.
///
/// # Examples
///
/// ```rust
/// use rossa::params::CartesianIndices;
/// let tuples: Vec<Vec<usize>> = CartesianIndices::new(vec![2, 2]).collect();
/// assert_eq!(tuples, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
/// ```
#[derive(Debug, Clone)]
pub struct CartesianIndices {
    lengths: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl CartesianIndices {
    pub fn new(lengths: Vec<usize>) -> Self {
        let next = if lengths.contains(&0) {
            None
        } else {
            Some(vec![0; lengths.len()])
        };
        Self { lengths, next }
    }
}

impl Iterator for CartesianIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut successor = current.clone();
        for axis in (0..successor.len()).rev() {
            successor[axis] += 1;
            if successor[axis] < self.lengths[axis] {
                self.next = Some(successor);
                break;
            }
            successor[axis] = 0;
        }
        Some(current)
    }
}

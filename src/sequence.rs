//! Sequence generation: the ordered list of setup, test and teardown steps.
//!
//! The outer combination sets of a [`LoopSkeleton`] are combined with a
//! cartesian product, outermost level varying slowest. Every leaf test is
//! expanded once per outer tuple, bracketed by its own setup and teardown.
//! A single setup step opens every level before the first tuple and a single
//! teardown step closes them, innermost first, after the last one. Whenever
//! an enclosing level advances, the levels below it restart: they are torn
//! down innermost-first and set up again outermost-first.

use std::ops::Range;

use serde::{Serialize, Serializer};
use tracing::{debug, trace};

use crate::diagnostics::Result;
use crate::loader::GeneratorConfig;
use crate::params::{CartesianIndices, Parameter, ParameterCombination};
use crate::skeleton::{check_validity, extract_skeleton, LeafTest, LoopSkeleton};
use crate::template::SetupEntry;
use crate::value::{Mapping, Value};

/// Which part of the loop chain a setup or teardown step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The step that opens (or closes) every outer level at once.
    Loop,
    /// A restart of one outer level.
    Level(usize),
    /// The bracket around one leaf test.
    Test(usize),
}

/// One concrete test invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    /// Name of the leaf test that produced it.
    pub test: String,
    /// Position of that test among the leaf tests.
    pub test_index: usize,
    /// Composite index: one entry per outer level, then the test's own
    /// combination index.
    pub index: Vec<usize>,
    pub parameters: Mapping,
    pub yield_values: Option<Vec<Value>>,
}

impl Combination {
    /// The `__index_<level>` component, if the level exists.
    pub fn level_index(&self, level: usize) -> Option<usize> {
        self.index.get(level).copied()
    }

    /// The flat record handed to the runner: parameters plus the
    /// `__index_<level>`, `__index`, `__index_test`, `__test` and `__yield`
    /// keys. Parameter names starting with [`RECORD_PREFIX`] are reserved.
    pub fn to_record(&self) -> Mapping {
        let mut record = self.parameters.clone();
        for (level, index) in self.index.iter().enumerate() {
            record.insert(record_key(&format!("index_{}", level)), Value::Int(*index as i64));
        }
        record.insert(
            record_key("index"),
            Value::List(self.index.iter().map(|i| Value::Int(*i as i64)).collect()),
        );
        record.insert(record_key("index_test"), Value::Int(self.test_index as i64));
        record.insert(record_key("test"), Value::String(self.test.clone()));
        record.insert(
            record_key("yield"),
            self.yield_values.clone().map(Value::List).unwrap_or_default(),
        );
        record
    }
}

/// Prefix of the bookkeeping keys in a runner record.
pub const RECORD_PREFIX: &str = "__";

fn record_key(name: &str) -> String {
    format!("{}{}", RECORD_PREFIX, name)
}

impl Serialize for Combination {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// An element of the generated sequence. Serialized as `kind` plus the
/// payload under `step`, so a test record never shares a level with the tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum Step {
    Setup {
        scope: Scope,
        entries: Vec<SetupEntry>,
    },
    Teardown {
        scope: Scope,
        entries: Vec<SetupEntry>,
    },
    Test(Combination),
}

impl Step {
    pub fn is_setup(&self) -> bool {
        matches!(self, Step::Setup { .. })
    }

    pub fn is_teardown(&self) -> bool {
        matches!(self, Step::Teardown { .. })
    }

    pub fn as_test(&self) -> Option<&Combination> {
        match self {
            Step::Test(combination) => Some(combination),
            _ => None,
        }
    }
}

/// Expands specifications into step sequences.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Validates `spec`, extracts its skeleton and generates the sequence.
    pub fn generate(&self, spec: &Mapping) -> Result<Vec<Step>> {
        let entry_point = self.config.entry_point.as_str();
        check_validity(spec, entry_point)?;
        let skeleton = extract_skeleton(spec, entry_point)?;
        generate_sequence(&skeleton)
    }
}

/// Generates the sequence for `spec` with the default entry point `main`.
///
/// # Examples
///
/// ```rust
/// use rossa::get_combinations;
/// use rossa::value::Mapping;
///
/// let spec: Mapping = serde_yaml::from_str(
///     "main: {temperature: [25, 26, 27], test: {param: [1, 2]}}",
/// ).unwrap();
/// let steps = get_combinations(&spec).unwrap();
/// assert_eq!(steps.iter().filter(|s| s.as_test().is_some()).count(), 6);
/// assert_eq!(steps.iter().filter(|s| s.is_setup()).count(), 4);
/// assert_eq!(steps.iter().filter(|s| s.is_teardown()).count(), 4);
/// ```
pub fn get_combinations(spec: &Mapping) -> Result<Vec<Step>> {
    Generator::default().generate(spec)
}

/// Interleaves the test combinations of `skeleton` with its setup and
/// teardown boundaries.
pub fn generate_sequence(skeleton: &LoopSkeleton) -> Result<Vec<Step>> {
    let mut steps = vec![Step::Setup {
        scope: Scope::Loop,
        entries: skeleton.setups().flatten().cloned().collect(),
    }];

    let sizes: Vec<usize> = skeleton.outer_combinations.iter().map(Vec::len).collect();
    for (tuple, positions) in CartesianIndices::new(sizes).enumerate() {
        if tuple > 0 {
            push_restarts(&mut steps, skeleton, restarted_levels(&positions));
        }

        let mut outer_parameters = Mapping::new();
        for (level, &position) in positions.iter().enumerate() {
            for (name, value) in &skeleton.outer_combinations[level][position].parameters {
                outer_parameters.insert(name.clone(), value.clone());
            }
        }
        trace!(index = ?positions, "outer combination");

        for (test_index, test) in skeleton.tests.iter().enumerate() {
            push_test(&mut steps, test, test_index, &positions, &outer_parameters)?;
        }
    }

    steps.push(Step::Teardown {
        scope: Scope::Loop,
        entries: skeleton.teardowns().rev().flatten().cloned().collect(),
    });
    debug!(
        steps = steps.len(),
        levels = skeleton.depth(),
        tests = skeleton.tests.len(),
        "generated sequence"
    );
    Ok(steps)
}

/// Levels restarting at an outer tuple that is not the first: every level
/// from 1 on whose index, and the index of every level below it, is zero.
fn restarted_levels(positions: &[usize]) -> Range<usize> {
    let mut first = positions.len();
    while first > 1 && positions[first - 1] == 0 {
        first -= 1;
    }
    first..positions.len()
}

fn push_restarts(steps: &mut Vec<Step>, skeleton: &LoopSkeleton, levels: Range<usize>) {
    for level in levels.clone().rev() {
        steps.push(Step::Teardown {
            scope: Scope::Level(level),
            entries: skeleton.levels[level].teardown.clone(),
        });
    }
    for level in levels {
        steps.push(Step::Setup {
            scope: Scope::Level(level),
            entries: skeleton.levels[level].setup.clone(),
        });
    }
}

fn push_test(
    steps: &mut Vec<Step>,
    test: &LeafTest,
    test_index: usize,
    outer_index: &[usize],
    outer_parameters: &Mapping,
) -> Result<()> {
    let combinations =
        ParameterCombination::from_parameters(merge_parameters(outer_parameters, &test.parameters))
            .indexed()?;

    steps.push(Step::Setup {
        scope: Scope::Test(test_index),
        entries: test.setup.clone(),
    });
    for combination in combinations {
        let mut index = outer_index.to_vec();
        index.push(combination.index);
        steps.push(Step::Test(Combination {
            test: test.name.clone(),
            test_index,
            index,
            parameters: combination.parameters,
            yield_values: test.yield_values.clone(),
        }));
    }
    steps.push(Step::Teardown {
        scope: Scope::Test(test_index),
        entries: test.teardown.clone(),
    });
    Ok(())
}

/// Outer values are fixed; a test parameter with the same plain name takes
/// the outer parameter's place, any other test parameter is appended.
fn merge_parameters(outer: &Mapping, test: &Mapping) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = outer
        .iter()
        .map(|(name, value)| Parameter::fixed(name.clone(), value.clone()))
        .collect();
    let mut from_outer = vec![true; merged.len()];

    for (raw, value) in test {
        let parameter = Parameter::from_raw(raw, value);
        let slot = (0..from_outer.len())
            .find(|&i| from_outer[i] && merged[i].name.name == parameter.name.name);
        match slot {
            Some(i) => {
                merged[i] = parameter;
                from_outer[i] = false;
            }
            None => merged.push(parameter),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{ErrorType, RossaError};

    fn spec(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn tests_of(steps: &[Step]) -> Vec<&Combination> {
        steps.iter().filter_map(Step::as_test).collect()
    }

    fn scopes(steps: &[Step]) -> Vec<String> {
        steps
            .iter()
            .map(|step| match step {
                Step::Setup { scope, .. } => format!("S{:?}", scope),
                Step::Teardown { scope, .. } => format!("T{:?}", scope),
                Step::Test(c) => format!("{:?}", c.index),
            })
            .collect()
    }

    // Every setup must be closed by the matching teardown, innermost first.
    fn assert_balanced(steps: &[Step], depth: usize) {
        let mut open: Vec<Scope> = Vec::new();
        for step in steps {
            match step {
                Step::Setup { scope: Scope::Loop, .. } => {
                    open.extend((0..depth).map(Scope::Level));
                }
                Step::Setup { scope, .. } => open.push(*scope),
                Step::Teardown { scope: Scope::Loop, .. } => {
                    for level in (0..depth).rev() {
                        assert_eq!(open.pop(), Some(Scope::Level(level)));
                    }
                }
                Step::Teardown { scope, .. } => assert_eq!(open.pop(), Some(*scope)),
                Step::Test(_) => assert!(open.len() > depth, "test outside its bracket"),
            }
        }
        assert!(open.is_empty());
    }

    #[test]
    fn test_single_outer_level_example() {
        let steps = get_combinations(&spec(
            r#"
main:
  setup: [{hardware: initialize}]
  teardown: [{hardware: reset}]
  temperature: [25, 26, 27]
  test:
    param: [1, 2]
"#,
        ))
        .unwrap();

        let combinations = tests_of(&steps);
        assert_eq!(combinations.len(), 6);
        let indices: Vec<Vec<usize>> = combinations.iter().map(|c| c.index.clone()).collect();
        assert_eq!(
            indices,
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1], vec![2, 0], vec![2, 1]]
        );
        assert_eq!(combinations[2].parameters["temperature"], Value::Int(26));
        assert_eq!(combinations[2].parameters["param"], Value::Int(1));
        assert_eq!(steps.iter().filter(|s| s.is_setup()).count(), 4);
        assert_eq!(steps.iter().filter(|s| s.is_teardown()).count(), 4);
        assert_balanced(&steps, 1);

        let Step::Setup { scope, entries } = &steps[0] else {
            panic!("sequence must open with a setup");
        };
        assert_eq!(*scope, Scope::Loop);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_test_parameters_take_precedence() {
        let steps = get_combinations(&spec(
            r#"
main:
  corner:
    param_1#zip_corner: [1, 2, 3]
    param_2#zip_corner: [a, b, c]
    first:
      param_3: [4, 5]
    second:
      param_1: [7]
"#,
        ))
        .unwrap();
        let combinations = tests_of(&steps);
        assert!(combinations
            .iter()
            .filter(|c| c.test_index == 1)
            .all(|c| c.parameters["param_1"] == Value::Int(7)));
        let second = combinations.iter().find(|c| c.test == "second").unwrap();
        let keys: Vec<&str> = second.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["param_1", "param_2"]);
        assert_eq!(combinations.len(), 3 * 2 + 3);
    }

    #[test]
    fn test_overriding_with_a_list_sweeps_in_the_outer_position() {
        let steps = get_combinations(&spec(
            r#"
main:
  a: 1
  b: 2
  t:
    c: [x, y]
    a: [10, 20]
"#,
        ))
        .unwrap();
        let combinations = tests_of(&steps);
        let pairs: Vec<(Value, Value)> = combinations
            .iter()
            .map(|c| (c.parameters["a"].clone(), c.parameters["c"].clone()))
            .collect();
        // a keeps the outer position and therefore varies slowest
        assert_eq!(pairs[0], (Value::Int(10), Value::from("x")));
        assert_eq!(pairs[1], (Value::Int(10), Value::from("y")));
        assert_eq!(pairs[2], (Value::Int(20), Value::from("x")));
    }

    #[test]
    fn test_two_outer_levels_restart_the_inner_one() {
        let steps = get_combinations(&spec(
            r#"
main:
  setup: [{hardware: initialize}]
  teardown: [{hardware: reset}]
  temperature: [25, 26]
  corner:
    setup: [{corner: enter}]
    teardown: [{corner: leave}]
    p: [1, 2]
    test: {}
"#,
        ))
        .unwrap();
        assert_eq!(
            scopes(&steps),
            vec![
                "SLoop", "STest(0)", "[0, 0, 0]", "TTest(0)", "STest(0)", "[0, 1, 0]",
                "TTest(0)", "TLevel(1)", "SLevel(1)", "STest(0)", "[1, 0, 0]", "TTest(0)",
                "STest(0)", "[1, 1, 0]", "TTest(0)", "TLoop",
            ]
        );
        assert_balanced(&steps, 2);

        let Step::Teardown { entries, .. } = steps.last().unwrap() else {
            panic!("sequence must close with a teardown");
        };
        let closing: Vec<String> = entries
            .iter()
            .map(|e| match e {
                SetupEntry::Literal(m) => m.values().next().unwrap().to_string(),
                other => panic!("unexpected entry {:?}", other),
            })
            .collect();
        assert_eq!(closing, vec!["leave", "reset"]);
    }

    #[test]
    fn test_three_deep_restarts_follow_the_advancing_level() {
        let steps = get_combinations(&spec(
            r#"
main:
  a: [0, 1]
  b:
    x: 0
    c:
      z: [0, 1]
      test: {}
"#,
        ))
        .unwrap();
        // levels: main (2), b (1), c (2)
        let restarts: Vec<String> = scopes(&steps)
            .into_iter()
            .filter(|s| s.contains("Level"))
            .collect();
        assert_eq!(
            restarts,
            vec!["TLevel(2)", "TLevel(1)", "SLevel(1)", "SLevel(2)"]
        );
        let position = scopes(&steps)
            .iter()
            .position(|s| s == "TLevel(2)")
            .unwrap();
        assert_eq!(scopes(&steps)[position + 5], "[1, 0, 0, 0]");
        assert_balanced(&steps, 3);
    }

    #[test]
    fn test_deeper_level_advance_does_not_restart_its_parent() {
        let steps = get_combinations(&spec(
            r#"
main:
  a: [0, 1]
  b:
    y: [0, 1]
    c:
      z: [0, 1]
      test: {}
"#,
        ))
        .unwrap();
        let restarts = scopes(&steps)
            .into_iter()
            .filter(|s| s.starts_with("SLevel"))
            .count();
        // b restarts once (a advances), c restarts three times (a or b advance)
        assert_eq!(
            scopes(&steps).iter().filter(|s| *s == "SLevel(1)").count(),
            1
        );
        assert_eq!(restarts, 4);
        assert_balanced(&steps, 3);
    }

    #[test]
    fn test_yield_labels_are_inherited_or_overridden() {
        let steps = get_combinations(&spec(
            r#"
main:
  yield_values: [voltage]
  loop:
    first: {p: 1}
    second: {p: 2, yield: [current]}
    third: {p: 3, yield: ~}
"#,
        ))
        .unwrap();
        let combinations = tests_of(&steps);
        assert_eq!(combinations[0].yield_values, Some(vec![Value::from("voltage")]));
        assert_eq!(combinations[1].yield_values, Some(vec![Value::from("current")]));
        assert_eq!(combinations[2].yield_values, None);
    }

    #[test]
    fn test_leaf_setup_is_resolved_from_templates() {
        let steps = get_combinations(&spec(
            r#"
standard_test: {temperature: 20, param_1: 42}
main:
  loop:
    first:
      setup: [standard_test]
      p: [1, 2]
"#,
        ))
        .unwrap();
        let Step::Setup { scope, entries } = &steps[1] else {
            panic!("expected the test setup");
        };
        assert_eq!(*scope, Scope::Test(0));
        assert!(matches!(&entries[0], SetupEntry::Template { expansions, .. } if expansions[0]["param_1"] == Value::Int(42)));
    }

    #[test]
    fn test_generation_errors_abort_the_whole_call() {
        let err = get_combinations(&spec(
            "main: {faulty: {param_1#zip_faulty: [1, 2, 3], param_2#zip_faulty: [a, b]}}",
        ))
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Shape);

        let err = get_combinations(&spec("main: {faulty: {setup: [unknown], p: [1, 2]}}"))
            .unwrap_err();
        assert!(matches!(err, RossaError::TemplateNotFound { ref name } if name == "unknown"));
    }

    #[test]
    fn test_custom_entry_point_is_honoured() {
        let generator = Generator::new(GeneratorConfig::new("bench"));
        let steps = generator
            .generate(&spec("bench: {t: [1, 2], run: {p: 1}}"))
            .unwrap();
        assert_eq!(tests_of(&steps).len(), 2);
        assert!(get_combinations(&spec("bench: {run: {p: 1}}")).is_err());
    }

    #[test]
    fn test_record_carries_bookkeeping_keys() {
        let steps = get_combinations(&spec(
            "main: {t: [1, 2], loop: {run: {p: [3, 4], yield: [v]}}}",
        ))
        .unwrap();
        let record = tests_of(&steps)[3].to_record();
        assert_eq!(record["__index_0"], Value::Int(1));
        assert_eq!(record["__index_1"], Value::Int(0));
        assert_eq!(record["__index_2"], Value::Int(1));
        assert_eq!(
            record["__index"],
            Value::List(vec![Value::Int(1), Value::Int(0), Value::Int(1)])
        );
        assert_eq!(record["__index_test"], Value::Int(0));
        assert_eq!(record["__test"], Value::from("run"));
        assert_eq!(record["__yield"], Value::List(vec![Value::from("v")]));
        assert_eq!(tests_of(&steps)[3].level_index(2), Some(1));

        let json = serde_json::to_value(&steps[2]).unwrap();
        assert_eq!(json["kind"], "test");
        assert_eq!(json["step"]["p"], 3);
        let json = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(json["kind"], "setup");
        assert_eq!(json["step"]["scope"], "loop");
    }

    #[test]
    fn test_parameters_named_like_bookkeeping_keys_survive() {
        let steps = get_combinations(&spec(
            "main: {loop: {run: {test: [a, b], index: 5, kind: bench, yield: [v]}}}",
        ))
        .unwrap();
        let combination = tests_of(&steps)[0];
        let record = combination.to_record();
        assert_eq!(record["test"], Value::from("a"));
        assert_eq!(record["index"], Value::Int(5));
        assert_eq!(record["kind"], Value::from("bench"));
        assert_eq!(record["__test"], Value::from("run"));
        assert_eq!(record["__index"], Value::from(vec![0i64, 0, 0]));

        let json = serde_json::to_value(&steps[2]).unwrap();
        assert_eq!(json["kind"], "test");
        assert_eq!(json["step"]["kind"], "bench");
        assert_eq!(json["step"]["test"], "a");
        assert_eq!(json["step"]["index"], 5);
    }
}

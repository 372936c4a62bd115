//! A specification together with the sequence generated from it.

use std::path::Path;

use serde::Serialize;

use crate::diagnostics::Result;
use crate::loader::{load_specification, GeneratorConfig};
use crate::sequence::{generate_sequence, Combination, Step};
use crate::skeleton::{check_validity, extract_skeleton, LoopSkeleton};
use crate::value::Mapping;

/// Holds a specification unchanged next to its skeleton and step sequence.
#[derive(Debug, Clone)]
pub struct TestPlan {
    specification: Mapping,
    skeleton: LoopSkeleton,
    steps: Vec<Step>,
}

impl TestPlan {
    pub fn new(specification: Mapping) -> Result<Self> {
        Self::with_config(specification, &GeneratorConfig::default())
    }

    pub fn with_config(specification: Mapping, config: &GeneratorConfig) -> Result<Self> {
        check_validity(&specification, &config.entry_point)?;
        let skeleton = extract_skeleton(&specification, &config.entry_point)?;
        let steps = generate_sequence(&skeleton)?;
        Ok(Self {
            specification,
            skeleton,
            steps,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P, config: &GeneratorConfig) -> Result<Self> {
        Self::with_config(load_specification(path)?, config)
    }

    pub fn specification(&self) -> &Mapping {
        &self.specification
    }

    pub fn skeleton(&self) -> &LoopSkeleton {
        &self.skeleton
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    /// Test combinations only, in execution order.
    pub fn combinations(&self) -> impl Iterator<Item = &Combination> {
        self.steps.iter().filter_map(Step::as_test)
    }

    pub fn summary(&self) -> PlanSummary {
        let mut max_index = vec![0; self.skeleton.depth() + 1];
        for combination in self.combinations() {
            for (slot, index) in max_index.iter_mut().zip(&combination.index) {
                *slot = (*slot).max(*index);
            }
        }
        PlanSummary {
            levels: self.skeleton.levels.iter().map(|l| l.name.clone()).collect(),
            tests: self.skeleton.tests.iter().map(|t| t.name.clone()).collect(),
            setups: self.steps.iter().filter(|s| s.is_setup()).count(),
            teardowns: self.steps.iter().filter(|s| s.is_teardown()).count(),
            combinations: self.combinations().count(),
            max_index,
        }
    }
}

/// Counts describing a generated sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Outer level names, outermost first.
    pub levels: Vec<String>,
    /// Leaf test names in declaration order.
    pub tests: Vec<String>,
    pub setups: usize,
    pub teardowns: usize,
    pub combinations: usize,
    /// Largest value seen at each composite-index position.
    pub max_index: Vec<usize>,
}

impl PlanSummary {
    /// Every setup step has a teardown step.
    pub fn is_balanced(&self) -> bool {
        self.setups == self.teardowns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let spec: Mapping = serde_yaml::from_str(
            "main: {temperature: [25, 26, 27], test: {param: [1, 2]}}",
        )
        .unwrap();
        let plan = TestPlan::new(spec.clone()).unwrap();
        assert_eq!(plan.specification(), &spec);

        let summary = plan.summary();
        assert_eq!(summary.levels, vec!["main"]);
        assert_eq!(summary.tests, vec!["test"]);
        assert_eq!(summary.combinations, 6);
        assert_eq!(summary.setups, 4);
        assert!(summary.is_balanced());
        assert_eq!(summary.max_index, vec![2, 1]);
    }

    #[test]
    fn test_configured_entry_point() {
        let spec: Mapping = serde_yaml::from_str("bench: {run: {p: [1, 2]}}").unwrap();
        assert!(TestPlan::new(spec.clone()).is_err());
        let plan = TestPlan::with_config(spec, &GeneratorConfig::new("bench")).unwrap();
        assert_eq!(plan.into_steps().len(), 2 + 2 + 2);
    }
}

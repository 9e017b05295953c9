//! Step domain model

use crate::core::{composition::LoweredStep, state::StepState};
use std::collections::HashSet;

/// A single step in a pipeline: one run of a named task
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Name of the task this step runs
    pub task: String,

    /// List of step IDs this step depends on
    pub dependencies: Vec<String>,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    pub fn new(id: impl Into<String>, task: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            dependencies,
            state: StepState::Pending,
        }
    }

    /// Check if all dependencies completed
    pub fn dependencies_met(&self, completed_steps: &HashSet<&str>) -> bool {
        self.dependencies
            .iter()
            .all(|dep| completed_steps.contains(dep.as_str()))
    }
}

impl From<LoweredStep> for Step {
    fn from(lowered: LoweredStep) -> Self {
        Step::new(lowered.id, lowered.task, lowered.dependencies)
    }
}

//! Pipeline domain model

use crate::core::{
    composition::Composition,
    state::{ExecutionStatus, PipelineState, StepState},
    step::Step,
};
use std::collections::{HashMap, HashSet};

/// A runnable graph of steps
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Pipeline steps
    pub steps: HashMap<String, Step>,

    /// Execution state
    pub state: PipelineState,

    /// Step execution order (topological sort)
    execution_order: Vec<String>,
}

impl Pipeline {
    /// Create a pipeline from a composition
    pub fn from_composition(name: impl Into<String>, composition: &Composition) -> Self {
        Self::from_steps(name, composition.lower().into_iter().map(Step::from))
    }

    /// Create a pipeline running the given tasks one after another
    pub fn from_tasks<S: AsRef<str>>(name: impl Into<String>, tasks: &[S]) -> Self {
        Self::from_composition(name, &Composition::series_of(tasks))
    }

    pub fn from_steps(name: impl Into<String>, steps: impl IntoIterator<Item = Step>) -> Self {
        let steps: HashMap<String, Step> = steps
            .into_iter()
            .map(|step| (step.id.clone(), step))
            .collect();

        let execution_order = Self::topological_sort(&steps);

        Pipeline {
            name: name.into(),
            steps,
            state: PipelineState::new(),
            execution_order,
        }
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.get(id)
    }

    /// Get a mutable step by ID
    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.get_mut(id)
    }

    fn completed_ids(&self) -> HashSet<&str> {
        self.steps
            .values()
            .filter(|s| s.state.is_completed())
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Get steps ready to execute (dependencies completed), in execution order
    pub fn ready_steps(&self) -> Vec<&Step> {
        let completed = self.completed_ids();

        self.execution_order
            .iter()
            .filter_map(|id| self.steps.get(id))
            .filter(|s| matches!(s.state, StepState::Pending) && s.dependencies_met(&completed))
            .collect()
    }

    /// Get all currently running steps
    pub fn running_steps(&self) -> Vec<&Step> {
        self.steps
            .values()
            .filter(|s| matches!(s.state, StepState::Running { .. }))
            .collect()
    }

    /// Check if pipeline is complete
    pub fn is_complete(&self) -> bool {
        self.steps.values().all(|s| s.state.is_terminal())
    }

    /// Check if pipeline has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// Steps that ended in failure
    pub fn failed_steps(&self) -> Vec<&Step> {
        self.execution_order
            .iter()
            .filter_map(|id| self.steps.get(id))
            .filter(|s| s.state.is_failed())
            .collect()
    }

    /// Every step that depends, directly or transitively, on `step_id`
    pub fn dependents_of(&self, step_id: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let mut frontier = vec![step_id.to_string()];

        while let Some(current) = frontier.pop() {
            for id in &self.execution_order {
                let Some(step) = self.steps.get(id) else {
                    continue;
                };
                if step.dependencies.contains(&current) && !found.contains(id) {
                    found.push(id.clone());
                    frontier.push(id.clone());
                }
            }
        }

        found
    }

    /// Get execution order (topological sort)
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    /// Recount step states into the pipeline state
    pub fn update_counts(&mut self) {
        let mut completed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for step in self.steps.values() {
            match step.state {
                StepState::Completed { .. } => completed += 1,
                StepState::Failed { .. } => failed += 1,
                StepState::Skipped { .. } => skipped += 1,
                _ => {}
            }
        }
        self.state.total_steps = self.steps.len();
        self.state.completed_steps = completed;
        self.state.failed_steps = failed;
        self.state.skipped_steps = skipped;
    }

    /// Calculate topological sort of steps based on dependencies
    fn topological_sort(steps: &HashMap<String, Step>) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();

        // Sort for deterministic order
        let mut step_ids: Vec<_> = steps.keys().cloned().collect();
        step_ids.sort();

        for step_id in step_ids {
            Self::visit(&step_id, steps, &mut visited, &mut result);
        }

        result
    }

    fn visit(
        step_id: &str,
        steps: &HashMap<String, Step>,
        visited: &mut HashSet<String>,
        result: &mut Vec<String>,
    ) {
        if !visited.insert(step_id.to_string()) {
            return;
        }

        if let Some(step) = steps.get(step_id) {
            for dep in &step.dependencies {
                Self::visit(dep, steps, visited, result);
            }
            result.push(step_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskReport;
    use chrono::Utc;

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|x| x == id).unwrap()
    }

    fn complete(pipeline: &mut Pipeline, id: &str) {
        pipeline.step_mut(id).unwrap().state = StepState::Completed {
            report: TaskReport::default(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
        };
    }

    #[test]
    fn test_topological_sort() {
        let graphs = Composition::default_graphs();
        let pipeline = Pipeline::from_composition("build", &graphs["build"]);

        let order = pipeline.execution_order();
        assert_eq!(order.len(), 10);
        assert_eq!(order[0], "clean");
        assert!(position(order, "copy") < position(order, "copy-images"));
        assert!(position(order, "copy-images") < position(order, "optimize-images"));
        for id in ["styles", "html", "scripts", "svg", "sprite", "webp"] {
            assert!(position(order, "optimize-images") < position(order, id));
        }
    }

    #[test]
    fn test_ready_steps() {
        let mut pipeline = Pipeline::from_tasks("test", &["clean", "copy"]);

        let ready = pipeline.ready_steps();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, "clean");

        complete(&mut pipeline, "clean");

        let ready = pipeline.ready_steps();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, "copy");
    }

    #[test]
    fn test_parallel_branches_ready_together() {
        let graphs = Composition::default_graphs();
        let pipeline = Pipeline::from_composition("assets", &graphs["assets"]);
        assert_eq!(pipeline.ready_steps().len(), 6);
    }

    #[test]
    fn test_dependents_are_transitive() {
        let graphs = Composition::default_graphs();
        let pipeline = Pipeline::from_composition("build", &graphs["build"]);

        let dependents = pipeline.dependents_of("copy-images");
        assert_eq!(dependents.len(), 7);
        assert!(dependents.contains(&"optimize-images".to_string()));
        assert!(dependents.contains(&"sprite".to_string()));
        assert!(!dependents.contains(&"copy".to_string()));

        assert!(pipeline.dependents_of("webp").is_empty());
    }

    #[test]
    fn test_update_counts() {
        let mut pipeline = Pipeline::from_tasks("test", &["clean", "copy", "html"]);
        complete(&mut pipeline, "clean");
        pipeline.step_mut("copy").unwrap().state = StepState::Failed {
            error: "boom".to_string(),
            started_at: Utc::now(),
            failed_at: Utc::now(),
        };
        pipeline.step_mut("html").unwrap().state = StepState::Skipped {
            reason: "dependency failed".to_string(),
        };

        pipeline.update_counts();
        assert_eq!(pipeline.state.total_steps, 3);
        assert_eq!(pipeline.state.completed_steps, 1);
        assert_eq!(pipeline.state.failed_steps, 1);
        assert_eq!(pipeline.state.skipped_steps, 1);
        assert!(pipeline.is_complete());
        assert_eq!(pipeline.failed_steps()[0].id, "copy");
    }
}

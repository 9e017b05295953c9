//! Step executor - runs individual steps against the task registry

use crate::{
    core::Step,
    tasks::{TaskContext, TaskError, TaskRegistry, TaskReport},
};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info};

/// Result of executing a step
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// Step completed successfully
    Success { report: TaskReport },

    /// Step failed
    Failed { error: String },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }
}

/// Executes a single step
#[derive(Debug, Clone)]
pub struct StepExecutor {
    registry: Arc<TaskRegistry>,
    timeout: Duration,
}

impl StepExecutor {
    pub fn new(registry: Arc<TaskRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Execute a step and return the result
    pub async fn execute(&self, step: &Step, ctx: &TaskContext) -> ExecutionResult {
        info!("Executing step: {} ({})", step.id, step.task);

        match self.run_task(step, ctx).await {
            Ok(report) => {
                debug!(
                    "Step {} wrote {} files with {} warnings",
                    step.id,
                    report.outputs.len(),
                    report.warnings.len()
                );
                ExecutionResult::Success { report }
            }
            Err(e) => {
                error!("Step {} failed: {}", step.id, e);
                ExecutionResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn run_task(&self, step: &Step, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let task = self
            .registry
            .get(&step.task)
            .ok_or_else(|| TaskError::UnknownTask(step.task.clone()))?;

        match timeout(self.timeout, task.run(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(TaskError::Timeout(self.timeout.as_secs())),
        }
    }
}

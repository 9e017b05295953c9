//! Main execution engine - orchestrates the entire pipeline run

use crate::{
    core::{ExecutionStatus, Pipeline, Step, StepState},
    execution::{ExecutionResult, ExecutionScheduler, SchedulingStrategy, StepExecutor},
    tasks::{TaskContext, TaskRegistry, TaskReport},
};
use chrono::Utc;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        step_id: String,
        task: String,
    },
    StepCompleted {
        step_id: String,
        report: TaskReport,
        duration: Duration,
    },
    StepFailed {
        step_id: String,
        error: String,
    },
    StepSkipped {
        step_id: String,
        reason: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
        duration: Duration,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Errors that end a pipeline run
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Unknown task(s) in pipeline '{pipeline}': {}", tasks.join(", "))]
    UnknownTasks { pipeline: String, tasks: Vec<String> },

    #[error("Step(s) failed: {}", failed.join(", "))]
    StepsFailed { failed: Vec<String> },

    #[error("Pipeline stuck - steps {} can never run", pending.join(", "))]
    Stuck { pending: Vec<String> },
}

/// Aggregated outcome of a finished pipeline
#[derive(Debug, Clone, Default)]
pub struct ExecutionSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outputs: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl ExecutionSummary {
    /// Collect reports of completed steps in execution order
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let mut summary = Self::default();
        for step in pipeline
            .execution_order()
            .iter()
            .filter_map(|id| pipeline.step(id))
        {
            match &step.state {
                StepState::Completed { report, .. } => {
                    summary.completed += 1;
                    summary.outputs.extend(report.outputs.iter().cloned());
                    summary.warnings.extend(report.warnings.iter().cloned());
                }
                StepState::Failed { .. } => summary.failed += 1,
                StepState::Skipped { .. } => summary.skipped += 1,
                _ => {}
            }
        }
        summary
    }
}

/// Main pipeline execution engine
pub struct ExecutionEngine {
    scheduler: ExecutionScheduler,
    executor: Arc<StepExecutor>,
    event_handlers: Vec<EventHandler>,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<TaskRegistry>, strategy: SchedulingStrategy) -> Self {
        Self {
            scheduler: ExecutionScheduler::new(strategy),
            executor: Arc::new(StepExecutor::new(registry, DEFAULT_TIMEOUT)),
            event_handlers: Vec::new(),
        }
    }

    /// Replace the per-step timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let registry = self.executor.registry().clone();
        self.executor = Arc::new(StepExecutor::new(registry, timeout));
        self
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.scheduler.strategy()
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline
    pub async fn execute(
        &self,
        pipeline: &mut Pipeline,
        ctx: &TaskContext,
    ) -> Result<ExecutionSummary, ExecutionError> {
        let execution_id = pipeline.state.execution_id;
        let started = Instant::now();

        let unknown: Vec<String> = pipeline
            .execution_order()
            .iter()
            .filter_map(|id| pipeline.step(id))
            .filter(|step| !self.executor.registry().contains(&step.task))
            .map(|step| step.task.clone())
            .collect();
        if !unknown.is_empty() {
            return Err(ExecutionError::UnknownTasks {
                pipeline: pipeline.name.clone(),
                tasks: unknown,
            });
        }

        info!("Starting pipeline execution: {} ({})", pipeline.name, execution_id);
        pipeline.state.start(pipeline.steps.len());
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            total_steps: pipeline.steps.len(),
        });

        // Main execution loop
        loop {
            let batch = self.scheduler.next_steps(pipeline);
            if batch.is_empty() {
                break;
            }

            let steps: Vec<Step> = batch
                .iter()
                .filter_map(|id| pipeline.step(id).cloned())
                .collect();

            let started_at = Utc::now();
            for step in &steps {
                if let Some(s) = pipeline.step_mut(&step.id) {
                    s.state = StepState::Running { started_at };
                }
                self.emit_event(ExecutionEvent::StepStarted {
                    step_id: step.id.clone(),
                    task: step.task.clone(),
                });
            }

            let runs = steps.iter().map(|step| {
                let executor = self.executor.clone();
                async move {
                    let began = Instant::now();
                    let result = executor.execute(step, ctx).await;
                    (step.id.clone(), result, began.elapsed())
                }
            });

            for (step_id, result, duration) in join_all(runs).await {
                match result {
                    ExecutionResult::Success { report } => {
                        self.mark_step_success(pipeline, &step_id, report, started_at, duration)
                    }
                    ExecutionResult::Failed { error } => {
                        self.mark_step_failed(pipeline, &step_id, error, started_at)
                    }
                }
            }

            pipeline.update_counts();
        }

        pipeline.update_counts();
        let duration = started.elapsed();

        let pending: Vec<String> = pipeline
            .execution_order()
            .iter()
            .filter_map(|id| pipeline.step(id))
            .filter(|step| !step.state.is_terminal())
            .map(|step| step.id.clone())
            .collect();
        if !pending.is_empty() {
            error!("No steps ready to run and none running - pipeline stuck");
            pipeline.state.fail();
            self.emit_event(ExecutionEvent::PipelineCompleted {
                execution_id,
                status: ExecutionStatus::Failed,
                duration,
            });
            return Err(ExecutionError::Stuck { pending });
        }

        let failed: Vec<String> = pipeline
            .failed_steps()
            .iter()
            .map(|step| step.id.clone())
            .collect();

        let status = if failed.is_empty() {
            pipeline.state.complete();
            ExecutionStatus::Completed
        } else {
            pipeline.state.fail();
            ExecutionStatus::Failed
        };

        info!(
            "Pipeline execution finished: {} - {:?} in {:.2?}",
            pipeline.name, status, duration
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
            duration,
        });

        if failed.is_empty() {
            Ok(ExecutionSummary::from_pipeline(pipeline))
        } else {
            Err(ExecutionError::StepsFailed { failed })
        }
    }

    fn mark_step_success(
        &self,
        pipeline: &mut Pipeline,
        step_id: &str,
        report: TaskReport,
        started_at: chrono::DateTime<Utc>,
        duration: Duration,
    ) {
        if let Some(step) = pipeline.step_mut(step_id) {
            step.state = StepState::Completed {
                report: report.clone(),
                started_at,
                completed_at: Utc::now(),
            };
        }

        self.emit_event(ExecutionEvent::StepCompleted {
            step_id: step_id.to_string(),
            report,
            duration,
        });
    }

    fn mark_step_failed(
        &self,
        pipeline: &mut Pipeline,
        step_id: &str,
        error: String,
        started_at: chrono::DateTime<Utc>,
    ) {
        if let Some(step) = pipeline.step_mut(step_id) {
            step.state = StepState::Failed {
                error: error.clone(),
                started_at,
                failed_at: Utc::now(),
            };
        }

        self.emit_event(ExecutionEvent::StepFailed {
            step_id: step_id.to_string(),
            error,
        });

        for dependent in pipeline.dependents_of(step_id) {
            let Some(step) = pipeline.step_mut(&dependent) else {
                continue;
            };
            if !matches!(step.state, StepState::Pending) {
                continue;
            }

            let reason = format!("dependency '{}' failed", step_id);
            warn!("Skipping step {}: {}", dependent, reason);
            step.state = StepState::Skipped {
                reason: reason.clone(),
            };
            self.emit_event(ExecutionEvent::StepSkipped {
                step_id: dependent,
                reason,
            });
        }
    }
}

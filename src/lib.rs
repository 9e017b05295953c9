//! sitepipe - build and serve static site assets

pub mod cli;
pub mod core;
pub mod execution;
pub mod serve;
pub mod tasks;

// Re-export commonly used types
pub use core::{BuildConfig, Composition, ExecutionStatus, Pipeline, Project, ReloadKind, Step, StepState};
pub use execution::{ExecutionEngine, ExecutionError, ExecutionEvent, ExecutionSummary, SchedulingStrategy};
pub use serve::{DevServer, DevSession, ReloadHub, SourceWatcher};
pub use tasks::{AssetTask, TaskContext, TaskError, TaskRegistry, TaskReport};

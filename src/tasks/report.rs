//! Task report and error types

use crate::core::selection::SelectionError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Error types for task runs
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Failed to minify {path}: {message}")]
    Minify { path: PathBuf, message: String },

    #[error("Failed to encode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid SVG {path}: {message}")]
    Svg { path: PathBuf, message: String },

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Background job failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TaskError {
    /// Adapter for `map_err` that attaches the offending path to an I/O error
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> TaskError {
        let path = path.into();
        move |source| TaskError::Io { path, source }
    }
}

/// What a task produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Files written by the task
    pub outputs: Vec<PathBuf>,

    /// Non-fatal problems (e.g. a stylesheet that failed to compile)
    pub warnings: Vec<String>,
}

impl TaskReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_output(&mut self, path: impl Into<PathBuf>) {
        self.outputs.push(path.into());
    }

    /// Record a warning and log it
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

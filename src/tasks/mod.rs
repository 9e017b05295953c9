//! Asset tasks
//!
//! Every task reads a fixed selection from the source root, hands it to one
//! transformation library, and writes to a fixed place under the build root.

pub mod clean;
pub mod copy;
pub mod images;
pub mod markup;
pub mod report;
pub mod scripts;
pub mod sprite;
pub mod styles;

use crate::core::config::{AssetSelection, BuildConfig, Project};
use crate::core::selection::{FileSet, SelectedFile};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use clean::CleanTask;
pub use copy::CopyTask;
pub use images::{OptimizeImagesTask, WebpTask};
pub use markup::HtmlTask;
pub use report::{TaskError, TaskReport};
pub use scripts::ScriptsTask;
pub use sprite::SpriteTask;
pub use styles::StylesTask;

/// Names of the tasks every registry starts with
pub const BUILTIN_TASKS: &[&str] = &[
    "clean",
    "copy",
    "copy-images",
    "optimize-images",
    "webp",
    "styles",
    "html",
    "scripts",
    "svg",
    "sprite",
];

/// Trait for a build task - allows for different implementations
#[async_trait]
pub trait AssetTask: Send + Sync {
    /// Name the task is registered under
    fn name(&self) -> &str;

    /// Run the task once
    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError>;
}

/// Everything a task needs to locate its inputs and outputs
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub source_root: PathBuf,
    pub build_root: PathBuf,
    pub config: Arc<BuildConfig>,
}

impl TaskContext {
    pub fn new(project: &Project) -> Self {
        Self {
            source_root: project.source_root(),
            build_root: project.build_root(),
            config: Arc::new(project.config.clone()),
        }
    }

    /// Resolve a configured selection against the source root
    pub fn select(&self, selection: &AssetSelection) -> Result<Vec<SelectedFile>, TaskError> {
        Ok(FileSet::from_selection(&self.source_root, selection)?.resolve()?)
    }

    /// Output directory of a selection
    pub fn output_dir(&self, selection: &AssetSelection) -> PathBuf {
        self.build_root.join(&selection.output)
    }
}

/// Maps task names to task implementations
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn AssetTask>>,
}

impl TaskRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in task
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CleanTask));
        registry.register(Arc::new(CopyTask::static_files()));
        registry.register(Arc::new(CopyTask::images()));
        registry.register(Arc::new(CopyTask::vectors()));
        registry.register(Arc::new(OptimizeImagesTask));
        registry.register(Arc::new(WebpTask));
        registry.register(Arc::new(StylesTask));
        registry.register(Arc::new(HtmlTask));
        registry.register(Arc::new(ScriptsTask));
        registry.register(Arc::new(SpriteTask));
        registry
    }

    /// Add a task, replacing any task with the same name
    pub fn register(&mut self, task: Arc<dyn AssetTask>) {
        self.tasks.insert(task.name().to_string(), task);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AssetTask>> {
        self.tasks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered task names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.names())
            .finish()
    }
}

/// Write bytes to a file, creating parent directories
pub(crate) async fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(TaskError::io(parent))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(TaskError::io(path))
}

/// Blocking variant of [`write_output`] for use on the blocking pool
pub(crate) fn write_output_blocking(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(TaskError::io(parent))?;
    }
    std::fs::write(path, contents).map_err(TaskError::io(path))
}

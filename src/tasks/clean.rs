//! Removes the previous build output

use super::{AssetTask, TaskContext, TaskError, TaskReport};
use async_trait::async_trait;
use tracing::{debug, info};

/// Deletes the build root so every full build starts fresh
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanTask;

#[async_trait]
impl AssetTask for CleanTask {
    fn name(&self) -> &str {
        "clean"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let root = &ctx.build_root;

        let exists = tokio::fs::try_exists(root)
            .await
            .map_err(TaskError::io(root))?;
        if !exists {
            debug!("Nothing to clean at {}", root.display());
            return Ok(TaskReport::default());
        }

        tokio::fs::remove_dir_all(root)
            .await
            .map_err(TaskError::io(root))?;
        info!("Removed {}", root.display());

        Ok(TaskReport::default())
    }
}

//! Verbatim copies: static files, unprocessed images, standalone SVGs

use super::{AssetTask, TaskContext, TaskError, TaskReport};
use crate::core::config::{AssetSelection, BuildConfig};
use async_trait::async_trait;
use tracing::{debug, info};

/// Copies every file of a configured selection unchanged
#[derive(Clone, Copy)]
pub struct CopyTask {
    name: &'static str,
    selection: fn(&BuildConfig) -> &AssetSelection,
}

impl CopyTask {
    pub fn new(name: &'static str, selection: fn(&BuildConfig) -> &AssetSelection) -> Self {
        Self { name, selection }
    }

    /// Fonts, favicon and manifest
    pub fn static_files() -> Self {
        Self::new("copy", |config| &config.static_files)
    }

    /// Raster images that skip optimization
    pub fn images() -> Self {
        Self::new("copy-images", |config| &config.images.copy)
    }

    /// Standalone vector images (sprite icons excluded)
    pub fn vectors() -> Self {
        Self::new("svg", |config| &config.vectors.copy)
    }
}

#[async_trait]
impl AssetTask for CopyTask {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let selection = (self.selection)(&ctx.config);
        let out_dir = ctx.output_dir(selection);
        let files = ctx.select(selection)?;

        let mut report = TaskReport::new();
        for file in files {
            let destination = file.destination(&out_dir);
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(TaskError::io(parent))?;
            }
            tokio::fs::copy(&file.path, &destination)
                .await
                .map_err(TaskError::io(&file.path))?;
            debug!("Copied {} -> {}", file.path.display(), destination.display());
            report.push_output(destination);
        }

        info!("{}: copied {} files", self.name, report.outputs.len());
        Ok(report)
    }
}

//! JavaScript minification

use super::{write_output, AssetTask, TaskContext, TaskError, TaskReport};
use async_trait::async_trait;
use minify_js::{minify, Session, TopLevelMode};
use tracing::info;

/// Minify a classic (non-module) script
pub fn minify_script(source: &[u8]) -> Result<Vec<u8>, String> {
    let session = Session::new();
    let mut out = Vec::new();
    minify(&session, TopLevelMode::Global, source, &mut out).map_err(|e| format!("{:?}", e))?;
    Ok(out)
}

/// Minifies every selected script into the scripts output directory
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptsTask;

#[async_trait]
impl AssetTask for ScriptsTask {
    fn name(&self) -> &str {
        "scripts"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let selection = &ctx.config.scripts;
        let out_dir = ctx.output_dir(selection);

        let mut report = TaskReport::new();
        for file in ctx.select(selection)? {
            let source = tokio::fs::read(&file.path)
                .await
                .map_err(TaskError::io(&file.path))?;
            let minified = minify_script(&source).map_err(|message| TaskError::Minify {
                path: file.path.clone(),
                message,
            })?;

            let destination = file.destination(&out_dir);
            write_output(&destination, minified).await?;
            report.push_output(destination);
        }

        info!("scripts: wrote {} files", report.outputs.len());
        Ok(report)
    }
}

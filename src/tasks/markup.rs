//! HTML minification

use super::{write_output, AssetTask, TaskContext, TaskError, TaskReport};
use async_trait::async_trait;
use minify_html::Cfg;
use tracing::{debug, info};

/// Collapse whitespace in an HTML document while leaving its structure intact
pub fn minify_markup(source: &[u8], keep_comments: bool) -> Vec<u8> {
    let cfg = Cfg {
        keep_comments,
        keep_closing_tags: true,
        keep_html_and_head_opening_tags: true,
        do_not_minify_doctype: true,
        ensure_spec_compliant_unquoted_attribute_values: true,
        keep_spaces_between_attributes: true,
        ..Cfg::default()
    };
    minify_html::minify(source, &cfg)
}

/// Minifies top-level HTML pages into the build root
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTask;

#[async_trait]
impl AssetTask for HtmlTask {
    fn name(&self) -> &str {
        "html"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let selection = ctx.config.markup.selection();
        let keep_comments = ctx.config.markup.keep_comments;
        let out_dir = ctx.output_dir(&selection);

        let mut report = TaskReport::new();
        for file in ctx.select(&selection)? {
            let source = tokio::fs::read(&file.path)
                .await
                .map_err(TaskError::io(&file.path))?;
            let minified = minify_markup(&source, keep_comments);
            debug!(
                "Minified {} ({} -> {} bytes)",
                file.path.display(),
                source.len(),
                minified.len()
            );

            let destination = file.destination(&out_dir);
            write_output(&destination, minified).await?;
            report.push_output(destination);
        }

        info!("html: wrote {} pages", report.outputs.len());
        Ok(report)
    }
}

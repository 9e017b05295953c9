//! Stylesheet compilation: SCSS → prefixed, minified CSS with a source map

use super::{write_output, AssetTask, TaskContext, TaskError, TaskReport};
use crate::core::config::StylesConfig;
use async_trait::async_trait;
use codemap::SpanLoc;
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
    targets::{Browsers, Targets},
};
use parcel_sourcemap::SourceMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors from compiling a stylesheet
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("Sass compilation failed: {0}")]
    Sass(String),

    #[error("Invalid browserslist query: {0}")]
    Targets(String),

    #[error("CSS parse error: {0}")]
    Parse(String),

    #[error("CSS minification failed: {0}")]
    Minify(String),

    #[error("CSS printing failed: {0}")]
    Print(String),

    #[error("Source map generation failed: {0}")]
    SourceMap(String),
}

/// Compiled stylesheet and its optional source map JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStylesheet {
    pub css: String,
    pub map: Option<String>,
}

/// Compile an SCSS entry into minified, vendor-prefixed CSS
pub fn compile_stylesheet(
    entry: &Path,
    options: &StylesConfig,
    load_paths: &[PathBuf],
) -> Result<CompiledStylesheet, StyleError> {
    let logger = SassLogger;
    let mut sass_options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .logger(&logger);
    for path in load_paths {
        sass_options = sass_options.load_path(path);
    }

    let css = grass::from_path(entry, &sass_options).map_err(|e| StyleError::Sass(e.to_string()))?;

    let targets = browser_targets(&options.browserslist)?;
    let filename = entry
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut stylesheet = StyleSheet::parse(
        &css,
        ParserOptions {
            filename: filename.clone(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| StyleError::Parse(e.to_string()))?;

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| StyleError::Minify(e.to_string()))?;

    // grass emits no map of its own, so the map points at the compiled CSS
    let mut source_map = if options.source_map {
        let mut map = SourceMap::new("/");
        let css_name = Path::new(&filename).with_extension("css");
        let index = map.add_source(&css_name.to_string_lossy());
        map.set_source_content(index as usize, &css)
            .map_err(|e| StyleError::SourceMap(e.to_string()))?;
        Some(map)
    } else {
        None
    };
    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: source_map.as_mut(),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| StyleError::Print(e.to_string()))?;

    let map = match source_map.as_mut() {
        Some(map) => Some(
            map.to_json(None)
                .map_err(|e| StyleError::SourceMap(e.to_string()))?,
        ),
        None => None,
    };

    Ok(CompiledStylesheet {
        css: printed.code,
        map,
    })
}

fn browser_targets(queries: &[String]) -> Result<Targets, StyleError> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| StyleError::Targets(e.to_string()))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Routes grass diagnostics (`@debug`, `@warn`) through tracing
#[derive(Debug)]
struct SassLogger;

impl grass::Logger for SassLogger {
    fn debug(&self, location: SpanLoc, message: &str) {
        debug!(
            "{}:{} DEBUG: {}",
            location.file.name(),
            location.begin.line + 1,
            message
        );
    }

    fn warn(&self, location: SpanLoc, message: &str) {
        warn!(
            "Warning: {}\n    ./{}:{}:{}",
            message,
            location.file.name(),
            location.begin.line + 1,
            location.begin.column + 1
        );
    }
}

/// Compiles the entry stylesheet.
///
/// A compilation error is logged and reported as a warning; the task itself
/// still succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct StylesTask;

#[async_trait]
impl AssetTask for StylesTask {
    fn name(&self) -> &str {
        "styles"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let options = ctx.config.styles.clone();
        let entry = ctx.source_root.join(&options.entry);
        let output = ctx.build_root.join(&options.output);
        let mut report = TaskReport::new();

        if !entry.is_file() {
            report.warn(format!("Stylesheet entry {} not found", entry.display()));
            return Ok(report);
        }

        let load_paths: Vec<PathBuf> = options
            .load_paths
            .iter()
            .map(|path| ctx.source_root.join(path))
            .collect();

        let compiled = {
            let entry = entry.clone();
            tokio::task::spawn_blocking(move || compile_stylesheet(&entry, &options, &load_paths))
                .await?
        };

        let compiled = match compiled {
            Ok(compiled) => compiled,
            Err(err) => {
                error!("{}: {}", entry.display(), err);
                report.warnings.push(format!("{}: {}", entry.display(), err));
                return Ok(report);
            }
        };

        let mut css = compiled.css;
        if let Some(map) = compiled.map {
            let map_path = source_map_path(&output);
            let map_name = map_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            css.push_str(&format!("\n/*# sourceMappingURL={} */", map_name));
            write_output(&map_path, map).await?;
            report.push_output(map_path);
        }

        write_output(&output, css).await?;
        info!("styles: wrote {}", output.display());
        report.outputs.insert(0, output);

        Ok(report)
    }
}

/// `css/style.min.css` → `css/style.min.css.map`
fn source_map_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

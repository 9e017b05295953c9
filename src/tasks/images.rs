//! Raster image optimization and WebP derivatives

use super::{write_output_blocking, AssetTask, TaskContext, TaskError, TaskReport};
use crate::core::selection::SelectedFile;
use async_trait::async_trait;
use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
        webp::WebPEncoder,
    },
    DynamicImage,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of processing one image
enum Processed {
    Written(PathBuf),
    Skipped { output: Option<PathBuf>, warning: String },
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Re-encode a JPEG at the given quality
pub fn optimize_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

/// Re-encode a PNG with maximum lossless compression
pub fn optimize_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Vec::new();
    image.write_with_encoder(PngEncoder::new_with_quality(
        &mut out,
        CompressionType::Best,
        FilterType::Adaptive,
    ))?;
    Ok(out)
}

/// Encode an image as lossless WebP
pub fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let image = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let mut out = Vec::new();
    image.write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
    Ok(out)
}

fn optimize_one(file: &SelectedFile, out_dir: &Path, quality: u8) -> Result<Processed, TaskError> {
    let destination = file.destination(out_dir);
    let original = std::fs::read(&file.path).map_err(TaskError::io(&file.path))?;

    let encoded = match extension(&file.path).as_deref() {
        Some("jpg") | Some("jpeg") => {
            image::load_from_memory(&original).and_then(|img| optimize_jpeg(&img, quality))
        }
        Some("png") => image::load_from_memory(&original).and_then(|img| optimize_png(&img)),
        _ => {
            write_output_blocking(&destination, &original)?;
            return Ok(Processed::Written(destination));
        }
    };

    match encoded {
        Ok(bytes) if bytes.len() < original.len() => {
            debug!(
                "Optimized {} ({} -> {} bytes)",
                file.path.display(),
                original.len(),
                bytes.len()
            );
            write_output_blocking(&destination, &bytes)?;
            Ok(Processed::Written(destination))
        }
        Ok(_) => {
            write_output_blocking(&destination, &original)?;
            Ok(Processed::Written(destination))
        }
        Err(err) => {
            write_output_blocking(&destination, &original)?;
            Ok(Processed::Skipped {
                output: Some(destination),
                warning: format!("{}: copied unoptimized ({})", file.path.display(), err),
            })
        }
    }
}

fn webp_one(file: &SelectedFile, out_dir: &Path) -> Result<Processed, TaskError> {
    let destination = file.destination(out_dir).with_extension("webp");

    let image = match image::open(&file.path) {
        Ok(image) => image,
        Err(err) => {
            return Ok(Processed::Skipped {
                output: None,
                warning: format!("{}: cannot decode ({})", file.path.display(), err),
            })
        }
    };

    let bytes = encode_webp(&image).map_err(|source| TaskError::Image {
        path: file.path.clone(),
        source,
    })?;
    write_output_blocking(&destination, &bytes)?;
    Ok(Processed::Written(destination))
}

/// Run `process` over every file on the rayon pool and fold the results into a report
async fn process_all<F>(files: Vec<SelectedFile>, process: F) -> Result<TaskReport, TaskError>
where
    F: Fn(&SelectedFile) -> Result<Processed, TaskError> + Send + Sync + 'static,
{
    let results = tokio::task::spawn_blocking(move || {
        files
            .par_iter()
            .map(|file| process(file))
            .collect::<Vec<_>>()
    })
    .await?;

    let mut report = TaskReport::new();
    for result in results {
        match result? {
            Processed::Written(path) => report.push_output(path),
            Processed::Skipped { output, warning } => {
                if let Some(path) = output {
                    report.push_output(path);
                }
                report.warn(warning);
            }
        }
    }
    Ok(report)
}

/// Re-encodes selected JPEG and PNG images, keeping whichever file is smaller
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeImagesTask;

#[async_trait]
impl AssetTask for OptimizeImagesTask {
    fn name(&self) -> &str {
        "optimize-images"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let selection = &ctx.config.images.optimize;
        let files = ctx.select(selection)?;
        let out_dir = ctx.output_dir(selection);
        let quality = ctx.config.images.jpeg_quality;

        let report = process_all(files, move |file| optimize_one(file, &out_dir, quality)).await?;
        info!("optimize-images: wrote {} images", report.outputs.len());
        Ok(report)
    }
}

/// Writes a `.webp` sibling for every selected raster image
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpTask;

#[async_trait]
impl AssetTask for WebpTask {
    fn name(&self) -> &str {
        "webp"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let selection = &ctx.config.images.webp;
        let files = ctx.select(selection)?;
        let out_dir = ctx.output_dir(selection);

        let report = process_all(files, move |file| webp_one(file, &out_dir)).await?;
        info!("webp: wrote {} images", report.outputs.len());
        Ok(report)
    }
}

//! CLI output formatting

use crate::{
    core::{ExecutionStatus, ReloadKind},
    execution::{ExecutionEvent, ExecutionSummary},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static RELOAD: Emoji<'_, '_> = Emoji("🔄 ", "* ");

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(bar_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        progress.set_style(bar_style.progress_chars("#>-"));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Starting {} ({} steps, {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_steps,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StepStarted { step_id, .. } => {
            format!("{} {}", SPINNER, style(step_id).cyan())
        }
        ExecutionEvent::StepCompleted {
            step_id,
            report,
            duration,
        } => {
            let mut line = format!(
                "{} {} {}",
                CHECK,
                style(step_id).green(),
                style(format!("({} files, {})", report.outputs.len(), format_duration(*duration))).dim()
            );
            for warning in &report.warnings {
                line.push_str(&format!("\n   {}{}", WARN, style(warning).yellow()));
            }
            line
        }
        ExecutionEvent::StepFailed { step_id, error } => {
            format!("{} {}: {}", CROSS, style(step_id).red(), style(error).dim())
        }
        ExecutionEvent::StepSkipped { step_id, reason } => {
            format!("{} {} skipped: {}", WARN, style(step_id).yellow(), style(reason).dim())
        }
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
            duration,
        } => format!(
            "{} Pipeline ({}) {} in {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status),
            format_duration(*duration)
        ),
    }
}

/// One-line summary of a finished build
pub fn format_summary(summary: &ExecutionSummary) -> String {
    let mut line = format!(
        "{} steps, {} files written",
        style(summary.completed).cyan(),
        style(summary.outputs.len()).cyan()
    );
    if !summary.warnings.is_empty() {
        line.push_str(&format!(", {}", style(format!("{} warnings", summary.warnings.len())).yellow()));
    }
    line
}

/// Describe a reload signal
pub fn format_reload(kind: ReloadKind) -> String {
    match kind {
        ReloadKind::None => format!("{} rebuilt", CHECK),
        ReloadKind::Css => format!("{} stylesheets refreshed", RELOAD),
        ReloadKind::Full => format!("{} page reloaded", RELOAD),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

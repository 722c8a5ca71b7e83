//! CLI output formatting

use crate::core::{RunSummary, StepSnapshot, StepStatus};
use crate::ingest::{CircuitBreakerResult, Preview, ValidationReport};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a step status for display
pub fn format_status(status: StepStatus) -> String {
    match status {
        StepStatus::Pending => style("PENDING").dim().to_string(),
        StepStatus::Running => style("RUNNING").yellow().to_string(),
        StepStatus::Retry => style("RETRY").yellow().to_string(),
        StepStatus::Success => style("SUCCESS").green().to_string(),
        StepStatus::Failed => style("FAILED").red().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// One line per step result
pub fn format_step(snapshot: &StepSnapshot) -> String {
    let icon = match snapshot.status {
        StepStatus::Success => CHECK,
        StepStatus::Failed => CROSS,
        StepStatus::Skipped => SKIP,
        _ => INFO,
    };
    format!(
        "{} {} {} - {} {}",
        icon,
        style(&snapshot.step_name).cyan(),
        format_status(snapshot.status),
        snapshot.message,
        style(format!("({:.2}s)", snapshot.duration_secs)).dim()
    )
}

/// Multi-line run report
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut lines = Vec::new();
    for snapshot in &summary.results {
        lines.push(format_step(snapshot));
    }

    lines.push(String::new());
    lines.push(format!(
        "  Steps: {} executed of {} ({} succeeded, {} failed, {} skipped)",
        style(summary.executed_steps).cyan(),
        summary.total_steps,
        style(summary.successful_steps).green(),
        style(summary.failed_steps).red(),
        style(summary.skipped_steps).dim()
    ));
    lines.push(format!("  Duration: {}", style(format!("{:.2}s", summary.duration_secs)).dim()));

    for warning in &summary.warnings {
        lines.push(format!("{} {}", WARN, style(warning).yellow()));
    }
    for error in &summary.errors {
        lines.push(format!("{} {}", CROSS, style(error).red()));
    }
    if let Some(error) = &summary.error {
        lines.push(format!("{} Run aborted: {}", CROSS, style(error).red()));
    }

    lines.join("\n")
}

/// Per-column null ratios, tripped columns highlighted
pub fn format_breaker(result: &CircuitBreakerResult) -> String {
    let mut lines = vec![format!("  Circuit breaker: {}", result.message)];
    for (column, ratio) in &result.null_ratios {
        let text = format!("{:.1}%", ratio * 100.0);
        let text = if result.tripped_columns.contains(column) {
            style(text).red().to_string()
        } else {
            style(text).green().to_string()
        };
        lines.push(format!("    {:<24} {}", column, text));
    }
    lines.join("\n")
}

pub fn format_validation_report(report: &ValidationReport) -> String {
    let mut lines = Vec::new();
    if report.valid {
        lines.push(format!("{} Schema check {}", CHECK, style("passed").green()));
    } else {
        lines.push(format!("{} Schema check {}", CROSS, style("failed").red()));
    }

    if !report.missing_required_columns.is_empty() {
        lines.push(format!(
            "  Missing required columns: {}",
            style(report.missing_required_columns.join(", ")).red()
        ));
    }
    match &report.circuit_breaker {
        Some(result) => lines.push(format_breaker(result)),
        None => lines.push(format!("  Circuit breaker: {}", style("unknown").dim())),
    }
    lines.join("\n")
}

pub fn format_preview(preview: &Preview) -> String {
    let mut lines = vec![format!(
        "{} {} rows x {} columns",
        INFO,
        style(preview.shape.0).cyan(),
        style(preview.shape.1).cyan()
    )];
    for (column, dtype) in preview.columns.iter().zip(&preview.dtypes) {
        lines.push(format!("  {:<24} {}", style(column).bold(), style(dtype).dim()));
    }
    lines.push(String::new());
    lines.push(preview.rows.to_string());
    lines.join("\n")
}

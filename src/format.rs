//! Output formatting utilities for markdown and JSON.

use crate::error::{CollectionError, ErrorCode};
use crate::projection::ProjectedRow;
use crate::seed::SeedReport;
use crate::stats::{CompletionSummary, TaskStats};
use crate::types::EntityKind;
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn cell(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

/// Escape pipes so names cannot break the table.
fn escape(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Format a collection as a markdown table.
///
/// The `move` column shows which moves are available for each row.
pub fn format_rows_markdown(kind: EntityKind, rows: &[ProjectedRow]) -> String {
    let mut md = format!("# {} ({})\n\n", kind.collection(), rows.len());
    if rows.is_empty() {
        md.push_str("_No records._\n");
        return md;
    }

    md.push_str("| order | name | value | move | id |\n");
    md.push_str("|---:|---|---|---|---|\n");
    for row in rows {
        let entity = &row.entity;
        let moves = match (row.is_first, row.is_last) {
            (true, true) => "-",
            (true, false) => "down",
            (false, true) => "up",
            (false, false) => "up/down",
        };
        let mut name = escape(&entity.name);
        if entity.is_completion_status {
            name.push_str(" (completion)");
        }
        md.push_str(&format!(
            "| {} | {} | {} | {} | `{}` |\n",
            entity.order,
            name,
            escape(cell(entity.value.as_deref().or(entity.description.as_deref()))),
            moves,
            entity.id
        ));
    }
    md
}

pub fn format_summary_markdown(summary: &CompletionSummary) -> String {
    let mut md = String::from("# Completion\n\n");
    md.push_str(&format!("- **total**: {}\n", summary.total));
    md.push_str(&format!("- **completed**: {}\n", summary.completed));
    md.push_str(&format!("- **active**: {}\n", summary.active));

    if !summary.by_status.is_empty() {
        md.push_str("\n## By status\n");
        for count in &summary.by_status {
            md.push_str(&format!("- {}: {}\n", escape(&count.name), count.count));
        }
    }
    md
}

pub fn format_stats_markdown(stats: &TaskStats) -> String {
    let mut md = format_summary_markdown(&stats.completion);
    if !stats.by_priority.is_empty() {
        md.push_str("\n## By priority\n");
        for count in &stats.by_priority {
            md.push_str(&format!("- {}: {}\n", escape(&count.name), count.count));
        }
    }
    md
}

/// Render a failed command as `{"error": {"code", "message", "field"}}`.
///
/// Errors that did not come from a collection carry the `INTERNAL` code.
pub fn format_error_json(err: &anyhow::Error) -> Result<String> {
    let (code, field) = match err.downcast_ref::<CollectionError>() {
        Some(typed) => (typed.code(), typed.field()),
        None => (ErrorCode::Internal, None),
    };
    to_json(&serde_json::json!({
        "error": {
            "code": code,
            "message": format!("{err:#}"),
            "field": field,
        }
    }))
}

pub fn format_seed_markdown(report: &SeedReport) -> String {
    if report.total() == 0 {
        return "Nothing to seed: collections already populated.\n".to_string();
    }
    format!(
        "Seeded {} categories, {} priorities, {} statuses.\n",
        report.categories, report.priorities, report.statuses
    )
}

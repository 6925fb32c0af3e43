//! Plain-text rendering for the terminal front ends.

use std::fmt::Write as _;

use serde_json::Value;

use loan_analytics::{Status, StatusLevel, TableReport};

use crate::views::{Metric, PanelContent, RenderedView};

const MAX_CELL_WIDTH: usize = 40;

fn cell_text(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{cut}…")
    } else {
        text
    }
}

/// Aligned table with a header rule and a row-count footer.
pub fn render_table(columns: &[String], rows: &[Vec<Value>], total_rows: usize) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, &w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(columns));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in &cells {
        let _ = writeln!(out, "{}", line(row));
    }

    if total_rows > rows.len() {
        let _ = writeln!(out, "({} of {total_rows} rows)", rows.len());
    } else {
        let _ = writeln!(out, "({} rows)", rows.len());
    }
    out
}

pub fn render_metrics(metrics: &[Metric]) -> String {
    let width = metrics.iter().map(|m| m.label.len()).max().unwrap_or(0);
    metrics
        .iter()
        .map(|m| format!("{:<width$}  {}\n", m.label, m.value))
        .collect()
}

pub fn render_view(view: &RenderedView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", "=".repeat(view.title.chars().count()));

    for panel in &view.panels {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}  [{}]", panel.title, panel.query);
        match &panel.content {
            PanelContent::Metrics { metrics } => out.push_str(&render_metrics(metrics)),
            PanelContent::Table { result, total_rows } => {
                out.push_str(&render_table(&result.column_names(), &result.rows, *total_rows))
            }
            PanelContent::NoData => out.push_str("No data available\n"),
        }
    }
    out
}

pub fn render_status(status: &Status) -> String {
    let marker = match status.level {
        StatusLevel::Success => "ok",
        StatusLevel::Info => "info",
        StatusLevel::Warning => "warn",
        StatusLevel::Error => "error",
    };
    format!("[{marker}] {}", status.message)
}

/// `name  description` lines.
pub fn render_pairs(pairs: &[(&str, &str)]) -> String {
    let width = pairs.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(name, desc)| format!("{name:<width$}  {desc}\n"))
        .collect()
}

pub fn render_table_report(name: &str, report: &TableReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{name} ({})", report.full_name);

    match &report.columns {
        Some(cols) => {
            let first: Vec<&str> = cols.iter().take(10).map(String::as_str).collect();
            let _ = writeln!(out, "  columns:    {}", report.column_count);
            let _ = writeln!(out, "  first 10:   {}", first.join(", "));
        }
        None => {
            let _ = writeln!(out, "  columns:    could not be retrieved");
        }
    }

    let marks = |fields: &[loan_analytics::introspect::FieldPresence]| -> String {
        fields
            .iter()
            .map(|f| format!("{} {}", if f.present { "+" } else { "-" }, f.field))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    let _ = writeln!(out, "  loan:       {}", marks(&report.checklist.loan));
    let _ = writeln!(out, "  accounting: {}", marks(&report.checklist.accounting));

    match &report.sample {
        Some(sample) => {
            let _ = writeln!(out, "  sample:     {}", Value::Object(sample.first_row.clone()));
        }
        None => {
            let _ = writeln!(out, "  sample:     none");
        }
    }
    out
}

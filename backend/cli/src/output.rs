//! Result rendering and export.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};

use pdfmetrics_core::{ExtractionResult, Outcome, COLUMNS};
use pdfmetrics_extractor::RunReport;

use crate::terminal_output::{paint, render_table, Column, DIM, GREEN, RED, YELLOW};

const CONTEXT_WIDTH: usize = 60;

/// The result table as shown on the terminal.
pub fn render_results(results: &[ExtractionResult]) -> String {
    let columns: Vec<Column> = COLUMNS
        .iter()
        .map(|header| match *header {
            "Context" => Column::left(*header).max_width(CONTEXT_WIDTH),
            "Value" | "Confidence Score" => Column::right(*header),
            _ => Column::left(*header),
        })
        .collect();
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|r| {
            let mut cells: Vec<String> = r.columns().iter().map(|c| c.to_string()).collect();
            cells[1] = match r.outcome {
                Outcome::Found => paint(&r.value, GREEN),
                Outcome::NotFound => paint(&r.value, YELLOW),
                Outcome::Failed { .. } => paint(&r.value, RED),
            };
            cells
        })
        .collect();
    render_table(&columns, &rows)
}

/// One line per failed metric naming the stage and reason.
pub fn failure_lines(results: &[ExtractionResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| match &r.outcome {
            Outcome::Failed { stage, reason } => Some(format!(
                "{}: {} stage {}",
                r.metric,
                stage,
                paint(reason, DIM)
            )),
            _ => None,
        })
        .collect()
}

/// Write the result table as CSV with the display columns.
pub fn write_csv(writer: impl Write, results: &[ExtractionResult]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(COLUMNS)?;
    for result in results {
        writer.write_record(result.columns())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the report to `path`; the extension picks CSV or JSON.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let file = || {
        std::fs::File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))
    };
    match extension.as_deref() {
        Some("csv") => write_csv(file()?, &report.results),
        Some("json") => {
            serde_json::to_writer_pretty(file()?, report).context("Failed to write JSON report")
        }
        _ => bail!(
            "unsupported output format for {} (use .csv or .json)",
            path.display()
        ),
    }
}

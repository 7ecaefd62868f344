//! Metric table input.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use tracing::debug;

use pdfmetrics_core::MetricRequest;

const REQUIRED_HEADERS: [&str; 2] = ["Metric", "Unit"];

pub fn read_metrics_file(path: &Path) -> Result<Vec<MetricRequest>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open metric table: {}", path.display()))?;
    read_metrics(file).with_context(|| format!("Invalid metric table: {}", path.display()))
}

/// Parse a CSV with `Metric` and `Unit` headers. Other columns are ignored,
/// cells are trimmed, and rows with an empty metric are skipped.
pub fn read_metrics(reader: impl Read) -> Result<Vec<MetricRequest>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    for required in REQUIRED_HEADERS {
        if !headers.iter().any(|h| h == required) {
            bail!("missing required column '{required}'");
        }
    }

    let mut requests = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read CSV row")?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let request: MetricRequest = record
            .deserialize(Some(&headers))
            .with_context(|| format!("Malformed row at line {line}"))?;
        if request.metric.is_empty() {
            debug!(line, "Skipping row without a metric");
            continue;
        }
        requests.push(request);
    }
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_in_order() {
        let csv = "Metric,Unit\nRevenue,USD million\nHeadcount,employees\n";
        let requests = read_metrics(csv.as_bytes()).unwrap();
        assert_eq!(
            requests,
            vec![
                MetricRequest::new("Revenue", "USD million"),
                MetricRequest::new("Headcount", "employees"),
            ]
        );
    }

    #[test]
    fn trims_and_skips_blank_rows() {
        let csv = "Metric,Unit\n  Revenue ,  USD \n\n , \nScope 1 emissions,tCO2e\n";
        let requests = read_metrics(csv.as_bytes()).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], MetricRequest::new("Revenue", "USD"));
        assert_eq!(requests[1].metric, "Scope 1 emissions");
    }

    #[test]
    fn ignores_extra_columns() {
        let csv = "Category,Metric,Unit,Notes\nFinance,Revenue,USD,audited\n";
        let requests = read_metrics(csv.as_bytes()).unwrap();
        assert_eq!(requests, vec![MetricRequest::new("Revenue", "USD")]);
    }

    #[test]
    fn missing_unit_column_is_rejected() {
        let err = read_metrics("Metric\nRevenue\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Unit"));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        std::fs::write(&path, "Metric,Unit\nEBITDA,EUR\n").unwrap();

        let requests = read_metrics_file(&path).unwrap();
        assert_eq!(requests, vec![MetricRequest::new("EBITDA", "EUR")]);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_metrics_file(Path::new("/nonexistent/metrics.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/metrics.csv"));
    }
}

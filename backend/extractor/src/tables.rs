//! Typed views of the JSON tables each stage must answer with.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// The reply parsed as JSON but is not the table the stage asked for.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("response does not match the {table} shape: {reason}")]
    Shape { table: &'static str, reason: String },

    #[error("{0} is empty")]
    Empty(&'static str),
}

/// A stage's top-level response object holding one table.
pub trait StageTable: DeserializeOwned {
    type Row;
    /// Key of the table in the response object.
    const KEY: &'static str;

    fn into_rows(self) -> Vec<Self::Row>;
}

/// Deserialize `value` as `T` and return its first row. Further rows are dropped.
pub fn first_row<T: StageTable>(value: Value) -> Result<T::Row, TableError> {
    let table: T = serde_json::from_value(value).map_err(|e| TableError::Shape {
        table: T::KEY,
        reason: e.to_string(),
    })?;
    let mut rows = table.into_rows().into_iter();
    let first = rows.next().ok_or(TableError::Empty(T::KEY))?;
    let ignored = rows.count();
    if ignored > 0 {
        debug!(table = T::KEY, ignored, "Ignoring extra rows after the first");
    }
    Ok(first)
}

#[derive(Debug, Deserialize)]
pub struct MetricsTable {
    pub metrics_table: Vec<MetricsRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetricsRow {
    #[serde(rename = "Metric", deserialize_with = "cell")]
    pub metric: String,
    #[serde(rename = "Value", deserialize_with = "cell")]
    pub value: String,
    #[serde(rename = "Unit", deserialize_with = "cell")]
    pub unit: String,
    #[serde(rename = "Time Period", default, deserialize_with = "cell")]
    pub time_period: String,
}

impl StageTable for MetricsTable {
    type Row = MetricsRow;
    const KEY: &'static str = "metrics_table";

    fn into_rows(self) -> Vec<MetricsRow> {
        self.metrics_table
    }
}

#[derive(Debug, Deserialize)]
pub struct ContextTable {
    pub context_table: Vec<ContextRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContextRow {
    #[serde(rename = "Context", deserialize_with = "cell")]
    pub context: String,
}

impl StageTable for ContextTable {
    type Row = ContextRow;
    const KEY: &'static str = "context_table";

    fn into_rows(self) -> Vec<ContextRow> {
        self.context_table
    }
}

#[derive(Debug, Deserialize)]
pub struct PageTable {
    pub page_table: Vec<PageRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageRow {
    #[serde(rename = "Page Number(s)", deserialize_with = "cell")]
    pub pages: String,
    #[serde(rename = "Confidence Score", deserialize_with = "cell")]
    pub confidence: String,
}

impl StageTable for PageTable {
    type Row = PageRow;
    const KEY: &'static str = "page_table";

    fn into_rows(self) -> Vec<PageRow> {
        self.page_table
    }
}

/// Read a table cell as text. Numbers keep their JSON spelling, `null` is
/// empty, and lists (several pages) are joined with ", ".
fn cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    render_cell(&value).ok_or_else(|| de::Error::custom("expected a string, number, or list"))
}

fn render_cell(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(items) => items
            .iter()
            .map(render_cell)
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(", ")),
        Value::Object(_) => None,
    }
}

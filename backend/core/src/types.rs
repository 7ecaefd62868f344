use std::fmt;

use serde::{Deserialize, Serialize};

/// Value reported when the document does not contain the metric.
pub const NOT_FOUND: &str = "Not Found";
/// Placeholder for fields that have no meaning on a result without a value.
pub const NOT_APPLICABLE: &str = "N/A";
/// Value reported when a stage gave up before producing structured output.
pub const EXTRACTION_FAILED: &str = "Extraction Failed";

/// Output table columns, in display order.
pub const COLUMNS: [&str; 6] = [
    "Metric",
    "Value",
    "Unit",
    "Page Number(s)",
    "Context",
    "Confidence Score",
];

/// One row of the user's metric table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRequest {
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Unit")]
    pub unit: String,
}

impl MetricRequest {
    pub fn new(metric: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            unit: unit.into(),
        }
    }
}

/// The reporting period every metric in a run is extracted for (e.g. "2023").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimePeriod(String);

impl TimePeriod {
    pub fn new(period: impl Into<String>) -> Self {
        Self(period.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three extraction steps run for each metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ValueUnit,
    Context,
    PageLocation,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValueUnit => "value_unit",
            Self::Context => "context",
            Self::PageLocation => "page_location",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a metric's extraction ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Found,
    NotFound,
    Failed { stage: Stage, reason: String },
}

/// One output row. Build it through the constructors so that rows without a
/// value never carry a page, context, or confidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Page Number(s)")]
    pub pages: String,
    #[serde(rename = "Context")]
    pub context: String,
    #[serde(rename = "Confidence Score")]
    pub confidence: String,
    #[serde(rename = "Outcome")]
    pub outcome: Outcome,
}

impl ExtractionResult {
    pub fn found(
        metric: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
        pages: impl Into<String>,
        context: impl Into<String>,
        confidence: impl Into<String>,
    ) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
            unit: unit.into(),
            pages: pages.into(),
            context: context.into(),
            confidence: confidence.into(),
            outcome: Outcome::Found,
        }
    }

    pub fn not_found(metric: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::without_value(metric, NOT_FOUND, unit, Outcome::NotFound)
    }

    pub fn failed(
        metric: impl Into<String>,
        unit: impl Into<String>,
        stage: Stage,
        reason: impl Into<String>,
    ) -> Self {
        let outcome = Outcome::Failed {
            stage,
            reason: reason.into(),
        };
        Self::without_value(metric, EXTRACTION_FAILED, unit, outcome)
    }

    fn without_value(
        metric: impl Into<String>,
        value: &str,
        unit: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            metric: metric.into(),
            value: value.to_string(),
            unit: unit.into(),
            pages: NOT_APPLICABLE.to_string(),
            context: NOT_APPLICABLE.to_string(),
            confidence: NOT_APPLICABLE.to_string(),
            outcome,
        }
    }

    pub fn is_found(&self) -> bool {
        self.outcome == Outcome::Found
    }

    /// Table cells in [`COLUMNS`] order.
    pub fn columns(&self) -> [&str; 6] {
        [
            self.metric.as_str(),
            self.value.as_str(),
            self.unit.as_str(),
            self.pages.as_str(),
            self.context.as_str(),
            self.confidence.as_str(),
        ]
    }
}

//! Per-metric orchestration: value/unit, then context, then page location.

use std::sync::Arc;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use pdfmetrics_assistant::with_assistant;
use pdfmetrics_core::{AssistantError, ExtractionResult, MetricRequest, Stage, TimePeriod};
use pdfmetrics_logging::redact_sensitive_data;

use crate::context::RunContext;
use crate::json_block::extract_json;
use crate::prompts::{self, StagePrompt};
use crate::tables::{first_row, ContextTable, MetricsTable, PageTable, StageTable, TableError};

/// Why a single stage attempt produced nothing usable.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("remote call failed: {0}")]
    Remote(#[from] AssistantError),

    #[error("response contained no fenced JSON block")]
    NoJson,

    #[error(transparent)]
    Table(#[from] TableError),
}

impl AttemptError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_transient(),
            Self::NoJson | Self::Table(_) => true,
        }
    }
}

/// A stage that gave up.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct StageFailure {
    pub attempts: u32,
    pub last: AttemptError,
}

/// Runs the three-stage extraction for one metric at a time.
pub struct MetricPipeline {
    ctx: Arc<RunContext>,
}

impl MetricPipeline {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self { ctx }
    }

    /// Extract one metric. Never fails: a stage that gives up yields an
    /// "Extraction Failed" row.
    pub async fn extract(&self, request: &MetricRequest, period: &TimePeriod) -> ExtractionResult {
        let document = &self.ctx.document().file_name;

        let prompt = prompts::value_unit(&request.metric, &request.unit, period, document);
        let found = match self.run_stage::<MetricsTable>(&prompt).await {
            Ok(row) => row,
            Err(failure) => {
                return self.failed(&request.metric, &request.unit, Stage::ValueUnit, failure)
            }
        };

        let value = found.value.trim().to_string();
        if value.is_empty() {
            info!(metric = %found.metric, "Metric not found in document");
            return ExtractionResult::not_found(found.metric, found.unit);
        }
        debug!(metric = %found.metric, value = %value, unit = %found.unit, "Value extracted");

        let prompt = prompts::context(&found.metric, &value, &found.unit, period);
        let context = match self.run_stage::<ContextTable>(&prompt).await {
            Ok(row) => row.context,
            Err(failure) => return self.failed(&found.metric, &found.unit, Stage::Context, failure),
        };

        let prompt = prompts::page_location(&found.metric, &value, &found.unit, &context);
        let page = match self.run_stage::<PageTable>(&prompt).await {
            Ok(row) => row,
            Err(failure) => {
                return self.failed(&found.metric, &found.unit, Stage::PageLocation, failure)
            }
        };

        info!(
            metric = %found.metric,
            pages = %page.pages,
            confidence = %page.confidence,
            "Metric extracted"
        );
        ExtractionResult::found(
            found.metric,
            value,
            found.unit,
            page.pages,
            context,
            page.confidence,
        )
    }

    fn failed(
        &self,
        metric: &str,
        unit: &str,
        stage: Stage,
        failure: StageFailure,
    ) -> ExtractionResult {
        warn!(metric, stage = %stage, error = %failure, "Stage failed");
        ExtractionResult::failed(metric, unit, stage, failure.to_string())
    }

    /// Run one stage until its table parses or the retry policy gives up.
    /// Each attempt gets a fresh assistant and thread.
    async fn run_stage<T: StageTable>(&self, prompt: &StagePrompt) -> Result<T::Row, StageFailure> {
        let backend = self.ctx.backend();
        let settings = self.ctx.settings();
        let policy = &settings.retry;
        let spec = self.ctx.assistant_spec(prompt);
        let stage = prompt.stage;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = with_assistant(backend, &spec, settings.cleanup, |assistant| async move {
                let response = settings
                    .session
                    .submit(backend, &assistant, &prompt.user_prompt)
                    .await?;
                parse_response::<T>(&response)
            })
            .await;

            let error = match outcome {
                Ok(Ok(row)) => {
                    debug!(stage = %stage, attempt, "Stage succeeded");
                    return Ok(row);
                }
                Ok(Err(e)) => e,
                Err(e) => AttemptError::Remote(e),
            };

            if !error.is_retryable() || !policy.should_retry(attempt) {
                return Err(StageFailure {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = policy.delay_for(attempt);
            warn!(
                stage = %stage,
                attempt,
                max = policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Stage attempt failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

fn parse_response<T: StageTable>(response: &str) -> Result<T::Row, AttemptError> {
    debug!(table = T::KEY, response = %redact_sensitive_data(response), "Stage response");
    let value = extract_json(response).ok_or(AttemptError::NoJson)?;
    Ok(first_row::<T>(value)?)
}

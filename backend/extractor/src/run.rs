//! Run driver: extract every requested metric and assemble the ordered table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info};
use uuid::Uuid;

use pdfmetrics_core::{ExtractionResult, MetricRequest, Outcome, Stage, TimePeriod};

use crate::context::RunContext;
use crate::pipeline::MetricPipeline;

/// Sent after each metric completes.
#[derive(Debug, Clone)]
pub struct RunProgress {
    pub completed: usize,
    pub total: usize,
    /// Position of the finished metric in the input table.
    pub index: usize,
    pub metric: String,
    pub outcome: Outcome,
}

impl RunProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// The finished table plus run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub document: String,
    pub period: TimePeriod,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ExtractionResult>,
}

impl RunReport {
    pub fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Extracts a list of metrics against one registered document.
pub struct ExtractionRun {
    ctx: Arc<RunContext>,
}

impl ExtractionRun {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self { ctx }
    }

    /// Extract every request. The report holds exactly one row per request,
    /// in input order, however many metrics run at once.
    pub async fn execute(
        &self,
        requests: &[MetricRequest],
        period: &TimePeriod,
        progress: Option<mpsc::Sender<RunProgress>>,
    ) -> RunReport {
        let started_at = Utc::now();
        let concurrency = self.ctx.settings().concurrency.max(1);
        info!(
            run_id = %self.ctx.run_id(),
            metrics = requests.len(),
            period = %period,
            concurrency,
            "Starting extraction run"
        );

        let pipeline = Arc::new(MetricPipeline::new(Arc::clone(&self.ctx)));
        let results = if concurrency == 1 {
            self.sequential(&pipeline, requests, period, progress.as_ref())
                .await
        } else {
            self.concurrent(&pipeline, requests, period, concurrency, progress.as_ref())
                .await
        };

        let report = RunReport {
            run_id: self.ctx.run_id(),
            document: self.ctx.document().file_name.clone(),
            period: period.clone(),
            started_at,
            finished_at: Utc::now(),
            results,
        };
        info!(
            run_id = %report.run_id,
            found = report.count(|o| *o == Outcome::Found),
            not_found = report.count(|o| *o == Outcome::NotFound),
            failed = report.count(|o| matches!(o, Outcome::Failed { .. })),
            "Extraction run finished"
        );
        report
    }

    async fn sequential(
        &self,
        pipeline: &MetricPipeline,
        requests: &[MetricRequest],
        period: &TimePeriod,
        progress: Option<&mpsc::Sender<RunProgress>>,
    ) -> Vec<ExtractionResult> {
        let mut results = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let result = pipeline.extract(request, period).await;
            report_progress(progress, index, results.len() + 1, requests.len(), &result).await;
            results.push(result);
        }
        results
    }

    async fn concurrent(
        &self,
        pipeline: &Arc<MetricPipeline>,
        requests: &[MetricRequest],
        period: &TimePeriod,
        concurrency: usize,
        progress: Option<&mpsc::Sender<RunProgress>>,
    ) -> Vec<ExtractionResult> {
        let total = requests.len();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut join_set = JoinSet::new();

        for (index, request) in requests.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(pipeline);
            let period = period.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = pipeline.extract(&request, &period).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<ExtractionResult>> = vec![None; total];
        let mut completed = 0;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => {
                    completed += 1;
                    report_progress(progress, index, completed, total, &result).await;
                    slots[index] = Some(result);
                }
                Err(e) => error!(error = %e, "Metric task failed"),
            }
        }

        slots
            .into_iter()
            .zip(requests)
            .enumerate()
            .map(|(index, (slot, request))| {
                slot.unwrap_or_else(|| {
                    let lost = ExtractionResult::failed(
                        &request.metric,
                        &request.unit,
                        Stage::ValueUnit,
                        "extraction task aborted",
                    );
                    error!(index, metric = %request.metric, "No result for metric");
                    lost
                })
            })
            .collect()
    }
}

async fn report_progress(
    progress: Option<&mpsc::Sender<RunProgress>>,
    index: usize,
    completed: usize,
    total: usize,
    result: &ExtractionResult,
) {
    info!(metric = %result.metric, completed, total, "Metric complete");
    if let Some(tx) = progress {
        let _ = tx
            .send(RunProgress {
                completed,
                total,
                index,
                metric: result.metric.clone(),
                outcome: result.outcome.clone(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use pdfmetrics_assistant::{Reply, ScriptCall, ScriptedBackend};
    use pdfmetrics_core::NOT_FOUND;

    use crate::pipeline::tests::{
        context_for, fast_settings, CONTEXT_ASSISTANT, PAGE_ASSISTANT, VALUE_ASSISTANT,
    };

    /// Finds every metric except those whose name starts with "Missing".
    fn catalogue_model(call: &ScriptCall) -> Reply {
        match call.assistant.name.as_str() {
            VALUE_ASSISTANT => {
                let metric = call
                    .prompt
                    .split("**")
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                let value = if metric.starts_with("Missing") { "" } else { "42" };
                Reply::fenced(&format!(
                    r#"{{"metrics_table": [{{"Metric": "{metric}", "Value": "{value}", "Unit": "units", "Time Period": "2023"}}]}}"#
                ))
            }
            CONTEXT_ASSISTANT => Reply::fenced(r#"{"context_table": [{"Context": "reported"}]}"#),
            PAGE_ASSISTANT => Reply::fenced(
                r#"{"page_table": [{"Page Number(s)": ["3", "4"], "Confidence Score": "80"}]}"#,
            ),
            other => panic!("unexpected assistant {other}"),
        }
    }

    fn requests(names: &[&str]) -> Vec<MetricRequest> {
        names.iter().map(|n| MetricRequest::new(*n, "units")).collect()
    }

    #[tokio::test]
    async fn one_row_per_request_in_order() {
        let backend = Arc::new(ScriptedBackend::new().with_responder(catalogue_model));
        let run = ExtractionRun::new(context_for(backend, fast_settings(3)));
        let names = ["Revenue", "Missing Margin", "EBITDA", "Headcount"];

        let report = run
            .execute(&requests(&names), &TimePeriod::new("2023"), None)
            .await;

        let metrics: Vec<_> = report.results.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(metrics, names);
        assert_eq!(report.results[1].value, NOT_FOUND);
        assert_eq!(report.results[2].pages, "3, 4");
        assert_eq!(report.count(|o| *o == Outcome::Found), 3);
        assert_eq!(report.document, "annual-report.pdf");
    }

    #[tokio::test]
    async fn concurrent_run_keeps_input_order() {
        let backend = Arc::new(ScriptedBackend::new().with_responder(catalogue_model));
        let mut settings = fast_settings(3);
        settings.concurrency = 4;
        let run = ExtractionRun::new(context_for(backend, settings));
        let names: Vec<String> = (0..12)
            .map(|i| if i % 3 == 0 { format!("Missing {i}") } else { format!("Metric {i}") })
            .collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let report = run
            .execute(&requests(&names), &TimePeriod::new("2023"), None)
            .await;

        assert_eq!(report.results.len(), names.len());
        for (row, name) in report.results.iter().zip(&names) {
            assert_eq!(row.metric, *name);
            assert_eq!(row.value == NOT_FOUND, name.starts_with("Missing"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (gauge, high) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let backend = Arc::new(ScriptedBackend::new().with_responder(move |call: &ScriptCall| {
            let now = gauge.fetch_add(1, Ordering::SeqCst) + 1;
            high.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            gauge.fetch_sub(1, Ordering::SeqCst);
            catalogue_model(call)
        }));
        let mut settings = fast_settings(3);
        settings.concurrency = 2;
        let run = ExtractionRun::new(context_for(backend, settings));

        let report = run
            .execute(
                &requests(&["A", "B", "C", "D", "E", "F"]),
                &TimePeriod::new("2023"),
                None,
            )
            .await;

        assert_eq!(report.results.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn reports_progress_after_each_metric() {
        let backend = Arc::new(ScriptedBackend::new().with_responder(catalogue_model));
        let run = ExtractionRun::new(context_for(backend, fast_settings(3)));
        let (tx, mut rx) = mpsc::channel(16);

        run.execute(
            &requests(&["Revenue", "Missing Margin", "EBITDA"]),
            &TimePeriod::new("2023"),
            Some(tx),
        )
        .await;

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        let fractions: Vec<f64> = updates.iter().map(RunProgress::fraction).collect();
        assert_eq!(updates.len(), 3);
        assert!((fractions[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!((fractions[2] - 1.0).abs() < 1e-9);
        assert_eq!(updates[1].outcome, Outcome::NotFound);
        assert_eq!(updates[1].index, 1);
    }

    #[tokio::test]
    async fn empty_request_list_yields_empty_table() {
        let backend = Arc::new(ScriptedBackend::new());
        let run = ExtractionRun::new(context_for(backend.clone(), fast_settings(3)));

        let report = run.execute(&[], &TimePeriod::new("2023"), None).await;
        assert!(report.results.is_empty());
        assert!(backend.calls().is_empty());
    }
}

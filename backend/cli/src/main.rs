mod input;
mod output;
mod settings;
mod terminal_output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

use pdfmetrics_config::{
    load_and_prepare, redact, resolve_config_path, PipelineConfig, ValidationReport,
};
use pdfmetrics_core::{AssistantBackend, ExtractError, Outcome, TimePeriod};
use pdfmetrics_extractor::{ExtractionRun, RunContext, RunProgress};
use pdfmetrics_logging::init_logger;

use settings::Overrides;
use terminal_output::{note_error, note_info, note_success, note_warn, paint, DIM};

#[derive(Parser)]
#[command(name = "pdfmetrics")]
#[command(about = "Extract metric values, context, and page references from PDF reports")]
#[command(version)]
struct Cli {
    /// Config file (default: $PDFMETRICS_CONFIG_DIR/config.yaml or ~/.pdfmetrics/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every metric in a CSV table from a PDF
    Extract {
        /// The PDF document to search
        #[arg(long)]
        pdf: PathBuf,
        /// CSV with `Metric` and `Unit` columns
        #[arg(long)]
        metrics: PathBuf,
        /// Reporting period, e.g. "2023" or "FY2022/23"
        #[arg(long)]
        period: String,
        /// Write the results to a .csv table or a .json run report
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Metrics extracted at the same time
        #[arg(long)]
        concurrency: Option<usize>,
        /// Keep remote assistants, threads, and the uploaded document
        #[arg(long)]
        no_cleanup: bool,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with secrets masked
    Show,
    /// Validate the config and report problems
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        note_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref());
    let prepared = load_and_prepare(&config_path).await?;
    let config = prepared.config;
    init_logger(&settings::log_settings(&config));
    print_findings(&prepared.report);

    match cli.command {
        Commands::Extract {
            pdf,
            metrics,
            period,
            output,
            concurrency,
            no_cleanup,
        } => {
            if !prepared.report.is_valid() {
                bail!("refusing to run with an invalid config");
            }
            let overrides = Overrides {
                concurrency,
                no_cleanup,
            };
            let backend: Arc<dyn AssistantBackend> = Arc::new(settings::backend(&config));
            extract(
                &config,
                &overrides,
                backend,
                &pdf,
                &metrics,
                period,
                output.as_deref(),
            )
            .await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => show_config(&config, &config_path),
            ConfigAction::Check => check_config(&prepared.report, &config_path),
        },
    }
}

fn print_findings(report: &ValidationReport) {
    for warning in &report.warnings {
        note_warn(&warning.to_string());
    }
    for error in &report.errors {
        note_error(&error.to_string());
    }
}

async fn extract(
    config: &PipelineConfig,
    overrides: &Overrides,
    backend: Arc<dyn AssistantBackend>,
    pdf: &Path,
    metrics: &Path,
    period: String,
    output: Option<&Path>,
) -> Result<()> {
    let period = TimePeriod::new(period.trim());
    if period.as_str().is_empty() {
        return Err(ExtractError::Input("--period cannot be empty".into()).into());
    }
    let requests = input::read_metrics_file(metrics)?;
    if requests.is_empty() {
        note_warn("The metric table has no rows; nothing to extract");
        return Ok(());
    }

    let bytes = tokio::fs::read(pdf)
        .await
        .with_context(|| format!("Failed to read PDF: {}", pdf.display()))?;
    let file_name = pdf
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf")
        .to_string();

    let run_settings = settings::run_settings(config, overrides);

    note_info(&format!("Uploading {file_name} and waiting for indexing..."));
    let ctx = Arc::new(RunContext::open(backend, run_settings, &file_name, bytes).await?);
    info!(run_id = %ctx.run_id(), metrics = requests.len(), "Document ready");

    let (tx, rx) = mpsc::channel(32);
    let printer = tokio::spawn(print_progress(rx));
    let report = ExtractionRun::new(Arc::clone(&ctx))
        .execute(&requests, &period, Some(tx))
        .await;
    if let Err(e) = printer.await {
        warn!(error = %e, "Progress printer stopped early");
    }
    ctx.close().await;

    println!("{}", output::render_results(&report.results));
    let failures = output::failure_lines(&report.results);
    for line in &failures {
        note_warn(line);
    }

    if let Some(path) = output {
        output::write_report(path, &report)?;
        note_success(&format!("Wrote results to {}", path.display()));
    }

    let found = report.count(|o| *o == Outcome::Found);
    let summary = format!(
        "{found}/{} metrics found for {}",
        report.results.len(),
        report.period
    );
    if failures.is_empty() {
        note_success(&summary);
    } else {
        note_warn(&format!("{summary}; {} failed", failures.len()));
    }
    Ok(())
}

async fn print_progress(mut rx: mpsc::Receiver<RunProgress>) {
    while let Some(progress) = rx.recv().await {
        let status = match &progress.outcome {
            Outcome::Found => "found",
            Outcome::NotFound => "not found",
            Outcome::Failed { .. } => "failed",
        };
        eprintln!(
            "[{}/{}] {:>3.0}% {} {}",
            progress.completed,
            progress.total,
            progress.fraction() * 100.0,
            progress.metric,
            paint(status, DIM)
        );
    }
}

fn show_config(config: &PipelineConfig, path: &Path) -> Result<()> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    let yaml = serde_yaml::to_string(&redact(&value)).context("Failed to render config")?;
    note_info(&format!("Config file: {}", path.display()));
    print!("{yaml}");
    Ok(())
}

fn check_config(report: &ValidationReport, path: &Path) -> Result<()> {
    if !report.is_valid() {
        bail!("{} has {} error(s)", path.display(), report.errors.len());
    }
    note_success(&format!("{} is valid", path.display()));
    Ok(())
}

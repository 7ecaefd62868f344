//! Config validation with path-qualified messages.

use crate::schema::PipelineConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &PipelineConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_openai(config, &mut report);
    validate_models(config, &mut report);
    validate_sampling(config, &mut report);
    validate_polling(config, &mut report);
    validate_retry(config, &mut report);
    validate_run(config, &mut report);
    report
}

fn validate_openai(config: &PipelineConfig, report: &mut ValidationReport) {
    let openai = &config.openai;
    if openai.api_key.trim().is_empty() {
        report.error(
            "openai.apiKey",
            "API key is empty; set it in the config or export OPENAI_API_KEY",
        );
    }
    if !openai.base_url.starts_with("http://") && !openai.base_url.starts_with("https://") {
        report.error("openai.baseUrl", format!("'{}' is not an http(s) URL", openai.base_url));
    }
}

fn validate_models(config: &PipelineConfig, report: &mut ValidationReport) {
    let models = &config.models;
    for (path, model) in [
        ("models.valueUnit", &models.value_unit),
        ("models.context", &models.context),
        ("models.pageLocation", &models.page_location),
    ] {
        if model.trim().is_empty() {
            report.error(path, "Model name cannot be empty");
        }
    }
}

fn validate_sampling(config: &PipelineConfig, report: &mut ValidationReport) {
    let sampling = &config.sampling;
    if !(0.0..=2.0).contains(&sampling.temperature) {
        report.error("sampling.temperature", "temperature must be within 0..=2");
    }
    if !(0.0..=1.0).contains(&sampling.top_p) {
        report.error("sampling.topP", "topP must be within 0..=1");
    }
    if sampling.temperature > 0.5 {
        report.warn(
            "sampling.temperature",
            "High temperature makes extracted values less reproducible",
        );
    }
}

fn validate_polling(config: &PipelineConfig, report: &mut ValidationReport) {
    let polling = &config.polling;
    if polling.interval_ms == 0 {
        report.error("polling.intervalMs", "intervalMs must be > 0");
    }
    if polling.request_timeout_secs == 0 {
        report.error("polling.requestTimeoutSecs", "requestTimeoutSecs must be > 0");
    }
    if polling.run_timeout_secs == 0 {
        report.warn("polling.runTimeoutSecs", "Runs will be awaited without a time limit");
    }
    if polling.indexing_timeout_secs == 0 {
        report.error("polling.indexingTimeoutSecs", "indexingTimeoutSecs must be > 0");
    }
}

fn validate_retry(config: &PipelineConfig, report: &mut ValidationReport) {
    let retry = &config.retry;
    if retry.max_attempts == 0 {
        report.error("retry.maxAttempts", "maxAttempts must be >= 1");
    }
    if retry.backoff_factor < 1.0 {
        report.error("retry.backoffFactor", "backoffFactor must be >= 1");
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        report.warn("retry.maxDelayMs", "maxDelayMs is below baseDelayMs; every delay is capped");
    }
}

fn validate_run(config: &PipelineConfig, report: &mut ValidationReport) {
    let run = &config.run;
    if run.concurrency == 0 {
        report.error("run.concurrency", "concurrency must be >= 1");
    } else if run.concurrency > 16 {
        report.warn(
            "run.concurrency",
            format!("{} concurrent metrics may hit API rate limits", run.concurrency),
        );
    }
    if run.vector_store_name.trim().is_empty() {
        report.error("run.vectorStoreName", "vectorStoreName cannot be empty");
    }
    if !run.cleanup {
        report.warn("run.cleanup", "Remote assistants and uploads will be left behind");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.openai.api_key = "sk-test".into();
        config
    }

    #[test]
    fn defaults_with_key_are_valid() {
        let report = validate(&keyed());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn empty_api_key_is_error() {
        let report = validate(&PipelineConfig::default());
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "openai.apiKey");
    }

    #[test]
    fn out_of_range_values_are_errors() {
        let mut config = keyed();
        config.run.concurrency = 0;
        config.sampling.temperature = 2.5;
        config.sampling.top_p = 1.5;
        config.retry.max_attempts = 0;

        let paths: Vec<_> = validate(&config).errors.into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            [
                "sampling.temperature",
                "sampling.topP",
                "retry.maxAttempts",
                "run.concurrency"
            ]
        );
    }

    #[test]
    fn zero_request_timeout_is_error() {
        let mut config = keyed();
        config.polling.request_timeout_secs = 0;
        let report = validate(&config);
        assert_eq!(report.errors[0].path, "polling.requestTimeoutSecs");
    }

    #[test]
    fn disabled_cleanup_warns() {
        let mut config = keyed();
        config.run.cleanup = false;
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "run.cleanup");
    }
}

//! Maps the loaded config onto run settings and the remote backend.

use std::time::Duration;

use pdfmetrics_assistant::{DocumentRegistrar, OpenAiAssistants, SessionDriver};
use pdfmetrics_config::PipelineConfig;
use pdfmetrics_core::Sampling;
use pdfmetrics_extractor::{RetryPolicy, RunSettings, StageModels};
use pdfmetrics_logging::LogSettings;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub concurrency: Option<usize>,
    pub no_cleanup: bool,
}

pub fn run_settings(config: &PipelineConfig, overrides: &Overrides) -> RunSettings {
    let poll_interval = Duration::from_millis(config.polling.interval_ms);
    let run_timeout =
        (config.polling.run_timeout_secs > 0).then(|| Duration::from_secs(config.polling.run_timeout_secs));

    let settings = RunSettings {
        models: StageModels {
            value_unit: config.models.value_unit.clone(),
            context: config.models.context.clone(),
            page_location: config.models.page_location.clone(),
        },
        session: SessionDriver {
            poll_interval,
            run_timeout,
            sampling: Sampling {
                temperature: config.sampling.temperature,
                top_p: config.sampling.top_p,
            },
            cleanup: config.run.cleanup,
        },
        registrar: DocumentRegistrar {
            vector_store_name: config.run.vector_store_name.clone(),
            poll_interval,
            indexing_timeout: Duration::from_secs(config.polling.indexing_timeout_secs),
        },
        retry: RetryPolicy {
            max_attempts: config.retry.max_attempts,
            base_delay_ms: config.retry.base_delay_ms,
            backoff_factor: config.retry.backoff_factor,
            max_delay_ms: config.retry.max_delay_ms,
            jitter: config.retry.jitter,
        },
        concurrency: overrides.concurrency.unwrap_or(config.run.concurrency).max(1),
        cleanup: config.run.cleanup,
    };
    settings.with_cleanup(config.run.cleanup && !overrides.no_cleanup)
}

pub fn backend(config: &PipelineConfig) -> OpenAiAssistants {
    let backend = OpenAiAssistants::new(config.openai.api_key.clone())
        .with_base_url(config.openai.base_url.clone())
        .with_request_timeout(Duration::from_secs(config.polling.request_timeout_secs));
    match &config.openai.organization {
        Some(org) if !org.is_empty() => backend.with_organization(org.clone()),
        _ => backend,
    }
}

pub fn log_settings(config: &PipelineConfig) -> LogSettings {
    LogSettings {
        level: config.logging.level.clone(),
        dir: config.logging.dir.clone(),
        json: config.logging.json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_config_sections() {
        let mut config = PipelineConfig::default();
        config.models.page_location = "gpt-4.1".into();
        config.polling.interval_ms = 500;
        config.retry.max_attempts = 2;
        config.run.concurrency = 3;

        let settings = run_settings(&config, &Overrides::default());
        assert_eq!(settings.models.page_location, "gpt-4.1");
        assert_eq!(settings.session.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.registrar.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.session.run_timeout, Some(Duration::from_secs(300)));
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.concurrency, 3);
        assert!(settings.cleanup && settings.session.cleanup);
    }

    #[test]
    fn flags_override_config() {
        let config = PipelineConfig::default();
        let overrides = Overrides {
            concurrency: Some(4),
            no_cleanup: true,
        };

        let settings = run_settings(&config, &overrides);
        assert_eq!(settings.concurrency, 4);
        assert!(!settings.cleanup);
        assert!(!settings.session.cleanup);
    }

    #[test]
    fn backend_uses_request_timeout() {
        let mut config = PipelineConfig::default();
        config.polling.request_timeout_secs = 15;
        assert_eq!(backend(&config).request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn zero_run_timeout_waits_forever() {
        let mut config = PipelineConfig::default();
        config.polling.run_timeout_secs = 0;
        assert_eq!(run_settings(&config, &Overrides::default()).session.run_timeout, None);
    }
}

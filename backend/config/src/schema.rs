//! pdfmetrics configuration schema.
//!
//! Every section is optional in the YAML file; absent sections and fields take
//! the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Assistants API credentials and endpoint
    pub openai: OpenAiConfig,

    /// Model used by each extraction stage
    pub models: ModelsConfig,

    /// Run sampling parameters
    pub sampling: SamplingConfig,

    /// Run and indexing poll behaviour
    pub polling: PollingConfig,

    /// Stage retry policy
    pub retry: RetryConfig,

    /// Per-run behaviour
    pub run: RunConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenAiConfig {
    /// Falls back to `OPENAI_API_KEY` when left empty.
    pub api_key: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            organization: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelsConfig {
    pub value_unit: String,
    pub context: String,
    pub page_location: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            value_unit: "gpt-4o-mini".to_string(),
            context: "gpt-4o-mini".to_string(),
            page_location: "gpt-4o".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sampling & polling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.01,
            top_p: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Limit for a single HTTP request to the assistant service.
    pub request_timeout_secs: u64,
    /// 0 waits on a run indefinitely.
    pub run_timeout_secs: u64,
    pub indexing_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            request_timeout_secs: 60,
            run_timeout_secs: 300,
            indexing_timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2_000,
            backoff_factor: 2.0,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    pub concurrency: usize,
    /// Prefix for the per-run vector store name.
    pub vector_store_name: String,
    /// Delete remote assistants, threads, and the uploaded document afterwards.
    pub cleanup: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            vector_store_name: "pdfmetrics".to_string(),
            cleanup: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily-rolling JSON log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "run:\n  concurrency: 4\nmodels:\n  pageLocation: gpt-4.1\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.run.concurrency, 4);
        assert!(config.run.cleanup);
        assert_eq!(config.models.page_location, "gpt-4.1");
        assert_eq!(config.models.value_unit, "gpt-4o-mini");
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn empty_document_is_default() {
        let config: PipelineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(PipelineConfig::default()).unwrap();
        assert_eq!(value["polling"]["runTimeoutSecs"], 300);
        assert_eq!(value["polling"]["requestTimeoutSecs"], 60);
        assert_eq!(value["run"]["vectorStoreName"], "pdfmetrics");
        assert!(value["openai"].get("organization").is_none());
    }
}

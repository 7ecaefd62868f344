//! `pdfmetrics-config`: runtime configuration for pdfmetrics.
//!
//! Provides:
//! - Typed config schema with defaults for every field
//! - YAML loading from `--config` or the config directory
//! - `${ENV_VAR}` substitution
//! - Config redaction for safe display
//! - Validation with path-qualified errors and warnings

pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{apply_env_fallbacks, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, resolve_config_path};
pub use redact::redact;
pub use schema::{
    LoggingConfig, ModelsConfig, OpenAiConfig, PipelineConfig, PollingConfig, RetryConfig,
    RunConfig, SamplingConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// A prepared config together with its validation findings.
#[derive(Debug)]
pub struct PreparedConfig {
    pub config: PipelineConfig,
    pub report: ValidationReport,
}

/// Load a config file, substitute env vars, fill env fallbacks, and validate.
///
/// Nothing is logged here; callers print the report once logging is set up.
pub async fn load_and_prepare(path: &Path) -> Result<PreparedConfig> {
    let raw_config = load_config(path).await?;

    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let mut config: PipelineConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    apply_env_fallbacks(&mut config);

    let report = validate(&config);
    Ok(PreparedConfig { config, report })
}

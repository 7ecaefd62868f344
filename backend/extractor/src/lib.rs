pub mod context;
pub mod json_block;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod run;
pub mod tables;

pub use context::{RunContext, RunSettings, StageModels};
pub use json_block::extract_json;
pub use pipeline::{AttemptError, MetricPipeline, StageFailure};
pub use retry::RetryPolicy;
pub use run::{ExtractionRun, RunProgress, RunReport};

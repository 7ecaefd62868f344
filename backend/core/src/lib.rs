pub mod error;
pub mod handles;
pub mod traits;
pub mod types;

pub use error::{AssistantError, ExtractError};
pub use handles::{AssistantId, FileId, IndexingStatus, RunId, RunStatus, ThreadId, VectorStoreId};
pub use traits::{AssistantBackend, AssistantSpec, Sampling, ThreadMessage};
pub use types::{
    ExtractionResult, MetricRequest, Outcome, Stage, TimePeriod, COLUMNS, EXTRACTION_FAILED,
    NOT_APPLICABLE, NOT_FOUND,
};

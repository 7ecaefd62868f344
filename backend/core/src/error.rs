use thiserror::Error;

use crate::handles::RunStatus;

/// Failure talking to the hosted assistant service.
#[derive(Debug, Clone, Error)]
pub enum AssistantError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("assistant API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode assistant API response: {0}")]
    Decode(String),

    #[error("run {run} ended with status {status}")]
    RunFailed { run: String, status: RunStatus },

    #[error("run {run} did not complete within {waited_secs}s")]
    RunTimedOut { run: String, waited_secs: u64 },

    #[error("thread {0} has no assistant reply")]
    EmptyThread(String),
}

impl AssistantError {
    /// Whether retrying the same request can succeed. Client errors other than
    /// timeouts, conflicts, and rate limits are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api { status, .. } => matches!(status, 408 | 409 | 429) || *status >= 500,
            _ => true,
        }
    }
}

/// Run-level failure: the run cannot produce a result table.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to upload document: {0}")]
    Upload(AssistantError),

    #[error("document indexing failed: {0}")]
    Indexing(String),

    #[error("assistant service error: {0}")]
    Remote(#[from] AssistantError),

    #[error("invalid input: {0}")]
    Input(String),
}

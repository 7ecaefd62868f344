use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AssistantError;
use crate::handles::{AssistantId, FileId, IndexingStatus, RunId, RunStatus, ThreadId, VectorStoreId};

/// The hosted assistant service with file search.
///
/// Every operation is one remote call. Implementations hold their own
/// credentials; callers pass only handles returned by earlier calls.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Backend name used in logs (e.g., "openai", "scripted").
    fn name(&self) -> &str;

    async fn create_vector_store(&self, name: &str) -> Result<VectorStoreId, AssistantError>;

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<FileId, AssistantError>;

    /// Attach an uploaded file to a vector store and return its initial indexing status.
    async fn attach_file(
        &self,
        store: &VectorStoreId,
        file: &FileId,
    ) -> Result<IndexingStatus, AssistantError>;

    async fn indexing_status(
        &self,
        store: &VectorStoreId,
        file: &FileId,
    ) -> Result<IndexingStatus, AssistantError>;

    /// Create an assistant with the file-search tool bound to `spec.vector_store`.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<AssistantId, AssistantError>;

    async fn create_thread(&self) -> Result<ThreadId, AssistantError>;

    /// Post a user message to the thread.
    async fn post_message(&self, thread: &ThreadId, text: &str) -> Result<(), AssistantError>;

    async fn start_run(
        &self,
        thread: &ThreadId,
        assistant: &AssistantId,
        sampling: &Sampling,
    ) -> Result<RunId, AssistantError>;

    async fn run_status(&self, thread: &ThreadId, run: &RunId) -> Result<RunStatus, AssistantError>;

    /// Messages on the thread, most recent first.
    async fn list_messages(&self, thread: &ThreadId) -> Result<Vec<ThreadMessage>, AssistantError>;

    async fn delete_assistant(&self, assistant: &AssistantId) -> Result<(), AssistantError>;

    async fn delete_thread(&self, thread: &ThreadId) -> Result<(), AssistantError>;

    async fn delete_file(&self, file: &FileId) -> Result<(), AssistantError>;

    async fn delete_vector_store(&self, store: &VectorStoreId) -> Result<(), AssistantError>;
}

/// Everything needed to create one stage's assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub vector_store: VectorStoreId,
}

/// Sampling parameters for a run. Defaults keep output variance low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.01,
            top_p: 1.0,
        }
    }
}

/// A message on a thread, flattened to its text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    pub text: String,
}

impl ThreadMessage {
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }
}

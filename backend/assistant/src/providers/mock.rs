use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use pdfmetrics_core::{
    AssistantBackend, AssistantError, AssistantId, AssistantSpec, FileId, IndexingStatus, RunId,
    RunStatus, Sampling, ThreadId, ThreadMessage, VectorStoreId,
};

/// What the scripted service does with one run.
#[derive(Debug, Clone)]
pub enum Reply {
    /// The run completes and the assistant answers with this text.
    Text(String),
    /// Starting the run fails with this error.
    Error(AssistantError),
    /// The run ends with a non-completed terminal status.
    Status(RunStatus),
    /// The run never leaves `in_progress`.
    Stall,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A reply wrapping `json` in a fenced block, the way the model answers.
    pub fn fenced(json: &str) -> Self {
        Self::Text(format!("Here is the result:\n```json\n{json}\n```"))
    }
}

/// One submitted run, as seen by the responder.
#[derive(Debug, Clone)]
pub struct ScriptCall {
    pub assistant: AssistantSpec,
    pub prompt: String,
}

type Responder = Box<dyn Fn(&ScriptCall) -> Reply + Send + Sync>;

#[derive(Default)]
struct State {
    assistants: HashMap<AssistantId, AssistantSpec>,
    threads: HashMap<ThreadId, Thread>,
    queue: VecDeque<Reply>,
    calls: Vec<ScriptCall>,
    deleted_assistants: Vec<AssistantId>,
    deleted_threads: Vec<ThreadId>,
    deleted_files: Vec<FileId>,
    deleted_stores: Vec<VectorStoreId>,
    uploads: Vec<(String, usize)>,
    attached: Vec<(VectorStoreId, FileId)>,
    indexing: VecDeque<IndexingStatus>,
    status_polls: u64,
}

#[derive(Default)]
struct Thread {
    prompt: Option<String>,
    reply: Option<Reply>,
}

/// In-memory assistant service for tests.
///
/// Replies come from the queue first, then from the responder. Without either
/// every run answers with an empty text.
pub struct ScriptedBackend {
    responder: Option<Responder>,
    upload_error: Option<AssistantError>,
    next_id: AtomicU64,
    state: Mutex<State>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            responder: None,
            upload_error: None,
            next_id: AtomicU64::new(1),
            state: Mutex::new(State::default()),
        }
    }

    /// Answer every run by calling `responder`.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&ScriptCall) -> Reply + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Answer the next runs, in order, with `replies`.
    pub fn with_queue(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.lock().queue.extend(replies);
        self
    }

    /// Fail every upload with `error`.
    pub fn with_upload_error(mut self, error: AssistantError) -> Self {
        self.upload_error = Some(error);
        self
    }

    /// Report these indexing statuses, in order, before reporting `completed`.
    pub fn with_indexing(self, statuses: impl IntoIterator<Item = IndexingStatus>) -> Self {
        self.lock().indexing.extend(statuses);
        self
    }

    /// Every run submitted so far.
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.lock().calls.clone()
    }

    /// Runs submitted to assistants with the given name.
    pub fn calls_to(&self, assistant_name: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.assistant.name == assistant_name)
            .count()
    }

    pub fn assistants_created(&self) -> usize {
        self.lock().assistants.len()
    }

    pub fn assistants_deleted(&self) -> usize {
        self.lock().deleted_assistants.len()
    }

    pub fn threads_created(&self) -> usize {
        self.lock().threads.len()
    }

    pub fn threads_deleted(&self) -> usize {
        self.lock().deleted_threads.len()
    }

    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.lock().uploads.clone()
    }

    pub fn attached(&self) -> Vec<(VectorStoreId, FileId)> {
        self.lock().attached.clone()
    }

    pub fn files_deleted(&self) -> usize {
        self.lock().deleted_files.len()
    }

    pub fn vector_stores_deleted(&self) -> usize {
        self.lock().deleted_stores.len()
    }

    pub fn status_polls(&self) -> u64 {
        self.lock().status_polls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn next_indexing_status(&self) -> IndexingStatus {
        self.lock()
            .indexing
            .pop_front()
            .unwrap_or(IndexingStatus::Completed)
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(kind: &str, id: &str) -> AssistantError {
    AssistantError::Api {
        status: 404,
        body: format!("No {kind} found with id '{id}'"),
    }
}

#[async_trait]
impl AssistantBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_vector_store(&self, _name: &str) -> Result<VectorStoreId, AssistantError> {
        Ok(VectorStoreId::new(self.next_id("vs")))
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<FileId, AssistantError> {
        if let Some(err) = &self.upload_error {
            return Err(err.clone());
        }
        self.lock().uploads.push((file_name.to_string(), bytes.len()));
        Ok(FileId::new(self.next_id("file")))
    }

    async fn attach_file(
        &self,
        store: &VectorStoreId,
        file: &FileId,
    ) -> Result<IndexingStatus, AssistantError> {
        self.lock().attached.push((store.clone(), file.clone()));
        Ok(self.next_indexing_status())
    }

    async fn indexing_status(
        &self,
        _store: &VectorStoreId,
        _file: &FileId,
    ) -> Result<IndexingStatus, AssistantError> {
        Ok(self.next_indexing_status())
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<AssistantId, AssistantError> {
        let id = AssistantId::new(self.next_id("asst"));
        self.lock().assistants.insert(id.clone(), spec.clone());
        Ok(id)
    }

    async fn create_thread(&self) -> Result<ThreadId, AssistantError> {
        let id = ThreadId::new(self.next_id("thread"));
        self.lock().threads.insert(id.clone(), Thread::default());
        Ok(id)
    }

    async fn post_message(&self, thread: &ThreadId, text: &str) -> Result<(), AssistantError> {
        let mut state = self.lock();
        let entry = state
            .threads
            .get_mut(thread)
            .ok_or_else(|| not_found("thread", thread.as_str()))?;
        entry.prompt = Some(text.to_string());
        Ok(())
    }

    async fn start_run(
        &self,
        thread: &ThreadId,
        assistant: &AssistantId,
        _sampling: &Sampling,
    ) -> Result<RunId, AssistantError> {
        let call = {
            let state = self.lock();
            let spec = state
                .assistants
                .get(assistant)
                .ok_or_else(|| not_found("assistant", assistant.as_str()))?
                .clone();
            let prompt = state
                .threads
                .get(thread)
                .and_then(|t| t.prompt.clone())
                .unwrap_or_default();
            ScriptCall {
                assistant: spec,
                prompt,
            }
        };

        let queued = self.lock().queue.pop_front();
        let reply = match queued {
            Some(reply) => reply,
            None => match &self.responder {
                Some(responder) => responder(&call),
                None => Reply::Text(String::new()),
            },
        };

        let mut state = self.lock();
        state.calls.push(call);
        if let Reply::Error(err) = reply {
            return Err(err);
        }
        if let Some(entry) = state.threads.get_mut(thread) {
            entry.reply = Some(reply);
        }
        Ok(RunId::new(format!("run_{thread}")))
    }

    async fn run_status(&self, thread: &ThreadId, _run: &RunId) -> Result<RunStatus, AssistantError> {
        let mut state = self.lock();
        state.status_polls += 1;
        let reply = state
            .threads
            .get(thread)
            .and_then(|t| t.reply.clone())
            .ok_or_else(|| not_found("run", thread.as_str()))?;
        Ok(match reply {
            Reply::Text(_) => RunStatus::Completed,
            Reply::Status(status) => status,
            Reply::Stall => RunStatus::InProgress,
            Reply::Error(_) => RunStatus::Failed,
        })
    }

    async fn list_messages(&self, thread: &ThreadId) -> Result<Vec<ThreadMessage>, AssistantError> {
        let state = self.lock();
        let entry = state
            .threads
            .get(thread)
            .ok_or_else(|| not_found("thread", thread.as_str()))?;

        let mut messages = Vec::new();
        if let Some(Reply::Text(text)) = &entry.reply {
            messages.push(ThreadMessage {
                role: "assistant".to_string(),
                text: text.clone(),
            });
        }
        if let Some(prompt) = &entry.prompt {
            messages.push(ThreadMessage {
                role: "user".to_string(),
                text: prompt.clone(),
            });
        }
        Ok(messages)
    }

    async fn delete_assistant(&self, assistant: &AssistantId) -> Result<(), AssistantError> {
        self.lock().deleted_assistants.push(assistant.clone());
        Ok(())
    }

    async fn delete_thread(&self, thread: &ThreadId) -> Result<(), AssistantError> {
        self.lock().deleted_threads.push(thread.clone());
        Ok(())
    }

    async fn delete_file(&self, file: &FileId) -> Result<(), AssistantError> {
        self.lock().deleted_files.push(file.clone());
        Ok(())
    }

    async fn delete_vector_store(&self, store: &VectorStoreId) -> Result<(), AssistantError> {
        self.lock().deleted_stores.push(store.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> AssistantSpec {
        AssistantSpec {
            name: name.into(),
            instructions: String::new(),
            model: "mock".into(),
            vector_store: VectorStoreId::new("vs_0"),
        }
    }

    #[tokio::test]
    async fn queue_takes_precedence_over_responder() {
        let backend = ScriptedBackend::new()
            .with_responder(|_| Reply::text("from responder"))
            .with_queue([Reply::text("from queue")]);

        let assistant = backend.create_assistant(&spec("a")).await.unwrap();
        for expected in ["from queue", "from responder"] {
            let thread = backend.create_thread().await.unwrap();
            backend.post_message(&thread, "hi").await.unwrap();
            let run = backend
                .start_run(&thread, &assistant, &Sampling::default())
                .await
                .unwrap();
            assert_eq!(
                backend.run_status(&thread, &run).await.unwrap(),
                RunStatus::Completed
            );
            let messages = backend.list_messages(&thread).await.unwrap();
            assert_eq!(messages[0].text, expected);
            assert_eq!(messages[1].role, "user");
        }
        assert_eq!(backend.calls_to("a"), 2);
    }

    #[tokio::test]
    async fn unknown_assistant_is_not_found() {
        let backend = ScriptedBackend::new();
        let thread = backend.create_thread().await.unwrap();
        let err = backend
            .start_run(&thread, &AssistantId::new("missing"), &Sampling::default())
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }
}

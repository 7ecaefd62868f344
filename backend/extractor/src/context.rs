//! Per-run state shared by every metric: backend, registered document, settings.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use pdfmetrics_assistant::{DocumentRegistrar, RegisteredDocument, SessionDriver};
use pdfmetrics_core::{AssistantBackend, AssistantSpec, ExtractError, Stage};

use crate::prompts::StagePrompt;
use crate::retry::RetryPolicy;

/// Model used by each stage's assistant.
#[derive(Debug, Clone)]
pub struct StageModels {
    pub value_unit: String,
    pub context: String,
    pub page_location: String,
}

impl Default for StageModels {
    fn default() -> Self {
        Self {
            value_unit: "gpt-4o-mini".to_string(),
            context: "gpt-4o-mini".to_string(),
            page_location: "gpt-4o".to_string(),
        }
    }
}

impl StageModels {
    pub fn for_stage(&self, stage: Stage) -> &str {
        match stage {
            Stage::ValueUnit => &self.value_unit,
            Stage::Context => &self.context,
            Stage::PageLocation => &self.page_location,
        }
    }
}

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub models: StageModels,
    pub session: SessionDriver,
    pub registrar: DocumentRegistrar,
    pub retry: RetryPolicy,
    /// Metrics extracted at the same time. 1 processes them strictly in order.
    pub concurrency: usize,
    /// Delete assistants, threads, the file, and the vector store after use.
    pub cleanup: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            models: StageModels::default(),
            session: SessionDriver::default(),
            registrar: DocumentRegistrar::default(),
            retry: RetryPolicy::default(),
            concurrency: 1,
            cleanup: true,
        }
    }
}

impl RunSettings {
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self.session.cleanup = cleanup;
        self
    }
}

/// Everything a run's components need, constructed once per run and passed
/// explicitly instead of living in globals.
pub struct RunContext {
    run_id: Uuid,
    backend: Arc<dyn AssistantBackend>,
    document: RegisteredDocument,
    settings: RunSettings,
}

impl RunContext {
    /// Register the document with the service and build the run's context.
    pub async fn open(
        backend: Arc<dyn AssistantBackend>,
        settings: RunSettings,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, ExtractError> {
        let run_id = Uuid::new_v4();
        let mut registrar = settings.registrar.clone();
        registrar.vector_store_name = format!("{}-{run_id}", registrar.vector_store_name);

        info!(run_id = %run_id, backend = backend.name(), file_name, "Registering document");
        let document = registrar.register(backend.as_ref(), file_name, bytes).await?;

        Ok(Self::from_parts(run_id, backend, document, settings))
    }

    /// Build a context around a document that is already registered.
    pub fn from_parts(
        run_id: Uuid,
        backend: Arc<dyn AssistantBackend>,
        document: RegisteredDocument,
        settings: RunSettings,
    ) -> Self {
        let cleanup = settings.cleanup;
        let settings = settings.with_cleanup(cleanup);
        Self {
            run_id,
            backend,
            document,
            settings,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn backend(&self) -> &dyn AssistantBackend {
        self.backend.as_ref()
    }

    pub fn document(&self) -> &RegisteredDocument {
        &self.document
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// The assistant a stage runs under: the stage's instructions and model,
    /// searching this run's vector store.
    pub fn assistant_spec(&self, prompt: &StagePrompt) -> AssistantSpec {
        AssistantSpec {
            name: prompt.assistant_name.to_string(),
            instructions: prompt.instructions.clone(),
            model: self.settings.models.for_stage(prompt.stage).to_string(),
            vector_store: self.document.vector_store.clone(),
        }
    }

    /// Release the run's remote document unless cleanup is disabled.
    pub async fn close(&self) {
        if self.settings.cleanup {
            self.document.release(self.backend()).await;
        }
        info!(run_id = %self.run_id, "Run closed");
    }
}

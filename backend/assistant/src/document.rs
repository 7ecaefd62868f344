//! Document registration: upload the PDF and index it for file search.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use pdfmetrics_core::{AssistantBackend, ExtractError, FileId, IndexingStatus, VectorStoreId};

/// A document uploaded and attached to the run's vector store.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredDocument {
    pub file_name: String,
    pub vector_store: VectorStoreId,
    pub file: FileId,
}

impl RegisteredDocument {
    /// Delete the vector store and the uploaded file. Failures are logged.
    pub async fn release(&self, backend: &dyn AssistantBackend) {
        if let Err(e) = backend.delete_vector_store(&self.vector_store).await {
            warn!(vector_store = %self.vector_store, error = %e, "Failed to delete vector store");
        }
        if let Err(e) = backend.delete_file(&self.file).await {
            warn!(file = %self.file, error = %e, "Failed to delete uploaded file");
        }
        debug!(file_name = %self.file_name, "Document released");
    }
}

/// Registers a run's document with the assistant service.
#[derive(Debug, Clone)]
pub struct DocumentRegistrar {
    pub vector_store_name: String,
    pub poll_interval: Duration,
    /// How long to wait for the file to become searchable.
    pub indexing_timeout: Duration,
}

impl Default for DocumentRegistrar {
    fn default() -> Self {
        Self {
            vector_store_name: "pdfmetrics".to_string(),
            poll_interval: Duration::from_secs(2),
            indexing_timeout: Duration::from_secs(120),
        }
    }
}

impl DocumentRegistrar {
    /// Create the vector store, upload `bytes`, attach the file, and wait until
    /// it is indexed. Anything created before a failure is deleted again.
    pub async fn register(
        &self,
        backend: &dyn AssistantBackend,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<RegisteredDocument, ExtractError> {
        let vector_store = backend.create_vector_store(&self.vector_store_name).await?;
        debug!(vector_store = %vector_store, "Vector store created");

        let file = match backend.upload_file(file_name, bytes).await {
            Ok(file) => file,
            Err(e) => {
                if let Err(cleanup) = backend.delete_vector_store(&vector_store).await {
                    warn!(vector_store = %vector_store, error = %cleanup, "Failed to delete vector store");
                }
                return Err(ExtractError::Upload(e));
            }
        };
        info!(file = %file, file_name, "Document uploaded");

        let document = RegisteredDocument {
            file_name: file_name.to_string(),
            vector_store,
            file,
        };

        if let Err(e) = self.attach_and_wait(backend, &document).await {
            document.release(backend).await;
            return Err(e);
        }
        info!(vector_store = %document.vector_store, "Document indexed");
        Ok(document)
    }

    async fn attach_and_wait(
        &self,
        backend: &dyn AssistantBackend,
        document: &RegisteredDocument,
    ) -> Result<(), ExtractError> {
        let started = Instant::now();
        let mut status = backend
            .attach_file(&document.vector_store, &document.file)
            .await?;

        loop {
            match status {
                IndexingStatus::Completed => return Ok(()),
                IndexingStatus::Failed | IndexingStatus::Cancelled => {
                    return Err(ExtractError::Indexing(format!(
                        "file {} ended with status {status}",
                        document.file
                    )));
                }
                IndexingStatus::InProgress | IndexingStatus::Unknown => {}
            }
            if started.elapsed() >= self.indexing_timeout {
                return Err(ExtractError::Indexing(format!(
                    "file {} still {status} after {}s",
                    document.file,
                    started.elapsed().as_secs()
                )));
            }
            sleep(self.poll_interval).await;
            status = backend
                .indexing_status(&document.vector_store, &document.file)
                .await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedBackend;
    use pdfmetrics_core::AssistantError;

    fn fast() -> DocumentRegistrar {
        DocumentRegistrar {
            poll_interval: Duration::from_millis(1),
            indexing_timeout: Duration::from_millis(50),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn uploads_and_attaches() {
        let backend = ScriptedBackend::new().with_indexing([
            IndexingStatus::InProgress,
            IndexingStatus::InProgress,
        ]);

        let doc = fast()
            .register(&backend, "report.pdf", vec![0u8; 16])
            .await
            .unwrap();

        assert_eq!(doc.file_name, "report.pdf");
        assert_eq!(backend.uploads(), vec![("report.pdf".to_string(), 16)]);
        assert_eq!(
            backend.attached(),
            vec![(doc.vector_store.clone(), doc.file.clone())]
        );
    }

    #[tokio::test]
    async fn upload_failure_is_fatal_and_cleans_up() {
        let backend = ScriptedBackend::new().with_upload_error(AssistantError::Api {
            status: 413,
            body: "file too large".into(),
        });

        let err = fast()
            .register(&backend, "report.pdf", vec![1, 2, 3])
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::Upload(_)));
        assert_eq!(backend.vector_stores_deleted(), 1);
        assert!(backend.attached().is_empty());
    }

    #[tokio::test]
    async fn failed_indexing_releases_document() {
        let backend = ScriptedBackend::new()
            .with_indexing([IndexingStatus::InProgress, IndexingStatus::Failed]);

        let err = fast()
            .register(&backend, "report.pdf", vec![1])
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::Indexing(_)));
        assert_eq!(backend.vector_stores_deleted(), 1);
        assert_eq!(backend.files_deleted(), 1);
    }

    #[tokio::test]
    async fn indexing_wait_is_bounded() {
        let backend =
            ScriptedBackend::new().with_indexing(std::iter::repeat(IndexingStatus::InProgress).take(10_000));

        let err = fast()
            .register(&backend, "report.pdf", vec![1])
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::Indexing(msg) if msg.contains("still in_progress")));
    }
}

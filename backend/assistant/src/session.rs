//! One prompt, one thread: submit a user message to an assistant and wait for its answer.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use pdfmetrics_core::{AssistantBackend, AssistantError, AssistantId, RunId, Sampling, ThreadId};

/// Drives a single request/response exchange with a remote assistant.
#[derive(Debug, Clone)]
pub struct SessionDriver {
    /// Delay between run status checks.
    pub poll_interval: Duration,
    /// Give up on a run that is still pending after this long. `None` waits forever.
    pub run_timeout: Option<Duration>,
    pub sampling: Sampling,
    /// Delete the thread once the exchange is over.
    pub cleanup: bool,
}

impl Default for SessionDriver {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            run_timeout: Some(Duration::from_secs(300)),
            sampling: Sampling::default(),
            cleanup: true,
        }
    }
}

impl SessionDriver {
    /// Open a fresh thread, post `prompt`, run `assistant` on it, and return the
    /// assistant's reply trimmed of surrounding whitespace.
    pub async fn submit(
        &self,
        backend: &dyn AssistantBackend,
        assistant: &AssistantId,
        prompt: &str,
    ) -> Result<String, AssistantError> {
        let thread = backend.create_thread().await?;
        let result = self.exchange(backend, &thread, assistant, prompt).await;

        if self.cleanup {
            if let Err(e) = backend.delete_thread(&thread).await {
                warn!(thread = %thread, error = %e, "Failed to delete thread");
            }
        }
        result
    }

    async fn exchange(
        &self,
        backend: &dyn AssistantBackend,
        thread: &ThreadId,
        assistant: &AssistantId,
        prompt: &str,
    ) -> Result<String, AssistantError> {
        backend.post_message(thread, prompt).await?;
        let run = backend.start_run(thread, assistant, &self.sampling).await?;
        debug!(thread = %thread, run = %run, assistant = %assistant, "Run started");

        self.wait_for_run(backend, thread, &run).await?;

        backend
            .list_messages(thread)
            .await?
            .into_iter()
            .find(|m| m.is_assistant())
            .map(|m| m.text.trim().to_string())
            .ok_or_else(|| AssistantError::EmptyThread(thread.to_string()))
    }

    async fn wait_for_run(
        &self,
        backend: &dyn AssistantBackend,
        thread: &ThreadId,
        run: &RunId,
    ) -> Result<(), AssistantError> {
        let started = Instant::now();
        loop {
            let status = backend.run_status(thread, run).await?;
            if status.is_completed() {
                debug!(run = %run, elapsed_ms = started.elapsed().as_millis() as u64, "Run completed");
                return Ok(());
            }
            if !status.is_pending() {
                return Err(AssistantError::RunFailed {
                    run: run.to_string(),
                    status,
                });
            }
            if let Some(limit) = self.run_timeout {
                if started.elapsed() >= limit {
                    return Err(AssistantError::RunTimedOut {
                        run: run.to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Reply, ScriptedBackend};
    use pdfmetrics_core::{AssistantSpec, RunStatus, VectorStoreId};

    fn fast_driver() -> SessionDriver {
        SessionDriver {
            poll_interval: Duration::from_millis(1),
            run_timeout: Some(Duration::from_millis(30)),
            ..Default::default()
        }
    }

    async fn assistant(backend: &ScriptedBackend) -> AssistantId {
        backend
            .create_assistant(&AssistantSpec {
                name: "test".into(),
                instructions: String::new(),
                model: "mock".into(),
                vector_store: VectorStoreId::new("vs_1"),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn returns_trimmed_reply_and_deletes_thread() {
        let backend = ScriptedBackend::new().with_queue([Reply::text("  answer \n")]);
        let id = assistant(&backend).await;

        let reply = fast_driver().submit(&backend, &id, "question").await.unwrap();
        assert_eq!(reply, "answer");
        assert_eq!(backend.calls()[0].prompt, "question");
        assert_eq!(backend.threads_created(), 1);
        assert_eq!(backend.threads_deleted(), 1);
    }

    #[tokio::test]
    async fn failed_run_is_an_error() {
        let backend = ScriptedBackend::new().with_queue([Reply::Status(RunStatus::Failed)]);
        let id = assistant(&backend).await;

        let err = fast_driver().submit(&backend, &id, "q").await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::RunFailed {
                status: RunStatus::Failed,
                ..
            }
        ));
        assert_eq!(backend.threads_deleted(), 1);
    }

    #[tokio::test]
    async fn stalled_run_times_out() {
        let backend = ScriptedBackend::new().with_queue([Reply::Stall]);
        let id = assistant(&backend).await;

        let err = fast_driver().submit(&backend, &id, "q").await.unwrap_err();
        assert!(matches!(err, AssistantError::RunTimedOut { .. }));
        assert!(backend.status_polls() > 1);
        assert_eq!(backend.threads_deleted(), 1);
    }

    #[tokio::test]
    async fn start_error_propagates() {
        let backend = ScriptedBackend::new().with_queue([Reply::Error(AssistantError::Api {
            status: 500,
            body: "boom".into(),
        })]);
        let id = assistant(&backend).await;

        let err = fast_driver().submit(&backend, &id, "q").await.unwrap_err();
        assert!(matches!(err, AssistantError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn keeps_thread_without_cleanup() {
        let backend = ScriptedBackend::new().with_queue([Reply::text("ok")]);
        let id = assistant(&backend).await;
        let driver = SessionDriver {
            cleanup: false,
            ..fast_driver()
        };

        driver.submit(&backend, &id, "q").await.unwrap();
        assert_eq!(backend.threads_deleted(), 0);
    }
}

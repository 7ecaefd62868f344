//! Scoped remote assistants: created for one stage, deleted when the stage ends.

use std::future::Future;

use tracing::{debug, warn};

use pdfmetrics_core::{AssistantBackend, AssistantError, AssistantId, AssistantSpec};

/// Create an assistant from `spec`, run `f` with its id, then delete it.
///
/// The assistant is deleted whatever `f` returns. A failed deletion is logged
/// and does not replace `f`'s output.
pub async fn with_assistant<T, F, Fut>(
    backend: &dyn AssistantBackend,
    spec: &AssistantSpec,
    cleanup: bool,
    f: F,
) -> Result<T, AssistantError>
where
    F: FnOnce(AssistantId) -> Fut,
    Fut: Future<Output = T>,
{
    let assistant = backend.create_assistant(spec).await?;
    debug!(assistant = %assistant, name = %spec.name, model = %spec.model, "Assistant created");

    let output = f(assistant.clone()).await;

    if cleanup {
        match backend.delete_assistant(&assistant).await {
            Ok(()) => debug!(assistant = %assistant, "Assistant deleted"),
            Err(e) => warn!(assistant = %assistant, error = %e, "Failed to delete assistant"),
        }
    }
    Ok(output)
}

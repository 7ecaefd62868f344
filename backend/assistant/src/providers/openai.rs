use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pdfmetrics_core::{
    AssistantBackend, AssistantError, AssistantId, AssistantSpec, FileId, IndexingStatus, RunId,
    RunStatus, Sampling, ThreadId, ThreadMessage, VectorStoreId,
};
use pdfmetrics_logging::redact_sensitive_data;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI Assistants v2 backend (vector stores, files, assistants, threads, runs).
pub struct OpenAiAssistants {
    client: Client,
    api_key: String,
    base_url: String,
    organization: Option<String>,
    request_timeout: Duration,
}

impl OpenAiAssistants {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: None,
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .timeout(self.request_timeout);
        match &self.organization {
            Some(org) => builder.header("OpenAI-Organization", org),
            None => builder,
        }
    }

    async fn send<R: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<R, AssistantError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| AssistantError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api {
                status: status.as_u16(),
                body: redact_sensitive_data(&error_body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AssistantError::Decode(e.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AssistantError> {
        debug!(path, "POST assistant API");
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, AssistantError> {
        self.send(self.client.get(self.url(path))).await
    }

    async fn delete(&self, path: &str) -> Result<(), AssistantError> {
        debug!(path, "DELETE assistant API");
        let _: Deleted = self.send(self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct Deleted {
    #[allow(dead_code)]
    deleted: bool,
}

#[derive(Serialize)]
struct VectorStoreRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct AttachFileRequest<'a> {
    file_id: &'a str,
}

#[derive(Deserialize)]
struct VectorStoreFile {
    status: IndexingStatus,
}

#[derive(Serialize)]
struct AssistantRequest<'a> {
    name: &'a str,
    instructions: &'a str,
    model: &'a str,
    tools: Vec<ToolSpec>,
    tool_resources: ToolResources<'a>,
}

#[derive(Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ToolResources<'a> {
    file_search: FileSearchResources<'a>,
}

#[derive(Serialize)]
struct FileSearchResources<'a> {
    vector_store_ids: Vec<&'a str>,
}

impl<'a> AssistantRequest<'a> {
    fn from_spec(spec: &'a AssistantSpec) -> Self {
        Self {
            name: &spec.name,
            instructions: &spec.instructions,
            model: &spec.model,
            tools: vec![ToolSpec {
                kind: "file_search",
            }],
            tool_resources: ToolResources {
                file_search: FileSearchResources {
                    vector_store_ids: vec![spec.vector_store.as_str()],
                },
            },
        }
    }
}

#[derive(Serialize)]
struct EmptyBody {}

#[derive(Serialize)]
struct MessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    assistant_id: &'a str,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct RunObject {
    status: RunStatus,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<TextContent>,
}

#[derive(Deserialize)]
struct TextContent {
    value: String,
}

impl From<MessageObject> for ThreadMessage {
    fn from(message: MessageObject) -> Self {
        let text = message
            .content
            .into_iter()
            .filter(|part| part.kind == "text")
            .filter_map(|part| part.text.map(|t| t.value))
            .collect::<Vec<_>>()
            .join("\n");
        ThreadMessage {
            role: message.role,
            text,
        }
    }
}

#[async_trait]
impl AssistantBackend for OpenAiAssistants {
    fn name(&self) -> &str {
        "openai"
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStoreId, AssistantError> {
        let created: Created = self
            .post_json("vector_stores", &VectorStoreRequest { name })
            .await?;
        Ok(VectorStoreId::new(created.id))
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<FileId, AssistantError> {
        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| AssistantError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        debug!(file_name, size, "Uploading file");
        let created: Created = self
            .send(self.client.post(self.url("files")).multipart(form))
            .await?;
        Ok(FileId::new(created.id))
    }

    async fn attach_file(
        &self,
        store: &VectorStoreId,
        file: &FileId,
    ) -> Result<IndexingStatus, AssistantError> {
        let attached: VectorStoreFile = self
            .post_json(
                &format!("vector_stores/{store}/files"),
                &AttachFileRequest {
                    file_id: file.as_str(),
                },
            )
            .await?;
        Ok(attached.status)
    }

    async fn indexing_status(
        &self,
        store: &VectorStoreId,
        file: &FileId,
    ) -> Result<IndexingStatus, AssistantError> {
        let current: VectorStoreFile = self
            .get_json(&format!("vector_stores/{store}/files/{file}"))
            .await?;
        Ok(current.status)
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<AssistantId, AssistantError> {
        let created: Created = self
            .post_json("assistants", &AssistantRequest::from_spec(spec))
            .await?;
        Ok(AssistantId::new(created.id))
    }

    async fn create_thread(&self) -> Result<ThreadId, AssistantError> {
        let created: Created = self.post_json("threads", &EmptyBody {}).await?;
        Ok(ThreadId::new(created.id))
    }

    async fn post_message(&self, thread: &ThreadId, text: &str) -> Result<(), AssistantError> {
        let _: Created = self
            .post_json(
                &format!("threads/{thread}/messages"),
                &MessageRequest {
                    role: "user",
                    content: text,
                },
            )
            .await?;
        Ok(())
    }

    async fn start_run(
        &self,
        thread: &ThreadId,
        assistant: &AssistantId,
        sampling: &Sampling,
    ) -> Result<RunId, AssistantError> {
        let created: Created = self
            .post_json(
                &format!("threads/{thread}/runs"),
                &RunRequest {
                    assistant_id: assistant.as_str(),
                    temperature: sampling.temperature,
                    top_p: sampling.top_p,
                },
            )
            .await?;
        Ok(RunId::new(created.id))
    }

    async fn run_status(&self, thread: &ThreadId, run: &RunId) -> Result<RunStatus, AssistantError> {
        let current: RunObject = self
            .get_json(&format!("threads/{thread}/runs/{run}"))
            .await?;
        Ok(current.status)
    }

    async fn list_messages(&self, thread: &ThreadId) -> Result<Vec<ThreadMessage>, AssistantError> {
        let list: MessageList = self
            .get_json(&format!("threads/{thread}/messages?order=desc"))
            .await?;
        Ok(list.data.into_iter().map(ThreadMessage::from).collect())
    }

    async fn delete_assistant(&self, assistant: &AssistantId) -> Result<(), AssistantError> {
        self.delete(&format!("assistants/{assistant}")).await
    }

    async fn delete_thread(&self, thread: &ThreadId) -> Result<(), AssistantError> {
        self.delete(&format!("threads/{thread}")).await
    }

    async fn delete_file(&self, file: &FileId) -> Result<(), AssistantError> {
        self.delete(&format!("files/{file}")).await
    }

    async fn delete_vector_store(&self, store: &VectorStoreId) -> Result<(), AssistantError> {
        self.delete(&format!("vector_stores/{store}")).await
    }
}

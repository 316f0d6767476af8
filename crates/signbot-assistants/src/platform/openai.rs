//! OpenAI Assistants v2 API platform

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Method, RequestBuilder, Response, multipart};
use reqwest_eventsource::{Event, EventSource};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::{Error, Result},
    platform::AssistantPlatform,
    stream::{RunEvent, RunEventStream, parse_event},
    types::{
        Assistant, CreateVectorStore, DEFAULT_BASE_URL, FileObject, Role, Thread, ThreadMessage,
        ToolOutput, VectorStore,
    },
};

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VALUE: &str = "assistants=v2";

/// OpenAI Assistants API client
pub struct OpenAIAssistants {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIAssistants {
    /// Create a new client with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Use a different API base URL (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(self.request(Method::POST, path).json(body))
            .await
    }

    /// Open an event source and wait for the connection so that request
    /// failures are reported here rather than as the first stream item.
    async fn open_stream(&self, builder: RequestBuilder) -> Result<RunEventStream> {
        let mut event_source = EventSource::new(builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        match event_source.next().await {
            Some(Ok(Event::Open)) => {}
            Some(Ok(Event::Message(msg))) => {
                tracing::debug!(event = %msg.event, "event received before open");
            }
            Some(Err(e)) => {
                event_source.close();
                return Err(map_sse_error(e).await);
            }
            None => {
                return Err(Error::Sse(
                    "event source closed before the run started".to_string(),
                ));
            }
        }

        Ok(Box::pin(create_stream(event_source)))
    }
}

#[async_trait]
impl AssistantPlatform for OpenAIAssistants {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        tracing::debug!(assistant_id, "retrieving assistant");
        self.send_json(self.request(Method::GET, &format!("/assistants/{}", assistant_id)))
            .await
    }

    async fn create_thread(&self) -> Result<Thread> {
        tracing::debug!("creating thread");
        self.post_json("/threads", &serde_json::json!({})).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ThreadMessage> {
        tracing::debug!(thread_id, role = role.as_str(), "attaching message");
        let body = CreateMessage { role, content };
        self.post_json(&format!("/threads/{}/messages", thread_id), &body)
            .await
    }

    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<FileObject> {
        tracing::debug!(filename, size = bytes.len(), "uploading file");
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);
        self.send_json(self.request(Method::POST, "/files").multipart(form))
            .await
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        tracing::debug!(file_id, "deleting file");
        let builder = self.request(Method::DELETE, &format!("/files/{}", file_id));
        check_status(builder.send().await?).await?;
        Ok(())
    }

    async fn create_vector_store(&self, request: &CreateVectorStore) -> Result<VectorStore> {
        tracing::debug!(files = request.file_ids.len(), "creating vector store");
        self.post_json("/vector_stores", request).await
    }

    async fn delete_vector_store(&self, vector_store_id: &str) -> Result<()> {
        tracing::debug!(vector_store_id, "deleting vector store");
        let builder = self.request(
            Method::DELETE,
            &format!("/vector_stores/{}", vector_store_id),
        );
        check_status(builder.send().await?).await?;
        Ok(())
    }

    async fn bind_vector_stores(
        &self,
        thread_id: &str,
        vector_store_ids: &[String],
    ) -> Result<Thread> {
        tracing::debug!(thread_id, ?vector_store_ids, "binding vector stores");
        let body = ModifyThread {
            tool_resources: ToolResources {
                file_search: FileSearchResources { vector_store_ids },
            },
        };
        self.post_json(&format!("/threads/{}", thread_id), &body)
            .await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream> {
        tracing::debug!(thread_id, assistant_id, "starting run");
        let body = CreateRun {
            assistant_id,
            stream: true,
        };
        let builder = self
            .request(Method::POST, &format!("/threads/{}/runs", thread_id))
            .json(&body);
        self.open_stream(builder).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<RunEventStream> {
        tracing::debug!(thread_id, run_id, count = outputs.len(), "submitting tool outputs");
        let body = SubmitToolOutputs {
            tool_outputs: outputs,
            stream: true,
        };
        let builder = self
            .request(
                Method::POST,
                &format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            )
            .json(&body);
        self.open_stream(builder).await
    }
}

/// Turn a non-success response into an error
async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let retry_after = retry_after(&response);
    let body = response.text().await.unwrap_or_default();
    Err(Error::from_status(status, &body, retry_after))
}

fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

async fn map_sse_error(error: reqwest_eventsource::Error) -> Error {
    match error {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let retry_after = retry_after(&response);
            let body = response.text().await.unwrap_or_default();
            Error::from_status(status.as_u16(), &body, retry_after)
        }
        reqwest_eventsource::Error::InvalidContentType(content_type, _) => {
            Error::UnexpectedResponse(format!(
                "expected an event stream, got content type {:?}",
                content_type
            ))
        }
        reqwest_eventsource::Error::Transport(e) => Error::Http(e),
        other => Error::Sse(other.to_string()),
    }
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = RunEvent> {
    stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => match parse_event(&msg.event, &msg.data) {
                    Ok(Some(RunEvent::Done)) => {
                        yield RunEvent::Done;
                        break;
                    }
                    Ok(Some(run_event)) => {
                        yield run_event;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        yield RunEvent::Error {
                            message: format!("Failed to parse {} event: {}", msg.event, e),
                        };
                        break;
                    }
                },
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    yield RunEvent::Error {
                        message: format!("SSE error: {}", e),
                    };
                    break;
                }
            }
        }
        event_source.close();
    }
}

// Request types

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ModifyThread<'a> {
    tool_resources: ToolResources<'a>,
}

#[derive(Debug, Serialize)]
struct ToolResources<'a> {
    file_search: FileSearchResources<'a>,
}

#[derive(Debug, Serialize)]
struct FileSearchResources<'a> {
    vector_store_ids: &'a [String],
}

#[derive(Debug, Serialize)]
struct CreateRun<'a> {
    assistant_id: &'a str,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct SubmitToolOutputs<'a> {
    tool_outputs: &'a [ToolOutput],
    stream: bool,
}

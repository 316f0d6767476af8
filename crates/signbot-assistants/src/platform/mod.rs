//! Assistants platform implementations

pub mod openai;

use crate::{
    Assistant, CreateVectorStore, FileObject, Result, Role, RunEventStream, Thread,
    ThreadMessage, ToolOutput, VectorStore,
};
use async_trait::async_trait;

/// Operations the chat pipeline needs from the hosted assistants platform
#[async_trait]
pub trait AssistantPlatform: Send + Sync {
    /// Fetch an assistant configuration
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant>;

    /// Create an empty thread
    async fn create_thread(&self) -> Result<Thread>;

    /// Append a message to a thread
    async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ThreadMessage>;

    /// Upload a file for use by assistants
    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<FileObject>;

    /// Delete an uploaded file
    async fn delete_file(&self, file_id: &str) -> Result<()>;

    /// Create a retrieval index
    async fn create_vector_store(&self, request: &CreateVectorStore) -> Result<VectorStore>;

    /// Delete a retrieval index
    async fn delete_vector_store(&self, vector_store_id: &str) -> Result<()>;

    /// Point the thread's file search tool at the given indexes
    async fn bind_vector_stores(&self, thread_id: &str, vector_store_ids: &[String])
    -> Result<Thread>;

    /// Start a streaming run of `assistant_id` over the thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream>;

    /// Answer every pending tool call of a paused run and resume streaming
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<RunEventStream>;
}

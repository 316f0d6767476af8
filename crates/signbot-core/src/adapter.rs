//! Thin layer over the assistants platform that keeps session state in step
//! with remote calls and classifies failures.

use signbot_assistants::{
    AssistantPlatform, CreateVectorStore, Role, RunEventStream, ToolOutput,
};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::session::{IndexedFile, Session};

/// A local file to index for retrieval alongside a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a file from disk, refusing anything larger than `max_bytes`
    pub async fn from_path(path: &Path, max_bytes: u64) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Attachment(format!("{} has no file name", path.display())))?
            .to_string();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::Attachment(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(Error::Attachment(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        if metadata.len() > max_bytes {
            return Err(Error::Attachment(format!(
                "{} is {} bytes, the limit is {}",
                filename,
                metadata.len(),
                max_bytes
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Attachment(format!("{}: {}", path.display(), e)))?;
        Ok(Self { filename, bytes })
    }
}

/// Session-aware wrapper around an [`AssistantPlatform`]
#[derive(Clone)]
pub struct AssistantAdapter {
    platform: Arc<dyn AssistantPlatform>,
}

impl AssistantAdapter {
    pub fn new(platform: Arc<dyn AssistantPlatform>) -> Self {
        Self { platform }
    }

    /// Create the session's thread on first use and return its id
    pub async fn ensure_thread(&self, session: &mut Session) -> Result<String> {
        if let Some(id) = session.thread_id() {
            return Ok(id.to_string());
        }
        let thread = self
            .platform
            .create_thread()
            .await
            .map_err(Error::RemoteUnavailable)?;
        tracing::info!(session = %session.id(), thread_id = %thread.id, "created thread");
        session.set_thread_id(thread.id.clone());
        Ok(thread.id)
    }

    pub async fn attach_message(&self, thread_id: &str, role: Role, content: &str) -> Result<()> {
        self.platform
            .create_message(thread_id, role, content)
            .await
            .map_err(Error::RemoteUnavailable)?;
        Ok(())
    }

    /// Upload the attachment, index it and bind the index to the session's
    /// thread. The new index replaces any previous one, which is then deleted
    /// together with its file. Nothing uploaded here outlives a failure.
    /// Returns the id of the bound index.
    pub async fn index_file(&self, session: &mut Session, attachment: &Attachment) -> Result<String> {
        let thread_id = self.ensure_thread(session).await?;

        let file = self
            .platform
            .upload_file(&attachment.filename, attachment.bytes.clone())
            .await
            .map_err(Error::IndexBindingFailed)?;

        let request = CreateVectorStore::for_file(&file.id, &attachment.filename);
        let store = match self.platform.create_vector_store(&request).await {
            Ok(store) => store,
            Err(e) => {
                self.discard_file(&file.id).await;
                return Err(Error::IndexBindingFailed(e));
            }
        };
        let index = IndexedFile::new(file.id, store.id);

        if let Err(e) = self
            .platform
            .bind_vector_stores(&thread_id, std::slice::from_ref(&index.vector_store_id))
            .await
        {
            self.discard_index(&index).await;
            return Err(Error::IndexBindingFailed(e));
        }

        tracing::info!(
            file_id = %index.file_id,
            vector_store_id = %index.vector_store_id,
            "indexed {}",
            attachment.filename
        );

        let vector_store_id = index.vector_store_id.clone();
        if let Some(previous) = session.replace_index(index) {
            self.discard_index(&previous).await;
        }
        Ok(vector_store_id)
    }

    /// Delete an index and the file it was built from, logging rather than failing
    pub async fn discard_index(&self, index: &IndexedFile) {
        let vector_store_id = index.vector_store_id.as_str();
        if let Err(e) = self.platform.delete_vector_store(vector_store_id).await {
            tracing::warn!(vector_store_id, "failed to delete vector store: {}", e);
        }
        self.discard_file(&index.file_id).await;
    }

    async fn discard_file(&self, file_id: &str) {
        if let Err(e) = self.platform.delete_file(file_id).await {
            tracing::warn!(file_id, "failed to delete uploaded file: {}", e);
        }
    }

    pub async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream> {
        self.platform
            .create_run(thread_id, assistant_id)
            .await
            .map_err(Error::RemoteUnavailable)
    }

    pub async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> signbot_assistants::Result<RunEventStream> {
        self.platform
            .submit_tool_outputs(thread_id, run_id, outputs)
            .await
    }
}

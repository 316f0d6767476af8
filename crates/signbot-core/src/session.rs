//! Per-session state

use uuid::Uuid;

use crate::conversation::Conversation;

/// An uploaded file and the retrieval index built from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    pub file_id: String,
    pub vector_store_id: String,
}

impl IndexedFile {
    pub fn new(file_id: impl Into<String>, vector_store_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            vector_store_id: vector_store_id.into(),
        }
    }
}

/// Everything one chat session owns: history, the remote thread it talks
/// over and the retrieval index bound to that thread.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    conversation: Conversation,
    thread_id: Option<String>,
    index: Option<IndexedFile>,
    upload_generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation: Conversation::new(),
            thread_id: None,
            index: None,
            upload_generation: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Remote thread, once created
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Retrieval index currently bound to the thread
    pub fn vector_store_id(&self) -> Option<&str> {
        self.index.as_ref().map(|i| i.vector_store_id.as_str())
    }

    /// Uploaded file behind the bound index
    pub fn indexed_file(&self) -> Option<&IndexedFile> {
        self.index.as_ref()
    }

    /// Bumped after every successful upload
    pub fn upload_generation(&self) -> u64 {
        self.upload_generation
    }

    pub(crate) fn set_thread_id(&mut self, thread_id: String) {
        self.thread_id = Some(thread_id);
    }

    /// Record a newly bound index, returning the one it replaces
    pub(crate) fn replace_index(&mut self, index: IndexedFile) -> Option<IndexedFile> {
        self.upload_generation += 1;
        self.index.replace(index)
    }

    /// Start over with a fresh id, empty history and no remote state.
    /// Returns the index that was bound so the caller can release it.
    pub fn reset(&mut self) -> Option<IndexedFile> {
        let previous = self.index.take();
        self.id = Uuid::new_v4();
        self.conversation.clear();
        self.thread_id = None;
        self.upload_generation += 1;
        previous
    }
}

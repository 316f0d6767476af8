//! Core types for assistants platform interactions

use serde::{Deserialize, Serialize};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Message roles accepted by a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A remote assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Assistant {
    /// Name for display, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A remote conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
}

/// A message as stored on a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub thread_id: String,
    pub role: Role,
}

/// An uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
}

/// When a vector store expires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiresAfter {
    /// Timestamp the countdown starts from (`last_active_at`)
    pub anchor: String,
    pub days: u32,
}

impl ExpiresAfter {
    /// Expire `days` after the store was last used
    pub fn days_after_last_use(days: u32) -> Self {
        Self {
            anchor: "last_active_at".to_string(),
            days,
        }
    }
}

impl Default for ExpiresAfter {
    fn default() -> Self {
        Self::days_after_last_use(1)
    }
}

/// Request to create a retrieval index over uploaded files
#[derive(Debug, Clone, Serialize)]
pub struct CreateVectorStore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Flat list of file ids to index
    pub file_ids: Vec<String>,
    pub expires_after: ExpiresAfter,
}

impl CreateVectorStore {
    /// Index a single uploaded file
    pub fn for_file(file_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            file_ids: vec![file_id.into()],
            expires_after: ExpiresAfter::default(),
        }
    }
}

/// A retrieval index (vector store)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStore {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A function call requested by a paused run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub function_name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
    /// Why the raw arguments could not be read as a JSON object; `arguments`
    /// is empty when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_error: Option<String>,
}

impl ToolCallRequest {
    /// Create a new tool call request
    pub fn new(
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            function_name: function_name.into(),
            arguments,
            argument_error: None,
        }
    }

    /// A call whose arguments arrived unreadable
    pub fn malformed(
        id: impl Into<String>,
        function_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            argument_error: Some(error.into()),
            ..Self::new(id, function_name, serde_json::Map::new())
        }
    }
}

/// The answer to one tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

impl ToolOutput {
    /// Create a tool output
    pub fn new(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            output: output.into(),
        }
    }
}

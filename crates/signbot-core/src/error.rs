//! Error types for signbot-core

use thiserror::Error;

/// Result type alias using signbot-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end or degrade a chat turn
#[derive(Error, Debug)]
pub enum Error {
    /// The platform could not be reached or rejected a required call.
    /// The turn halts; history keeps whatever was appended before the failure.
    #[error("Assistant service unavailable: {0}")]
    RemoteUnavailable(#[source] signbot_assistants::Error),

    /// Uploading, indexing or binding a file failed. The turn continues
    /// without retrieval.
    #[error("File could not be indexed: {0}")]
    IndexBindingFailed(#[source] signbot_assistants::Error),

    /// The reply stream ended early; partial text was kept
    #[error("Reply interrupted: {0}")]
    StreamInterrupted(String),

    /// A local attachment could not be read
    #[error("Attachment error: {0}")]
    Attachment(String),
}

impl Error {
    /// Whether the turn still produced an (interrupted) assistant reply
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::StreamInterrupted(_))
    }
}

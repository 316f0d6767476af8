//! signbot-core: chat session pipeline
//!
//! Owns the per-session state (conversation history, remote thread and
//! retrieval index), drives streaming runs against an
//! [`AssistantPlatform`](signbot_assistants::AssistantPlatform), answers tool
//! calls locally and publishes [`ChatEvent`]s for the presentation layer.

pub mod adapter;
pub mod assembler;
pub mod conversation;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod session;
pub mod tool;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AssistantAdapter, Attachment};
pub use assembler::ReplyAssembler;
pub use conversation::{Conversation, Turn};
pub use dispatcher::{DispatchState, ToolDispatcher};
pub use engine::{ChatConfig, ChatEngine, DEFAULT_RUN_TIMEOUT};
pub use error::{Error, Result};
pub use events::{ChatEvent, EventSender};
pub use handle::ChatHandle;
pub use session::{IndexedFile, Session};
pub use tool::{BoxedTool, INVALID_FUNCTION_OUTPUT, Tool, ToolRegistry, ToolResult};

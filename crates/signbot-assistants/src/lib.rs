//! signbot-assistants: client for the hosted assistants platform
//!
//! Wire types for threads, messages, runs, files and vector stores, the
//! run-event stream, and the [`AssistantPlatform`] trait with a reqwest-based
//! implementation.

pub mod error;
pub mod platform;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use platform::AssistantPlatform;
pub use stream::{RunEvent, RunEventStream};
pub use types::*;

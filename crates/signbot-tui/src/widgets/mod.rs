//! Widgets for the chat screen

pub mod input_box;
pub mod markdown;
pub mod message_list;
pub mod spinner;

pub use input_box::InputBox;
pub use message_list::{EntryKind, MessageList, TranscriptEntry, transcript_height};
pub use spinner::Spinner;

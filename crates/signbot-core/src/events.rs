//! Chat event types and their fan-out

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events emitted while a turn is processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user submission was accepted
    TurnStart { query: String },

    /// Something degraded but the turn continues
    Warning { message: String },

    /// An attachment was uploaded and bound to the thread
    FileIndexed {
        filename: String,
        vector_store_id: String,
        upload_generation: u64,
    },

    /// Full reply text so far
    ReplyUpdate { text: String },

    /// A local function call started
    ToolCallStart {
        tool_call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    /// A local function call finished
    ToolCallEnd {
        tool_call_id: String,
        tool_name: String,
        output: String,
        is_error: bool,
    },

    /// The assistant reply was stored in the conversation
    ReplyEnd { text: String, interrupted: bool },

    /// The turn failed
    Error { message: String },

    /// Processing of the submission finished, successfully or not
    TurnEnd,
}

impl ChatEvent {
    /// Check if this is the last event of a turn
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::TurnEnd)
    }
}

/// Delivers every event to every live subscriber.
///
/// Each subscriber gets its own unbounded queue: a reader that falls behind
/// sees events late, never skipped.
#[derive(Clone, Default)]
pub struct EventSender {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ChatEvent>>>>,
}

impl EventSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive all events sent from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send to every subscriber; receivers that were dropped are forgotten
    pub fn send(&self, event: ChatEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_gets_every_event() {
        let sender = EventSender::new();
        let mut first = sender.subscribe();
        let mut second = sender.subscribe();

        for i in 0..1000 {
            sender.send(ChatEvent::ReplyUpdate {
                text: i.to_string(),
            });
        }
        sender.send(ChatEvent::TurnEnd);

        for rx in [&mut first, &mut second] {
            let mut count = 0;
            let mut last = None;
            while let Ok(event) = rx.try_recv() {
                count += 1;
                last = Some(event);
            }
            assert_eq!(count, 1001);
            assert!(last.is_some_and(|e| e.is_terminal()));
        }
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let sender = EventSender::new();
        let kept = sender.subscribe();
        drop(sender.subscribe());
        assert_eq!(sender.subscriber_count(), 2);

        sender.send(ChatEvent::TurnEnd);
        assert_eq!(sender.subscriber_count(), 1);
        drop(kept);
    }
}

//! The chat turn pipeline

use futures::StreamExt;
use signbot_assistants::{AssistantPlatform, Role, RunEvent, RunEventStream};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::adapter::{AssistantAdapter, Attachment};
use crate::assembler::ReplyAssembler;
use crate::conversation::Turn;
use crate::dispatcher::ToolDispatcher;
use crate::error::{Error, Result};
use crate::events::{ChatEvent, EventSender};
use crate::handle::ChatHandle;
use crate::session::Session;
use crate::tool::ToolRegistry;

/// Wall-clock limit for one run, tool resumptions included
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(300);

/// Engine configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Assistant every run is started with
    pub assistant_id: String,
    pub run_timeout: Duration,
}

impl ChatConfig {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }
}

/// Drives one chat session: each [`submit`](Self::submit) appends the user
/// turn, starts a streaming run, answers tool calls and stores the reply.
pub struct ChatEngine {
    config: ChatConfig,
    session: Session,
    adapter: AssistantAdapter,
    dispatcher: ToolDispatcher,
    assembler: ReplyAssembler,
    event_tx: EventSender,
    handle: ChatHandle,
}

impl ChatEngine {
    pub fn new(
        config: ChatConfig,
        platform: Arc<dyn AssistantPlatform>,
        registry: ToolRegistry,
    ) -> Self {
        let event_tx = EventSender::new();
        Self {
            config,
            session: Session::new(),
            adapter: AssistantAdapter::new(platform),
            dispatcher: ToolDispatcher::new(Arc::new(registry), event_tx.clone()),
            assembler: ReplyAssembler::new(),
            event_tx,
            handle: ChatHandle::new(),
        }
    }

    /// Subscribe to chat events. Nothing is dropped for a slow subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Conversation so far
    pub fn turns(&self) -> &[Turn] {
        self.session.conversation().all()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.dispatcher.registry().names()
    }

    /// Get a cloneable handle for aborting runs from outside
    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Drop history and remote state; the next submission opens a new thread
    pub async fn new_conversation(&mut self) {
        let previous = self.session.reset();
        tracing::info!(session = %self.session.id(), "started new conversation");
        if let Some(index) = previous {
            self.adapter.discard_index(&index).await;
        }
    }

    /// Process one user submission and return the stored reply.
    ///
    /// Every outcome is also published as [`ChatEvent`]s, ending with
    /// [`ChatEvent::TurnEnd`]. Taking `&mut self` keeps turns one at a time;
    /// the presentation layer refuses input through [`ChatHandle::is_running`].
    pub async fn submit(&mut self, query: &str, attachment: Option<Attachment>) -> Result<String> {
        let (_running, cancel) = self.handle.begin();

        self.event_tx.send(ChatEvent::TurnStart {
            query: query.to_string(),
        });

        let result = self.run_turn(query, attachment, &cancel).await;

        if let Err(e) = &result {
            tracing::error!(session = %self.session.id(), "turn failed: {}", e);
            self.event_tx.send(ChatEvent::Error {
                message: e.to_string(),
            });
        }
        self.event_tx.send(ChatEvent::TurnEnd);

        result
    }

    async fn run_turn(
        &mut self,
        query: &str,
        attachment: Option<Attachment>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let thread_id = self.adapter.ensure_thread(&mut self.session).await?;
        self.session.conversation_mut().append(Turn::user(query));
        tracing::info!(session = %self.session.id(), thread_id, "user turn appended");

        if let Some(attachment) = attachment {
            self.index_attachment(&attachment).await;
        }

        self.adapter
            .attach_message(&thread_id, Role::User, query)
            .await?;
        let stream = self
            .adapter
            .start_run(&thread_id, &self.config.assistant_id)
            .await?;

        self.assembler.reset();
        let outcome = self.consume(&thread_id, stream, cancel).await;
        let text = self.assembler.take();

        match outcome {
            Ok(()) => {
                self.session
                    .conversation_mut()
                    .append(Turn::assistant(text.clone()));
                tracing::info!(chars = text.len(), "assistant turn appended");
                self.event_tx.send(ChatEvent::ReplyEnd {
                    text: text.clone(),
                    interrupted: false,
                });
                Ok(text)
            }
            Err(reason) => {
                self.session
                    .conversation_mut()
                    .append(Turn::interrupted(text.clone()));
                tracing::warn!(chars = text.len(), "reply interrupted: {}", reason);
                self.event_tx.send(ChatEvent::ReplyEnd {
                    text,
                    interrupted: true,
                });
                Err(Error::StreamInterrupted(reason))
            }
        }
    }

    async fn index_attachment(&mut self, attachment: &Attachment) {
        match self.adapter.index_file(&mut self.session, attachment).await {
            Ok(vector_store_id) => {
                self.event_tx.send(ChatEvent::FileIndexed {
                    filename: attachment.filename.clone(),
                    vector_store_id,
                    upload_generation: self.session.upload_generation(),
                });
            }
            Err(e) => {
                tracing::warn!("continuing without retrieval: {}", e);
                self.event_tx.send(ChatEvent::Warning {
                    message: format!("{}; answering without it", e),
                });
            }
        }
    }

    /// Pull run events until the run completes. `Err` carries the reason the
    /// stream stopped early.
    async fn consume(
        &mut self,
        thread_id: &str,
        mut stream: RunEventStream,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), String> {
        let deadline = tokio::time::Instant::now() + self.config.run_timeout;
        let timeout_secs = self.config.run_timeout.as_secs_f32();
        let timed_out = move || format!("no completion within {:.1} seconds", timeout_secs);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err("aborted".to_string()),
                _ = tokio::time::sleep_until(deadline) => return Err(timed_out()),
                next = stream.next() => next,
            };

            let Some(event) = next else {
                return Ok(());
            };

            match event {
                RunEvent::RunCreated { run_id } => {
                    tracing::debug!(run_id, "run created");
                }
                RunEvent::TextDelta { delta } => {
                    let text = self.assembler.push(&delta).to_string();
                    self.event_tx.send(ChatEvent::ReplyUpdate { text });
                }
                RunEvent::RequiresAction { run_id, tool_calls } => {
                    let resumed = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err("aborted".to_string()),
                        resumed = tokio::time::timeout_at(
                            deadline,
                            self.dispatcher.dispatch(&self.adapter, thread_id, &run_id, &tool_calls, cancel),
                        ) => resumed,
                    };
                    stream = match resumed {
                        Ok(Ok(stream)) => stream,
                        Ok(Err(e)) => return Err(format!("tool outputs were not accepted: {}", e)),
                        Err(_) => return Err(timed_out()),
                    };
                }
                RunEvent::Completed { run_id } => {
                    tracing::debug!(run_id, "run completed");
                    return Ok(());
                }
                RunEvent::Failed { run_id, message } => {
                    tracing::debug!(run_id, "run ended early");
                    return Err(message);
                }
                RunEvent::Error { message } => return Err(message),
                RunEvent::Done => return Ok(()),
            }
        }
    }
}

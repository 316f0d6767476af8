//! Answering tool calls of a paused run

use signbot_assistants::{RunEventStream, ToolCallRequest, ToolOutput};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::adapter::AssistantAdapter;
use crate::events::{ChatEvent, EventSender};
use crate::tool::{ToolRegistry, ToolResult};

/// Where the dispatcher is in answering a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    /// Running local functions
    Collecting,
    /// Waiting for the platform to accept the outputs
    Submitting,
}

/// Runs requested functions and resumes the run with their outputs
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    event_tx: EventSender,
    state: DispatchState,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, event_tx: EventSender) -> Self {
        Self {
            registry,
            event_tx,
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Produce exactly one output per distinct call id, in request order
    pub async fn collect(
        &mut self,
        calls: &[ToolCallRequest],
        cancel: &CancellationToken,
    ) -> Vec<ToolOutput> {
        self.state = DispatchState::Collecting;
        let mut seen = HashSet::new();
        let mut outputs = Vec::with_capacity(calls.len());

        for call in calls {
            if !seen.insert(call.id.as_str()) {
                tracing::debug!(tool_call_id = %call.id, "duplicate tool call id, already answered");
                continue;
            }

            let arguments = serde_json::Value::Object(call.arguments.clone());
            self.event_tx.send(ChatEvent::ToolCallStart {
                tool_call_id: call.id.clone(),
                tool_name: call.function_name.clone(),
                arguments: arguments.clone(),
            });

            let result = match &call.argument_error {
                Some(err) if self.registry.get(&call.function_name).is_some() => {
                    ToolResult::error(format!("Invalid arguments: {}", err))
                }
                _ => {
                    self.registry
                        .execute(&call.id, &call.function_name, arguments, cancel.clone())
                        .await
                }
            };

            self.event_tx.send(ChatEvent::ToolCallEnd {
                tool_call_id: call.id.clone(),
                tool_name: call.function_name.clone(),
                output: result.output.clone(),
                is_error: result.is_error,
            });

            outputs.push(ToolOutput::new(call.id.clone(), result.output));
        }

        outputs
    }

    /// Answer a `requires_action` batch and return the resumed event source.
    /// A failed submission is returned as is; it is not retried.
    pub async fn dispatch(
        &mut self,
        adapter: &AssistantAdapter,
        thread_id: &str,
        run_id: &str,
        calls: &[ToolCallRequest],
        cancel: &CancellationToken,
    ) -> signbot_assistants::Result<RunEventStream> {
        let outputs = self.collect(calls, cancel).await;

        self.state = DispatchState::Submitting;
        tracing::info!(run_id, count = outputs.len(), "submitting tool outputs");
        let result = adapter
            .submit_tool_outputs(thread_id, run_id, &outputs)
            .await;
        self.state = DispatchState::Idle;

        if let Err(e) = &result {
            tracing::error!(run_id, "tool output submission failed: {}", e);
        }
        result
    }
}

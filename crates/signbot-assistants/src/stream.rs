//! Run event types and server-sent event parsing

use crate::error::{Error, Result};
use crate::types::ToolCallRequest;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a run is streaming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// The run was created on the thread
    RunCreated { run_id: String },
    /// Incremental reply text
    TextDelta { delta: String },
    /// The run is paused until every listed tool call is answered
    RequiresAction {
        run_id: String,
        tool_calls: Vec<ToolCallRequest>,
    },
    /// The run finished successfully
    Completed { run_id: String },
    /// The run ended without completing (failed, cancelled, expired, incomplete)
    Failed { run_id: String, message: String },
    /// Error reported by the platform or the transport
    Error { message: String },
    /// End of the event source
    Done,
}

/// A stream of run events
pub type RunEventStream = Pin<Box<dyn Stream<Item = RunEvent> + Send>>;

/// Parse one server-sent event into a [`RunEvent`].
///
/// Returns `Ok(None)` for event kinds the chat pipeline does not consume
/// (step and message lifecycle notifications).
pub fn parse_event(event: &str, data: &str) -> Result<Option<RunEvent>> {
    let parsed = match event {
        "thread.run.created" => {
            let run: RunObject = serde_json::from_str(data)?;
            Some(RunEvent::RunCreated { run_id: run.id })
        }
        "thread.message.delta" => {
            let delta: MessageDeltaObject = serde_json::from_str(data)?;
            let text: String = delta
                .delta
                .content
                .into_iter()
                .filter_map(|block| match block {
                    DeltaBlock::Text { text } => text.value,
                    DeltaBlock::Other => None,
                })
                .collect();
            if text.is_empty() {
                None
            } else {
                Some(RunEvent::TextDelta { delta: text })
            }
        }
        "thread.run.requires_action" => {
            let run: RunObject = serde_json::from_str(data)?;
            let action = run.required_action.ok_or_else(|| {
                Error::UnexpectedResponse(format!("run {} requires action but lists none", run.id))
            })?;
            let tool_calls = action
                .submit_tool_outputs
                .tool_calls
                .into_iter()
                .map(|tc| match parse_arguments(&tc.id, &tc.function.arguments) {
                    Ok(arguments) => ToolCallRequest::new(tc.id, tc.function.name, arguments),
                    Err(e) => ToolCallRequest::malformed(tc.id, tc.function.name, e),
                })
                .collect();
            Some(RunEvent::RequiresAction {
                run_id: run.id,
                tool_calls,
            })
        }
        "thread.run.completed" => {
            let run: RunObject = serde_json::from_str(data)?;
            Some(RunEvent::Completed { run_id: run.id })
        }
        "thread.run.failed"
        | "thread.run.cancelled"
        | "thread.run.expired"
        | "thread.run.incomplete" => {
            let run: RunObject = serde_json::from_str(data)?;
            let message = match run.last_error {
                Some(err) => format!("{} ({})", err.message, err.code),
                None => format!(
                    "run {}",
                    run.status.as_deref().unwrap_or(event.trim_start_matches("thread.run."))
                ),
            };
            Some(RunEvent::Failed {
                run_id: run.id,
                message,
            })
        }
        "error" => {
            let message = match serde_json::from_str::<StreamError>(data) {
                Ok(StreamError::Wrapped { error }) => error.message,
                Ok(StreamError::Bare(err)) => err.message,
                Err(_) => data.to_string(),
            };
            Some(RunEvent::Error { message })
        }
        "done" => Some(RunEvent::Done),
        _ => None,
    };

    Ok(parsed)
}

/// Function arguments arrive as a JSON-encoded string. An empty string
/// means no arguments.
fn parse_arguments(
    call_id: &str,
    raw: &str,
) -> std::result::Result<serde_json::Map<String, serde_json::Value>, String> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }
    let reason = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected a JSON object, got {}", other),
        Err(e) => format!("not valid JSON ({})", e),
    };
    tracing::warn!(call_id, "unreadable tool call arguments: {}", reason);
    Err(reason)
}

// Wire shapes

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    required_action: Option<RequiredAction>,
    #[serde(default)]
    last_error: Option<LastError>,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct LastError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaObject {
    delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    content: Vec<DeltaBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DeltaBlock {
    Text { text: TextDelta },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamError {
    Wrapped { error: ErrorObject },
    Bare(ErrorObject),
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    message: String,
}

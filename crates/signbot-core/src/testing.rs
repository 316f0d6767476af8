//! In-memory platform for exercising the chat pipeline

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use signbot_assistants::{
    Assistant, AssistantPlatform, CreateVectorStore, Error, FileObject, Result, Role, RunEvent,
    RunEventStream, Thread, ThreadMessage, ToolCallRequest, ToolOutput, VectorStore,
};
use std::collections::{HashSet, VecDeque};

/// One scripted event source: its events, and whether it stalls afterwards
struct Script {
    events: Vec<RunEvent>,
    stall: bool,
}

pub(crate) struct MockPlatform {
    calls: Mutex<Vec<String>>,
    failing: HashSet<&'static str>,
    scripts: Mutex<VecDeque<Script>>,
    messages: Mutex<Vec<(Role, String)>>,
    submitted: Mutex<Vec<Vec<ToolOutput>>>,
    deleted: Mutex<Vec<String>>,
    deleted_files: Mutex<Vec<String>>,
    counter: Mutex<u32>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            scripts: Mutex::new(VecDeque::new()),
            messages: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            deleted_files: Mutex::new(Vec::new()),
            counter: Mutex::new(0),
        }
    }

    /// Make the named operation return an error
    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing.insert(op);
        self
    }

    /// Queue the events returned by the next `create_run`/`submit_tool_outputs`
    pub fn script(self, events: Vec<RunEvent>) -> Self {
        self.scripts.lock().push_back(Script {
            events,
            stall: false,
        });
        self
    }

    /// Like [`script`](Self::script) but the source never ends
    pub fn script_stalling(self, events: Vec<RunEvent>) -> Self {
        self.scripts.lock().push_back(Script {
            events,
            stall: true,
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == op).count()
    }

    pub fn messages(&self) -> Vec<(Role, String)> {
        self.messages.lock().clone()
    }

    pub fn submitted(&self) -> Vec<Vec<ToolOutput>> {
        self.submitted.lock().clone()
    }

    pub fn deleted_stores(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn deleted_files(&self) -> Vec<String> {
        self.deleted_files.lock().clone()
    }

    fn record(&self, op: &'static str) -> Result<u32> {
        self.calls.lock().push(op.to_string());
        if self.failing.contains(op) {
            return Err(Error::api("mock_error", format!("{} failed", op)));
        }
        let mut counter = self.counter.lock();
        *counter += 1;
        Ok(*counter)
    }

    fn next_stream(&self) -> RunEventStream {
        let script = self.scripts.lock().pop_front().unwrap_or(Script {
            events: vec![RunEvent::Done],
            stall: false,
        });
        let events = futures::stream::iter(script.events);
        if script.stall {
            Box::pin(events.chain(futures::stream::pending()))
        } else {
            Box::pin(events)
        }
    }
}

#[async_trait]
impl AssistantPlatform for MockPlatform {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        self.record("retrieve_assistant")?;
        Ok(Assistant {
            id: assistant_id.to_string(),
            name: Some("SignBot".into()),
            model: None,
            instructions: None,
        })
    }

    async fn create_thread(&self) -> Result<Thread> {
        let n = self.record("create_thread")?;
        Ok(Thread {
            id: format!("thread_{}", n),
            created_at: 0,
        })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ThreadMessage> {
        let n = self.record("create_message")?;
        self.messages.lock().push((role, content.to_string()));
        Ok(ThreadMessage {
            id: format!("msg_{}", n),
            thread_id: thread_id.to_string(),
            role,
        })
    }

    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<FileObject> {
        let n = self.record("upload_file")?;
        Ok(FileObject {
            id: format!("file_{}", n),
            filename: filename.to_string(),
            bytes: bytes.len() as u64,
        })
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.record("delete_file")?;
        self.deleted_files.lock().push(file_id.to_string());
        Ok(())
    }

    async fn create_vector_store(&self, request: &CreateVectorStore) -> Result<VectorStore> {
        let n = self.record("create_vector_store")?;
        Ok(VectorStore {
            id: format!("vs_{}", n),
            name: request.name.clone(),
            status: None,
        })
    }

    async fn delete_vector_store(&self, vector_store_id: &str) -> Result<()> {
        self.record("delete_vector_store")?;
        self.deleted.lock().push(vector_store_id.to_string());
        Ok(())
    }

    async fn bind_vector_stores(
        &self,
        thread_id: &str,
        _vector_store_ids: &[String],
    ) -> Result<Thread> {
        self.record("bind_vector_stores")?;
        Ok(Thread {
            id: thread_id.to_string(),
            created_at: 0,
        })
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<RunEventStream> {
        self.record("create_run")?;
        Ok(self.next_stream())
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<RunEventStream> {
        self.record("submit_tool_outputs")?;
        self.submitted.lock().push(outputs.to_vec());
        Ok(self.next_stream())
    }
}

pub(crate) fn delta(text: &str) -> RunEvent {
    RunEvent::TextDelta {
        delta: text.to_string(),
    }
}

pub(crate) fn completed() -> RunEvent {
    RunEvent::Completed {
        run_id: "run_1".to_string(),
    }
}

pub(crate) fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCallRequest {
    let arguments = match arguments {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    ToolCallRequest::new(id, name, arguments)
}

pub(crate) fn requires_action(calls: Vec<ToolCallRequest>) -> RunEvent {
    RunEvent::RequiresAction {
        run_id: "run_1".to_string(),
        tool_calls: calls,
    }
}

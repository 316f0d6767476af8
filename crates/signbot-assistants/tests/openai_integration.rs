use futures::StreamExt;
use signbot_assistants::{
    AssistantPlatform, CreateVectorStore, Error, Role, RunEvent, ToolOutput,
    platform::openai::OpenAIAssistants,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenAIAssistants {
    OpenAIAssistants::new("sk-test").with_base_url(format!("{}/v1", server.uri()))
}

fn sse(events: &[(&str, &str)]) -> String {
    events
        .iter()
        .map(|(event, data)| format!("event: {}\ndata: {}\n\n", event, data))
        .collect()
}

#[tokio::test]
async fn create_thread_sends_auth_and_beta_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("openai-beta", "assistants=v2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "thread_1", "created_at": 1700000000})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let thread = client(&server).create_thread().await.unwrap();
    assert_eq!(thread.id, "thread_1");
}

#[tokio::test]
async fn retrieve_assistant_unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/assistants/asst_1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"type": "invalid_request_error", "message": "Incorrect API key provided"}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .retrieve_assistant("asst_1")
        .await
        .unwrap_err();
    assert!(err.is_auth(), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn create_message_posts_role_and_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/messages"))
        .and(body_json(serde_json::json!({"role": "user", "content": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_1", "thread_id": "thread_1", "role": "user"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let message = client(&server)
        .create_message("thread_1", Role::User, "hello")
        .await
        .unwrap();
    assert_eq!(message.id, "msg_1");
    assert_eq!(message.role, Role::User);
}

#[tokio::test]
async fn create_vector_store_sends_flat_file_ids() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/vector_stores"))
        .and(body_json(serde_json::json!({
            "name": "manual.pdf",
            "file_ids": ["file-1"],
            "expires_after": {"anchor": "last_active_at", "days": 1}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "vs_1", "status": "in_progress"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = client(&server)
        .create_vector_store(&CreateVectorStore::for_file("file-1", "manual.pdf"))
        .await
        .unwrap();
    assert_eq!(store.id, "vs_1");
}

#[tokio::test]
async fn upload_file_is_multipart() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-9", "filename": "notes.txt", "bytes": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = client(&server)
        .upload_file("notes.txt", b"hello".to_vec())
        .await
        .unwrap();
    assert_eq!(file.id, "file-9");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"purpose\""));
    assert!(body.contains("assistants"));
    assert!(body.contains("filename=\"notes.txt\""));
}

#[tokio::test]
async fn create_run_streams_parsed_events() {
    let server = MockServer::start().await;

    let body = sse(&[
        ("thread.run.created", r#"{"id":"run_1","status":"queued"}"#),
        (
            "thread.run.step.created",
            r#"{"id":"step_1","run_id":"run_1"}"#,
        ),
        (
            "thread.message.delta",
            r#"{"id":"msg_1","delta":{"content":[{"index":0,"type":"text","text":{"value":"Hel"}}]}}"#,
        ),
        (
            "thread.message.delta",
            r#"{"id":"msg_1","delta":{"content":[{"index":0,"type":"text","text":{"value":"lo"}}]}}"#,
        ),
        (
            "thread.run.completed",
            r#"{"id":"run_1","status":"completed"}"#,
        ),
        ("done", "[DONE]"),
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs"))
        .and(body_json(
            serde_json::json!({"assistant_id": "asst_1", "stream": true}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let stream = client(&server)
        .create_run("thread_1", "asst_1")
        .await
        .unwrap();
    let events: Vec<RunEvent> = stream.collect().await;

    assert_eq!(
        events,
        vec![
            RunEvent::RunCreated {
                run_id: "run_1".into()
            },
            RunEvent::TextDelta {
                delta: "Hel".into()
            },
            RunEvent::TextDelta { delta: "lo".into() },
            RunEvent::Completed {
                run_id: "run_1".into()
            },
            RunEvent::Done,
        ]
    );
}

#[tokio::test]
async fn create_run_rejected_before_streaming() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"type": "invalid_request_error", "message": "Thread already has an active run"}
        })))
        .mount(&server)
        .await;

    let result = client(&server).create_run("thread_1", "asst_1").await;
    match result {
        Err(Error::Api { message, .. }) => assert!(message.contains("active run")),
        Err(other) => panic!("expected Api error, got {:?}", other),
        Ok(_) => panic!("expected the run to be rejected"),
    }
}

#[tokio::test]
async fn submit_tool_outputs_resumes_stream() {
    let server = MockServer::start().await;

    let body = sse(&[
        (
            "thread.message.delta",
            r#"{"id":"msg_2","delta":{"content":[{"index":0,"type":"text","text":{"value":"It is noon."}}]}}"#,
        ),
        (
            "thread.run.completed",
            r#"{"id":"run_1","status":"completed"}"#,
        ),
        ("done", "[DONE]"),
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs/run_1/submit_tool_outputs"))
        .and(body_json(serde_json::json!({
            "tool_outputs": [{"tool_call_id": "call_1", "output": "12:00:00"}],
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let stream = client(&server)
        .submit_tool_outputs("thread_1", "run_1", &[ToolOutput::new("call_1", "12:00:00")])
        .await
        .unwrap();
    let events: Vec<RunEvent> = stream.collect().await;

    assert_eq!(
        events.first(),
        Some(&RunEvent::TextDelta {
            delta: "It is noon.".into()
        })
    );
    assert_eq!(events.last(), Some(&RunEvent::Done));
}

#[tokio::test]
async fn bind_and_delete_vector_store() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1"))
        .and(body_json(serde_json::json!({
            "tool_resources": {"file_search": {"vector_store_ids": ["vs_2"]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "thread_1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1/vector_stores/vs_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "vs_1", "object": "vector_store.deleted", "deleted": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let platform = client(&server);
    let thread = platform
        .bind_vector_stores("thread_1", &["vs_2".to_string()])
        .await
        .unwrap();
    assert_eq!(thread.id, "thread_1");
    platform.delete_vector_store("vs_1").await.unwrap();
}

#[tokio::test]
async fn delete_uploaded_file() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/files/file_9"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file_9", "object": "file", "deleted": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1/files/file_gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"type": "invalid_request_error", "message": "No such File object: file_gone"}
        })))
        .mount(&server)
        .await;

    let platform = client(&server);
    platform.delete_file("file_9").await.unwrap();
    let err = platform.delete_file("file_gone").await.unwrap_err();
    assert!(err.to_string().contains("file_gone"));
}

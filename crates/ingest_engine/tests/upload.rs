use std::sync::{Arc, Mutex};
use std::time::Duration;

use ingest_core::{EventType, StepEvent};
use ingest_engine::{FailureKind, ReqwestUploader, StepSink, UploadSettings, Uploader};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<StepEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<StepEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl StepSink for TestSink {
    fn emit(&self, event: StepEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn uploader_for(server: &MockServer) -> ReqwestUploader {
    ReqwestUploader::new(UploadSettings {
        endpoint: format!("{}/api/upload", server.uri()),
        ..UploadSettings::default()
    })
}

fn sse(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|p| format!("data: {p}\n\n"))
        .collect()
}

#[tokio::test]
async fn streams_step_events_in_order() {
    let server = MockServer::start().await;
    let body = sse(&[
        r#"{"step":"Get_Document_Content","type":"WAITING","message":{}}"#,
        r#"{"step":"Get_Document_Content","type":"RESULT","message":{"slate":{}}}"#,
        r#"{"step":"Summarize","type":"LOG","message":"done"}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(query_param("select-openai", "true"))
        .and(header("accept", "text/event-stream"))
        .and(body_string_contains("filename=\"lease.txt\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let summary = uploader_for(&server)
        .upload("lease.txt", b"tenant pays".to_vec(), &sink, &CancellationToken::new())
        .await
        .expect("upload ok");

    assert_eq!(summary.events, 3);
    let events = sink.take();
    assert_eq!(
        events,
        vec![
            StepEvent::new("Get_Document_Content", EventType::Waiting, json!({})),
            StepEvent::new(
                "Get_Document_Content",
                EventType::Result,
                json!({"slate": {}})
            ),
            StepEvent::new("Summarize", EventType::Log, json!("done")),
        ]
    );
}

#[tokio::test]
async fn malformed_frame_halts_the_stream() {
    let server = MockServer::start().await;
    let body = sse(&[
        r#"{"step":"a","type":"WAITING"}"#,
        "{not valid json",
        r#"{"step":"a","type":"RESULT"}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let err = uploader_for(&server)
        .upload("doc.md", Vec::new(), &sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Parse);
    assert_eq!(sink.take().len(), 1);
}

#[tokio::test]
async fn http_failure_is_reported_before_any_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let err = uploader_for(&server)
        .upload("doc.md", Vec::new(), &sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn empty_response_is_missing_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = uploader_for(&server)
        .upload("doc.md", Vec::new(), &TestSink::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::MissingBody);
}

#[tokio::test]
async fn trailing_partial_frame_is_not_emitted() {
    let server = MockServer::start().await;
    let mut body = sse(&[r#"{"step":"a","type":"LOG","message":"x"}"#]);
    body.push_str(r#"data: {"step":"b","type":"LOG"}"#);
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let summary = uploader_for(&server)
        .upload("doc.md", Vec::new(), &sink, &CancellationToken::new())
        .await
        .expect("clean end");
    assert_eq!(summary.events, 1);
    assert_eq!(sink.take()[0].step, "a");
}

#[tokio::test]
async fn cancellation_abandons_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_raw(sse(&[r#"{"step":"a","type":"LOG"}"#]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let sink = TestSink::default();
    let err = uploader_for(&server)
        .upload("doc.md", Vec::new(), &sink, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let uploader = ReqwestUploader::new(UploadSettings {
        endpoint: "http://127.0.0.1:9/api/upload".to_string(),
        connect_timeout: Duration::from_millis(200),
        ..UploadSettings::default()
    });
    let err = uploader
        .upload("doc.md", Vec::new(), &TestSink::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::Transport | FailureKind::Timeout));
}

/// Serves one chunked event-stream response that breaks off in the middle of
/// its second chunk.
async fn serve_truncated_stream(listener: tokio::net::TcpListener) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (mut socket, _) = listener.accept().await.unwrap();
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    // The multipart body ends with the closing boundary `--<boundary>--\r\n`,
    // followed by the last-chunk marker if the body was sent chunked.
    while !(request.ends_with(b"--\r\n") || request.ends_with(b"\r\n0\r\n\r\n")) {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let frame = "data: {\"step\":\"Parse\",\"type\":\"WAITING\",\"message\":{}}\n\n";
    let head = "HTTP/1.1 200 OK\r\n\
                Content-Type: text/event-stream\r\n\
                Transfer-Encoding: chunked\r\n\r\n";
    socket.write_all(head.as_bytes()).await.unwrap();
    socket
        .write_all(format!("{:x}\r\n{frame}\r\n", frame.len()).as_bytes())
        .await
        .unwrap();
    socket.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Announce 0x100 bytes, send a few, then hang up.
    socket.write_all(b"100\r\ndata: {\"st").await.unwrap();
    socket.flush().await.unwrap();
    drop(socket);
}

#[tokio::test]
async fn connection_lost_mid_stream_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_truncated_stream(listener));

    let uploader = ReqwestUploader::new(UploadSettings {
        endpoint: format!("http://{addr}/api/upload"),
        ..UploadSettings::default()
    });
    let sink = TestSink::default();
    let err = uploader
        .upload("lease.txt", b"tenant pays".to_vec(), &sink, &CancellationToken::new())
        .await
        .unwrap_err();
    server.await.unwrap();

    assert_eq!(err.kind, FailureKind::Transport);
    assert_eq!(
        sink.take(),
        vec![StepEvent::new("Parse", EventType::Waiting, json!({}))]
    );
}

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chatline_core::{
    message::{Message, Transcript},
    model::{Effort, Model, OpenAiModel},
    provider::{FailureKind, ReplyEvent, ReplyHandle, StreamingChatProvider},
    settings::Settings,
};
use chatline_openai::StreamingClient;
use futures_util::StreamExt;
use serde_json::json;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn chunk(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({ "id": "c1", "object": "chat.completion.chunk", "choices": [{ "index": 0, "delta": { "content": content } }] })
    )
}

fn hi() -> Transcript {
    Transcript::from_messages(vec![Message::user("Hi")]).unwrap()
}

fn settings() -> Settings {
    Settings::new("sk-test")
}

fn client(base: &str) -> StreamingClient {
    StreamingClient::builder().with_base_url(base).build().unwrap()
}

async fn collect(handle: ReplyHandle) -> Vec<ReplyEvent> {
    handle.collect().await
}

fn failure(events: &[ReplyEvent]) -> &chatline_core::provider::Failure {
    match events.last() {
        Some(ReplyEvent::Failed(failure)) => failure,
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[tokio::test]
async fn streams_cumulative_deltas_until_done() {
    let server = MockServer::start().await;
    let body = format!("{}{}{}data: [DONE]\n\n", chunk("He"), chunk("llo"), chunk("!"));

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-5-mini",
            "stream": true,
            "reasoning_effort": "medium",
            "messages": [{ "role": "user", "content": "Hi" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&format!("{}/v1", server.uri()));
    let events = collect(client.start(&hi(), &settings()).unwrap()).await;

    assert_eq!(
        events,
        vec![
            ReplyEvent::Delta("He".into()),
            ReplyEvent::Delta("Hello".into()),
            ReplyEvent::Delta("Hello!".into()),
            ReplyEvent::Completed("Hello!".into()),
        ]
    );
}

#[tokio::test]
async fn malformed_lines_are_skipped() {
    let server = MockServer::start().await;
    let body = format!(
        "{}data: {{broken\n\n: ping\n\n{}data: [DONE]\n\n",
        chunk("a"),
        chunk("b")
    );

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let events = collect(client(&server.uri()).start(&hi(), &settings()).unwrap()).await;
    assert_eq!(events.last(), Some(&ReplyEvent::Completed("ab".into())));
    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn stream_without_sentinel_completes_at_end_of_body() {
    let server = MockServer::start().await;
    let body = format!("{}{}", chunk("no "), chunk("sentinel").trim_end());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let events = collect(client(&server.uri()).start(&hi(), &settings()).unwrap()).await;
    assert_eq!(events.last(), Some(&ReplyEvent::Completed("no sentinel".into())));
}

#[tokio::test]
async fn legacy_models_send_sampling_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "temperature": 1.0,
            "top_p": 1.0
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("data: [DONE]\n\n", "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings()
        .with_model(Model::OpenAi(OpenAiModel::Gpt4))
        .with_effort(Effort::High);
    let events = collect(client(&server.uri()).start(&hi(), &settings).unwrap()).await;
    assert_eq!(events, vec![ReplyEvent::Completed(String::new())]);
}

#[tokio::test]
async fn missing_key_fails_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .start(&hi(), &Settings::new(""))
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Auth);
}

#[tokio::test]
async fn transcript_must_end_with_a_user_message() {
    let transcript =
        Transcript::from_messages(vec![Message::user("Hi"), Message::assistant("Hello")]).unwrap();

    let err = client("http://127.0.0.1:9").start(&transcript, &settings()).unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidRequest);
}

#[tokio::test]
async fn rejected_stream_falls_back_to_a_single_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "stream": false, "reasoning_effort": "medium" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c2",
            "object": "chat.completion",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Hello!" }, "finish_reason": "stop" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let events = collect(client(&server.uri()).start(&hi(), &settings()).unwrap()).await;
    assert_eq!(
        events,
        vec![
            ReplyEvent::Delta("Hello!".into()),
            ReplyEvent::Completed("Hello!".into()),
        ]
    );
}

#[tokio::test]
async fn auth_rejection_is_reported_after_one_fallback_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": { "message": "invalid key" } })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let events = collect(client(&server.uri()).start(&hi(), &settings()).unwrap()).await;

    assert_eq!(events.len(), 1);
    let failure = failure(&events);
    assert_eq!(failure.kind, FailureKind::Server);
    assert_eq!(failure.message, "invalid key");
    assert_eq!(failure.partial_text, "");
}

#[tokio::test]
async fn cancelling_before_the_first_poll_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let handle = client(&server.uri()).start(&hi(), &settings()).unwrap();
    handle.cancel();
    handle.cancel();

    let events = collect(handle).await;
    assert_eq!(events.len(), 1);
    assert!(failure(&events).is_aborted());
}

/// What the raw test server does after sending its chunks.
#[derive(Clone, Copy)]
enum Ending {
    /// Close the socket without the terminating zero-length chunk.
    Drop,
    /// Keep the connection open.
    Hang,
}

/// Minimal HTTP/1.1 server speaking chunked transfer encoding, for failure
/// modes a mock server cannot produce. Returns the base URL and a counter of
/// accepted connections.
async fn chunked_server(chunks: Vec<String>, ending: Ending) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let chunks = chunks.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
                socket.write_all(head.as_bytes()).await.unwrap();
                for chunk in chunks {
                    let framed = format!("{:x}\r\n{chunk}\r\n", chunk.len());
                    socket.write_all(framed.as_bytes()).await.unwrap();
                }
                socket.flush().await.unwrap();

                match ending {
                    Ending::Drop => {
                        let _ = socket.shutdown().await;
                    }
                    Ending::Hang => tokio::time::sleep(Duration::from_secs(30)).await,
                }
            });
        }
    });

    (format!("http://{addr}/v1"), hits)
}

/// Read one request and return its body.
async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];

    let head_end = loop {
        let n = socket.read(&mut tmp).await.unwrap();
        assert!(n > 0, "client closed before sending a request");
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut tmp).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    buf.split_off(head_end)
}

#[tokio::test]
async fn connection_drop_after_a_fragment_keeps_partial_text_without_fallback() {
    let (base, hits) = chunked_server(vec![chunk("Par")], Ending::Drop).await;

    let events = collect(client(&base).start(&hi(), &settings()).unwrap()).await;

    assert_eq!(events.first(), Some(&ReplyEvent::Delta("Par".into())));
    let failure = failure(&events);
    assert_eq!(failure.kind, FailureKind::Transport);
    assert_eq!(failure.partial_text, "Par");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connection_drop_before_any_fragment_tries_the_fallback_once() {
    let (base, hits) = chunked_server(vec![], Ending::Drop).await;

    let events = collect(client(&base).start(&hi(), &settings()).unwrap()).await;

    assert_eq!(events.len(), 1);
    assert_eq!(failure(&events).kind, FailureKind::Transport);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn connection_drop_before_any_fragment_recovers_through_the_fallback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bodies = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = Arc::clone(&bodies);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let body = read_request(&mut socket).await;
                let first = {
                    let mut seen = seen.lock().unwrap();
                    seen.push(serde_json::from_slice::<serde_json::Value>(&body).unwrap());
                    seen.len() == 1
                };

                if first {
                    let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
                    socket.write_all(head.as_bytes()).await.unwrap();
                    let _ = socket.shutdown().await;
                } else {
                    let json = json!({
                        "choices": [{
                            "index": 0,
                            "message": { "role": "assistant", "content": "Recovered" },
                            "finish_reason": "stop"
                        }]
                    })
                    .to_string();
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{json}",
                        json.len()
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    socket.flush().await.unwrap();
                }
            });
        }
    });

    let base = format!("http://{addr}/v1");
    let events = collect(client(&base).start(&hi(), &settings()).unwrap()).await;

    assert_eq!(
        events,
        vec![
            ReplyEvent::Delta("Recovered".into()),
            ReplyEvent::Completed("Recovered".into()),
        ]
    );

    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["stream"], true);
    assert_eq!(bodies[1]["stream"], false);
    assert_eq!(bodies[0]["messages"], bodies[1]["messages"]);
}

#[tokio::test]
async fn cancel_after_a_delta_stops_the_stream() {
    let (base, _hits) = chunked_server(vec![chunk("Par")], Ending::Hang).await;

    let mut handle = client(&base).start(&hi(), &settings()).unwrap();
    assert_eq!(handle.next().await, Some(ReplyEvent::Delta("Par".into())));

    handle.cancel();
    let settled = tokio::time::timeout(Duration::from_secs(5), handle.next())
        .await
        .expect("cancellation settles promptly");

    match settled {
        Some(ReplyEvent::Failed(failure)) => {
            assert!(failure.is_aborted());
            assert_eq!(failure.partial_text, "Par");
        }
        other => panic!("expected an aborted failure, got {other:?}"),
    }
    assert!(handle.is_settled());
    assert_eq!(handle.next().await, None);

    handle.cancel();
    assert_eq!(handle.next().await, None);
}

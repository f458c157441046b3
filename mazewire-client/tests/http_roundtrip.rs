//! Dispatcher over the real HTTP transport against a minimal in-process API.

use async_trait::async_trait;
use mazewire_client::{
    ApiConfig, AuthPrompt, ClientConfig, Credentials, Dispatcher, HttpTransport, PromptConfig,
    RequestDescriptor, Value,
};
use mazewire_wire::{encode_hex, Envelope, MsgpackCodec};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

struct Received {
    head: String,
    body: Vec<u8>,
}

async fn read_request(sock: &mut TcpStream) -> Received {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = sock.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending a full request");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let len = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    let mut body = buf[head_end..].to_vec();
    while body.len() < len {
        let n = sock.read(&mut chunk).await.unwrap();
        body.extend_from_slice(&chunk[..n]);
    }
    Received { head, body }
}

fn response(status: &str, extra: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n",
        status,
        body.len(),
        extra
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Serves a login-protected `pages` endpoint until the test ends.
async fn spawn_api() -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/api/", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let codec = MsgpackCodec::new();
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let req = read_request(&mut sock).await;
            let request_line = req.head.lines().next().unwrap_or_default().to_string();
            let has_session = req.head.to_lowercase().contains("cookie: session=ok");
            let _ = tx.send(request_line.clone());

            let out = if request_line.starts_with("POST /api/auth ") {
                let creds = codec.decode(&req.body).unwrap();
                if creds.get("pass").and_then(Value::as_str) == Some("secret") {
                    let body = codec.encode_envelope(&Envelope::ok(Value::Nil)).unwrap();
                    response("200 OK", "Set-Cookie: session=ok; Path=/; HttpOnly\r\n", &body)
                } else {
                    response("400 Bad Request", "", b"Invalid credentials.")
                }
            } else if !has_session {
                response("403 Forbidden", "", b"")
            } else if request_line.starts_with("GET /api/pages?data=") {
                let page = Value::from_pairs([("title", Value::from("Home"))]);
                let envelope = Envelope::ok(Value::Array(vec![page])).with_warning("1 draft hidden");
                response("200 OK", "", &codec.encode_envelope(&envelope).unwrap())
            } else {
                response("404 Not Found", "", b"Not found.")
            };
            let _ = sock.write_all(&out).await;
            let _ = sock.shutdown().await;
        }
    });

    (base, rx)
}

struct CountingPrompt(AtomicUsize);

#[async_trait]
impl AuthPrompt for CountingPrompt {
    async fn credentials(&self, _: &PromptConfig, _: Option<&str>) -> Option<Credentials> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Some(Credentials::new("ann", "secret"))
    }
}

#[tokio::test]
async fn test_login_on_demand_then_retry() {
    let (base, mut seen) = spawn_api().await;

    let config = ClientConfig {
        api: ApiConfig {
            base_url: base,
            ..ApiConfig::default()
        },
        ..ClientConfig::default()
    };
    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    let prompt = Arc::new(CountingPrompt(AtomicUsize::new(0)));
    let dispatcher = Dispatcher::new(&config.api, transport.clone()).with_prompt(prompt.clone());

    let payload = Value::from_pairs([("limit", Value::Int(10))]);
    let expected_query = encode_hex(&MsgpackCodec::new().encode(&payload).unwrap());

    let body = dispatcher
        .dispatch(&RequestDescriptor::get("pages").with_payload(payload))
        .await
        .unwrap();

    let pages = body.as_array().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].get("title").and_then(Value::as_str), Some("Home"));
    assert_eq!(prompt.0.load(Ordering::SeqCst), 1);
    assert_eq!(transport.cookies().get("session").as_deref(), Some("ok"));

    let expected_get = format!("GET /api/pages?data={} HTTP/1.1", expected_query);
    assert_eq!(seen.recv().await.unwrap(), expected_get);
    assert_eq!(seen.recv().await.unwrap(), "POST /api/auth HTTP/1.1");
    assert_eq!(seen.recv().await.unwrap(), expected_get);

    // The session cookie carries over: no second prompt.
    dispatcher
        .dispatch(&RequestDescriptor::get("pages").with_payload(Value::map()))
        .await
        .unwrap();
    assert_eq!(prompt.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_endpoint_is_application_error() {
    let (base, _seen) = spawn_api().await;
    let config = ClientConfig {
        api: ApiConfig {
            base_url: base,
            ..ApiConfig::default()
        },
        ..ClientConfig::default()
    };
    let dispatcher = Dispatcher::new(
        &config.api,
        Arc::new(HttpTransport::new(&config).unwrap()),
    )
    .with_prompt(Arc::new(CountingPrompt(AtomicUsize::new(0))));

    let err = dispatcher
        .dispatch(&RequestDescriptor::post("nowhere", Value::map()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Not found.");
}

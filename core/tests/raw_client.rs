/*
 * raw_client.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for RawClient against an in-process HTTP/1.1 server thread.
 * The server replays canned responses, one per request, and records what it received.
 *
 * The HTTPS test needs network access and is ignored by default:
 *   cargo test -p rfc_http_client --test raw_client -- --ignored --nocapture
 */

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rustls::client::ResolvesClientCert;

use rfc_http_client::net::tls_client_config;
use rfc_http_client::{
    ClientConfig, ClientError, LogSink, QueryParams, RawClient, RequestBody, RequestOptions,
    Method, TlsIdentity,
};

/// Canned-response server. Each accepted connection serves requests until the queue is
/// empty, the client closes, or a response carries `Connection: close`.
struct MockServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    requests: Receiver<Vec<u8>>,
}

impl MockServer {
    fn start(responses: Vec<&'static [u8]>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
        let (tx, rx) = mpsc::channel();
        let counter = accepted.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let queue = queue.clone();
                let tx = tx.clone();
                thread::spawn(move || serve_connection(stream, queue, tx));
            }
        });
        Self {
            addr,
            accepted,
            requests: rx,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.addr.port(), path)
    }

    fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    fn next_request(&self) -> Vec<u8> {
        self.requests.recv_timeout(Duration::from_secs(5)).expect("no request received")
    }

    fn next_request_text(&self) -> String {
        String::from_utf8_lossy(&self.next_request()).into_owned()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn read_request(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let mut tmp = [0u8; 4096];
    let head_end = loop {
        if let Some(i) = find(buf, b"\r\n\r\n") {
            break i + 4;
        }
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + length {
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    Some(buf.drain(..head_end + length).collect())
}

fn serve_connection(mut stream: TcpStream, queue: Arc<Mutex<VecDeque<&'static [u8]>>>, tx: Sender<Vec<u8>>) {
    let mut buf = Vec::new();
    while let Some(request) = read_request(&mut stream, &mut buf) {
        let _ = tx.send(request);
        let Some(response) = queue.lock().unwrap().pop_front() else {
            return;
        };
        if stream.write_all(response).is_err() {
            return;
        }
        if find(response, b"Connection: close").is_some() {
            return;
        }
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<String>>);

impl LogSink for RecordingSink {
    fn debug(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.0.lock().unwrap().push(format!("error: {}", message));
    }
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Peer that answers anything with plain-text HTTP and hangs up, whatever the client sent.
fn plain_peer() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
        }
    });
    addr
}

#[test]
fn get_appends_params_to_existing_query() {
    let server = MockServer::start(vec![b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nX-Request-Id: 7\r\n\r\nok"]);
    let mut client = RawClient::new(&server.url("/api?x=1")).unwrap();
    let params = QueryParams::new().with("y", 2);
    let mut response = client.request_get(Some(&params), ";");

    let request = server.next_request_text();
    assert!(request.starts_with("GET /api?x=1;y=2 HTTP/1.1\r\n"), "{}", request);
    assert!(request.contains(&format!("Host: 127.0.0.1:{}\r\n", server.addr.port())));

    assert!(response.error().is_none(), "{:?}", response.error_message());
    assert_eq!(response.code(), Some(200));
    assert_eq!(response.reason(), Some("OK"));
    assert_eq!(response.header("X-Request-Id"), Some("7"));
    assert_eq!(response.header("x_request_id"), Some("7"));
    assert!(!response.is_readable());
    assert_eq!(response.body().map(|b| &b[..]), Some(&b"ok"[..]));
    assert_eq!(response.read(0).unwrap().as_deref(), Some(&b"ok"[..]));
    assert_eq!(response.read(0).unwrap(), None);
    assert_eq!(response.read(0).unwrap(), None);
}

#[test]
fn basic_auth_header_is_injected() {
    let server = MockServer::start(vec![b"HTTP/1.1 204 No Content\r\n\r\n"]);
    let url = format!("http://u:p@127.0.0.1:{}/", server.addr.port());
    let mut client = RawClient::new(&url).unwrap();
    let response = client.request_get(None, ";");
    assert_eq!(response.code(), Some(204));
    let request = server.next_request_text();
    assert!(request.contains("Authorization: Basic dTpw\r\n"), "{}", request);
}

#[test]
fn explicit_authorization_is_not_overridden() {
    let server = MockServer::start(vec![b"HTTP/1.1 204 No Content\r\n\r\n"]);
    let url = format!("http://u:p@127.0.0.1:{}/", server.addr.port());
    let mut client = RawClient::new(&url).unwrap();
    client.set_header("authorization", Some("Bearer token"), false);
    client.request_get(None, ";");
    let request = server.next_request_text();
    assert!(request.contains("Authorization: Bearer token\r\n"), "{}", request);
    assert!(!request.contains("Basic"));
}

#[test]
fn error_status_is_drained_and_connection_reused() {
    let server = MockServer::start(vec![
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\n\r\nnope",
        b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nyes",
    ]);
    let sink = Arc::new(RecordingSink::default());
    let mut client = RawClient::new(&server.url("/missing")).unwrap();
    client.set_log_handler(Some(sink.clone()));

    let mut missing = client.request_get(None, ";");
    assert_eq!(missing.code(), Some(404));
    assert!(matches!(missing.error(), Some(ClientError::Status { code: 404, .. })));
    assert_eq!(missing.error_message().as_deref(), Some("404 Not Found"));
    assert!(missing.body().is_none());
    assert!(missing.read(0).is_err());
    assert!(client.has_connection());

    let found = client.request_get(None, ";");
    assert_eq!(found.code(), Some(200));
    assert_eq!(found.body().map(|b| &b[..]), Some(&b"yes"[..]));
    assert_eq!(server.accepted(), 1);

    let messages = sink.0.lock().unwrap();
    assert!(messages.iter().any(|m| m == "RawClient::request() - GET /missing"));
    assert!(messages.iter().any(|m| m.contains("reporting: 404 for 'nope'")));
}

#[test]
fn streaming_reader_decodes_chunks() {
    let server = MockServer::start(vec![
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nhel\r\n8\r\nlo world\r\n0\r\n\r\n",
    ]);
    let config = ClientConfig {
        return_reader: true,
        ..Default::default()
    };
    let mut client = RawClient::with_config(&server.url("/stream"), config).unwrap();
    let mut response = client.request_get(None, ";");
    assert!(response.is_readable());
    assert!(response.body().is_none());

    let first = response.read(5).unwrap().unwrap();
    assert_eq!(&first[..], b"hello");
    let rest = response.read(0).unwrap().unwrap();
    assert_eq!(&rest[..], b" world");
    assert_eq!(response.read(0).unwrap(), None);
    assert_eq!(response.read(4).unwrap(), None);
    assert!(client.has_connection());
}

#[test]
fn reader_implements_io_read() {
    let server = MockServer::start(vec![b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world"]);
    let mut client = RawClient::new(&server.url("/")).unwrap();
    client.set_return_reader(true);
    let mut reader = client.request_get(None, ";").into_reader().unwrap();
    let mut body = String::new();
    reader.read_to_string(&mut body).unwrap();
    assert_eq!(body, "hello world");
    assert!(reader.is_finished());
}

#[test]
fn streaming_error_status_is_not_readable() {
    let server = MockServer::start(vec![b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\n\r\nboom"]);
    let mut client = RawClient::new(&server.url("/")).unwrap();
    client.set_return_reader(true);
    let mut response = client.request_get(None, ";");
    assert_eq!(response.code(), Some(500));
    assert!(!response.is_readable());
    assert_eq!(response.error_message().as_deref(), Some("500 Internal Server Error"));
    assert!(matches!(response.read(0), Err(ClientError::Read(_))));
}

#[test]
fn head_response_has_empty_body() {
    let server = MockServer::start(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n",
        b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi",
    ]);
    let mut client = RawClient::new(&server.url("/doc")).unwrap();
    let head = client.request_head(None, ";");
    assert_eq!(head.code(), Some(200));
    assert_eq!(head.header("content-length"), Some("10"));
    assert!(head.body().is_none());
    assert!(server.next_request_text().starts_with("HEAD /doc HTTP/1.1\r\n"));

    let get = client.request_get(None, ";");
    assert_eq!(get.body().map(|b| &b[..]), Some(&b"hi"[..]));
    assert_eq!(server.accepted(), 1);
}

#[test]
fn post_sends_text_body_as_raw_bytes() {
    let server = MockServer::start(vec![b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n"]);
    let mut client = RawClient::new(&server.url("/items")).unwrap();
    let params = QueryParams::new().with("draft", true);
    let response = client.request_post(Some(RequestBody::from("caf\u{e9}")), Some(&params), "&");
    assert_eq!(response.code(), Some(201));
    assert!(response.is_success());

    let request = server.next_request();
    let text = String::from_utf8_lossy(&request);
    assert!(text.starts_with("POST /items?draft=1 HTTP/1.1\r\n"), "{}", text);
    assert!(text.contains("Content-Length: 4\r\n"));
    assert!(request.ends_with(b"\r\n\r\ncaf\xe9"));
}

#[test]
fn put_without_body_announces_zero_length() {
    let server = MockServer::start(vec![b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"]);
    let mut client = RawClient::new(&server.url("/x")).unwrap();
    client.request_put(None, None, ";");
    let request = server.next_request_text();
    assert!(request.starts_with("PUT /x HTTP/1.1\r\n"));
    assert!(request.contains("Content-Length: 0\r\n"));
}

#[test]
fn multi_value_headers_are_sent_per_value() {
    let server = MockServer::start(vec![b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"]);
    let mut client = RawClient::new(&server.url("/")).unwrap();
    client.set_header("x-tag", Some("a"), true);
    client.set_header("X-Tag", Some("b"), true);
    client.request_options(None, ";", None);
    let request = server.next_request_text();
    assert!(request.starts_with("OPTIONS / HTTP/1.1\r\n"));
    assert!(request.contains("X-Tag: a\r\nX-Tag: b\r\n"), "{}", request);
}

#[test]
fn set_url_opens_new_connection() {
    let first = MockServer::start(vec![b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\na"]);
    let second = MockServer::start(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb",
        b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nc",
    ]);
    let mut client = RawClient::new(&first.url("/")).unwrap();
    assert_eq!(client.request_get(None, ";").body().map(|b| &b[..]), Some(&b"a"[..]));

    client.set_url(&second.url("/")).unwrap();
    assert!(!client.has_connection());
    assert_eq!(client.request_get(None, ";").body().map(|b| &b[..]), Some(&b"b"[..]));
    assert_eq!(client.request_get(None, ";").body().map(|b| &b[..]), Some(&b"c"[..]));
    assert_eq!(first.accepted(), 1);
    assert_eq!(second.accepted(), 1);
}

#[test]
fn connection_close_is_honored() {
    let server = MockServer::start(vec![
        b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 1\r\n\r\na",
        b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb",
    ]);
    let mut client = RawClient::new(&server.url("/")).unwrap();
    client.request_get(None, ";");
    assert!(!client.has_connection());
    let second = client.request_get(None, ";");
    assert_eq!(second.body().map(|b| &b[..]), Some(&b"b"[..]));
    assert_eq!(server.accepted(), 2);
}

#[test]
fn close_delimited_body_is_read_to_eof() {
    let server = MockServer::start(vec![b"HTTP/1.0 200 OK\r\nConnection: close\r\n\r\nuntil close"]);
    let mut client = RawClient::new(&server.url("/")).unwrap();
    let response = client.request_get(None, ";");
    assert_eq!(response.body().map(|b| &b[..]), Some(&b"until close"[..]));
    assert!(!client.has_connection());
}

#[test]
fn connection_failure_is_captured() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut client = RawClient::new(&format!("http://127.0.0.1:{}/", port)).unwrap();
    client.set_timeout(Duration::from_secs(2));
    let sink = Arc::new(RecordingSink::default());
    client.set_log_handler(Some(sink.clone()));
    let mut response = client.request_get(None, ";");
    assert!(sink.0.lock().unwrap().iter().any(|m| m.starts_with("error: ")));
    assert_eq!(response.code(), None);
    assert!(response.headers().is_empty());
    assert!(matches!(response.error(), Some(ClientError::Connection(_))));
    assert!(response.error_message().is_some());
    assert!(!response.is_readable());
    assert!(response.read(0).is_err());
}

#[test]
fn send_with_per_request_timeout() {
    let server = MockServer::start(vec![b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"]);
    let mut client = RawClient::new(&server.url("/")).unwrap();
    let options = RequestOptions::new(Method::Delete, "/thing")
        .header("X-Trace", "1")
        .timeout(Duration::from_secs(1));
    let response = client.send(options);
    assert_eq!(response.code(), Some(200));
    let request = server.next_request_text();
    assert!(request.starts_with("DELETE /thing HTTP/1.1\r\n"));
    assert!(request.contains("X-Trace: 1\r\n"));
}

#[test]
fn runtime_method_name_is_sent() {
    let server = MockServer::start(vec![b"HTTP/1.1 207 Multi-Status\r\nContent-Length: 0\r\n\r\n"]);
    let mut client = RawClient::new(&server.url("/dav")).unwrap();
    let method = String::from("PROPFIND");
    let response = client.request(method, ";", None, None);
    assert_eq!(response.code(), Some(207));
    assert!(server.next_request_text().starts_with("PROPFIND /dav HTTP/1.1\r\n"));
}

#[test]
fn reset_while_streaming_discards_connection() {
    let server = MockServer::start(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nfirst",
        b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\nsecond",
    ]);
    let mut client = RawClient::new(&server.url("/")).unwrap();
    client.set_return_reader(true);
    let mut first = client.request_get(None, ";");
    assert!(first.is_readable());

    client.reset_connection();
    client.set_pem_cert_file(fixture("client-cert.pem"), Some(fixture("client-key.pem")));
    assert!(!client.has_connection());
    assert_eq!(first.read(0).unwrap().as_deref(), Some(&b"first"[..]));
    assert_eq!(first.read(0).unwrap(), None);
    assert!(!client.has_connection());

    let mut second = client.request_get(None, ";");
    assert_eq!(second.read(0).unwrap().as_deref(), Some(&b"second"[..]));
    assert_eq!(server.accepted(), 2);
}

#[test]
fn link_local_change_while_streaming_discards_connection() {
    let server = MockServer::start(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\na",
        b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb",
    ]);
    let mut client = RawClient::new(&server.url("/")).unwrap();
    client.set_return_reader(true);
    let mut reader = client.request_get(None, ";").into_reader().unwrap();
    client.set_ipv6_link_local_interface(Some("1"));
    assert_eq!(&reader.read_to_end().unwrap()[..], b"a");
    assert!(reader.is_finished());
    assert!(!client.has_connection());
    let mut reader = client.request_get(None, ";").into_reader().unwrap();
    assert_eq!(&reader.read_to_end().unwrap()[..], b"b");
    assert!(client.has_connection());
    assert_eq!(server.accepted(), 2);
}

#[test]
fn client_identity_from_separate_files() {
    let identity = TlsIdentity::new(fixture("client-cert.pem"), Some(fixture("client-key.pem")));
    let config = tls_client_config(&identity).unwrap();
    assert!(config.client_auth_cert_resolver.has_certs());
    assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);

    let default = tls_client_config(&TlsIdentity::default()).unwrap();
    assert!(!default.client_auth_cert_resolver.has_certs());
}

#[test]
fn client_identity_key_read_from_certificate_file() {
    let identity = TlsIdentity::new(fixture("client-combined.pem"), None);
    let config = tls_client_config(&identity).unwrap();
    assert!(config.client_auth_cert_resolver.has_certs());
}

#[test]
fn client_identity_without_key_is_rejected() {
    let identity = TlsIdentity::new(fixture("client-cert.pem"), None);
    assert!(tls_client_config(&identity).is_err());
    let identity = TlsIdentity::new(fixture("client-key.pem"), Some(fixture("client-key.pem")));
    assert!(tls_client_config(&identity).is_err());
}

#[test]
fn tls_handshake_failure_is_captured() {
    let addr = plain_peer();
    let sink = Arc::new(RecordingSink::default());
    let mut client = RawClient::new(&format!("https://127.0.0.1:{}/", addr.port())).unwrap();
    client.set_pem_cert_file(fixture("client-combined.pem"), None);
    client.set_timeout(Duration::from_secs(5));
    client.set_log_handler(Some(sink.clone()));

    let response = client.request_get(None, ";");
    assert_eq!(response.code(), None);
    assert!(matches!(response.error(), Some(ClientError::Connection(_))));
    assert!(!client.has_connection());
    let messages = sink.0.lock().unwrap();
    assert!(messages.iter().any(|m| m.starts_with("error: RawClient::request() - GET / failed: connection error")));
}

#[test]
fn unreadable_identity_file_is_captured() {
    let addr = plain_peer();
    let mut client = RawClient::new(&format!("https://127.0.0.1:{}/", addr.port())).unwrap();
    client.set_pem_cert_file("/nonexistent/client.pem", None);
    let response = client.request_get(None, ";");
    assert_eq!(response.code(), None);
    assert!(matches!(response.error(), Some(ClientError::Connection(_))));
}

#[test]
#[ignore] // requires network; run with: cargo test --test raw_client -- --ignored --nocapture
fn get_over_https() {
    let mut client = RawClient::new("https://example.com/").unwrap();
    let response = client.request_get(None, ";");
    println!("{:?}", response);
    assert!(response.error().is_none(), "{:?}", response.error_message());
    assert_eq!(response.code(), Some(200));
    let body = response.body().expect("buffered body");
    assert!(String::from_utf8_lossy(body).contains("Example Domain"));
}

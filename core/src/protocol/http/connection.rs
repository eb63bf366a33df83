/*
 * connection.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of rfc_http_client, a minimal RFC-compliant HTTP client.
 *
 * rfc_http_client is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * rfc_http_client is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with rfc_http_client.  If not, see <http://www.gnu.org/licenses/>.
 */

//! HTTP connection: one TCP or TLS stream driving the H1 parser. Writes a request, reads the
//! response head, then hands out body bytes on demand. Connections go back into the owning
//! client's slot once a response is fully read and the server allows reuse.

use bytes::BytesMut;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::net::HttpStream;
use crate::protocol::http::h1::{H1ResponseHandler, HttpVersion, ParseState, ResponseParser};
use crate::protocol::http::request::{Method, RequestOptions};
use crate::uri::Endpoint;

/// Identity of a connection: a cached connection is only reused for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub secure: bool,
    /// Host as written in the `Host` header (IPv6 literals bracketed).
    pub host: String,
    pub port: u16,
}

impl ConnectionKey {
    pub fn of(endpoint: &Endpoint) -> Self {
        Self {
            secure: endpoint.scheme.is_secure(),
            host: endpoint.host.clone(),
            port: endpoint.port,
        }
    }

    fn host_header(&self) -> String {
        let default_port = if self.secure { 443 } else { 80 };
        if self.port == default_port {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Cached connection plus the epoch it belongs to. The epoch advances on every reset, so a
/// connection handed out before the reset is never parked again.
#[derive(Default)]
pub(crate) struct Slot {
    pub(crate) conn: Option<HttpConnection>,
    pub(crate) epoch: u64,
}

impl Slot {
    /// Advance the epoch and take the cached connection.
    pub(crate) fn reset(&mut self) -> Option<HttpConnection> {
        self.epoch = self.epoch.wrapping_add(1);
        self.conn.take()
    }
}

/// The single cached connection of a client, shared with body readers so they can return it.
pub(crate) type ConnectionSlot = Arc<Mutex<Slot>>;

pub(crate) fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Put `conn` back for the next request if it can be reused, the slot is free, and no reset
/// happened since it was handed out at `epoch`.
pub(crate) fn park(slot: &Mutex<Slot>, conn: HttpConnection, epoch: u64) {
    if !conn.is_reusable() {
        tracing::trace!(host = %conn.key.host, "closing connection after response");
        return;
    }
    let stale = {
        let mut cached = lock_slot(slot);
        if cached.epoch != epoch {
            Some(conn)
        } else {
            if cached.conn.is_none() {
                cached.conn = Some(conn);
            }
            None
        }
    };
    if let Some(conn) = stale {
        tracing::debug!(host = %conn.key.host, "connection reset while in use, closing");
        conn.close();
    }
}

/// Status line and headers of a final (non-1xx) response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: HttpVersion,
    pub code: u16,
    pub reason: String,
    /// Headers as received, in order.
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn connection_has(&self, token: &str) -> bool {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("connection"))
            .flat_map(|(_, v)| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }

    fn keep_alive(&self) -> bool {
        match self.version {
            HttpVersion::Http1_1 => !self.connection_has("close"),
            HttpVersion::Http1_0 => self.connection_has("keep-alive"),
        }
    }

    fn is_chunked(&self) -> bool {
        self.headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("transfer-encoding") && v.to_ascii_lowercase().contains("chunked"))
    }

    fn content_length(&self) -> Option<u64> {
        self.header("content-length").and_then(|v| v.trim().parse::<u64>().ok())
    }
}

/// Collects the status line and headers.
#[derive(Default)]
struct HeadCollector {
    status: Option<(HttpVersion, u16, String)>,
    headers: Vec<(String, String)>,
}

impl H1ResponseHandler for HeadCollector {
    fn status(&mut self, version: HttpVersion, code: u16, reason: &str) {
        self.status = Some((version, code, reason.to_string()));
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn body_chunk(&mut self, _data: &[u8]) {}
}

/// Appends body bytes to a buffer.
struct BodySink<'a> {
    out: &'a mut BytesMut,
}

impl H1ResponseHandler for BodySink<'_> {
    fn status(&mut self, _version: HttpVersion, _code: u16, _reason: &str) {}
    fn header(&mut self, _name: &str, _value: &str) {}

    fn body_chunk(&mut self, data: &[u8]) {
        self.out.extend_from_slice(data);
    }
}

/// HTTP/1.1 connection: holds the stream, read buffer, and parser state.
pub struct HttpConnection {
    stream: HttpStream,
    key: ConnectionKey,
    read_buf: BytesMut,
    parser: ResponseParser,
    keep_alive: bool,
}

impl HttpConnection {
    /// Connect to the first reachable address in `addrs`. `server_name` is the TLS SNI name.
    pub fn open(
        key: ConnectionKey,
        addrs: &[SocketAddr],
        server_name: &str,
        timeout: Duration,
        tls: Option<Arc<rustls::ClientConfig>>,
    ) -> io::Result<Self> {
        let stream = HttpStream::connect(addrs, server_name, timeout, tls)?;
        tracing::debug!(host = %key.host, port = key.port, secure = key.secure, "connection opened");
        Ok(Self::new(stream, key))
    }

    pub fn new(stream: HttpStream, key: ConnectionKey) -> Self {
        Self {
            stream,
            key,
            read_buf: BytesMut::with_capacity(8192),
            parser: ResponseParser::new(),
            keep_alive: true,
        }
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn set_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.stream.set_timeout(timeout)
    }

    /// The last response was fully read and the server did not ask to close.
    pub fn is_reusable(&self) -> bool {
        self.keep_alive && self.parser.state() == ParseState::Idle && self.read_buf.is_empty()
    }

    /// The current response body has been fully received.
    pub fn is_complete(&self) -> bool {
        self.parser.state() == ParseState::Idle
    }

    /// Read more bytes from the stream into the read buffer. Returns 0 at end of stream.
    fn fill(&mut self) -> io::Result<usize> {
        let mut tmp = [0u8; 8192];
        loop {
            match self.stream.read(&mut tmp) {
                Ok(n) => {
                    self.read_buf.extend_from_slice(&tmp[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub fn write_request(&mut self, request: &RequestOptions) -> io::Result<()> {
        let headers = &request.headers;
        let use_chunked = request.body.is_some()
            && !headers.contains("Content-Length")
            && headers
                .get("Transfer-Encoding")
                .is_some_and(|v| v.values().any(|t| t.to_ascii_lowercase().contains("chunked")));
        let mut req = format!("{} {} HTTP/1.1\r\n", request.method.as_str(), request.path);
        if !headers.contains("Host") {
            req.push_str(&format!("Host: {}\r\n", self.key.host_header()));
        }
        if !headers.contains("Accept-Encoding") {
            req.push_str("Accept-Encoding: identity\r\n");
        }
        for (name, value) in headers.lines() {
            req.push_str(&name);
            req.push_str(": ");
            req.push_str(value);
            req.push_str("\r\n");
        }
        if !use_chunked && !headers.contains("Content-Length") {
            match &request.body {
                Some(body) => req.push_str(&format!("Content-Length: {}\r\n", body.len())),
                None if request.method.expects_body() => req.push_str("Content-Length: 0\r\n"),
                None => {}
            }
        }
        req.push_str("\r\n");
        self.stream.write_all(req.as_bytes())?;
        if let Some(body) = &request.body {
            if use_chunked {
                if !body.is_empty() {
                    self.stream.write_all(format!("{:x}\r\n", body.len()).as_bytes())?;
                    self.stream.write_all(body)?;
                    self.stream.write_all(b"\r\n")?;
                }
                self.stream.write_all(b"0\r\n\r\n")?;
            } else {
                self.stream.write_all(body)?;
            }
        }
        self.stream.flush()
    }

    /// Read until the head of the final response is parsed, skipping interim 1xx responses
    /// (except 101). Selects the body framing for `method`.
    pub fn read_head(&mut self, method: &Method) -> io::Result<ResponseHead> {
        self.parser.reset();
        let mut collector = HeadCollector::default();
        loop {
            self.parser.receive(&mut self.read_buf, &mut collector)?;
            if self.parser.state() == ParseState::HeadersComplete {
                let (version, code, reason) = collector
                    .status
                    .take()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing status line"))?;
                let headers = std::mem::take(&mut collector.headers);
                if (100..200).contains(&code) && code != 101 {
                    tracing::trace!(code, "skipping interim response");
                    self.parser.reset();
                    continue;
                }
                let head = ResponseHead {
                    version,
                    code,
                    reason,
                    headers,
                };
                let no_body = *method == Method::Head || code < 200 || code == 204 || code == 304;
                if no_body {
                    self.parser.set_body_mode(Some(0), false);
                } else {
                    self.parser.set_body_mode(head.content_length(), head.is_chunked());
                }
                self.keep_alive = head.keep_alive() && code != 101 && !self.parser.is_close_delimited();
                return Ok(head);
            }
            if self.fill()? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before response head",
                ));
            }
        }
    }

    /// Pull body bytes into `out` until at least `want` bytes are buffered (all of them when
    /// `want` is None) or the body ends. Returns true once the body is complete.
    pub fn read_body(&mut self, out: &mut BytesMut, want: Option<usize>) -> io::Result<bool> {
        loop {
            let mut sink = BodySink { out: &mut *out };
            self.parser.receive(&mut self.read_buf, &mut sink)?;
            if self.parser.state() == ParseState::Idle {
                return Ok(true);
            }
            if want.is_some_and(|w| out.len() >= w) {
                return Ok(false);
            }
            match self.fill() {
                Ok(0) => {}
                Ok(_) => continue,
                // TLS peers often close without close_notify on close-delimited bodies.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && self.parser.is_close_delimited() => {}
                Err(e) => return Err(e),
            }
            if self.parser.is_close_delimited() {
                self.parser.finish();
                return Ok(true);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before end of body",
            ));
        }
    }

    pub fn close(mut self) {
        self.stream.shutdown();
    }
}

/*
 * response.rs
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

//! Normalized HTTP response: status, headers keyed `lower_snake` style, and either a
//! materialized body, a lazy body reader, or the error that ended the request.

use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, Weak};

use crate::error::{ClientError, Result};
use crate::protocol::http::connection::{park, HttpConnection, ResponseHead, Slot};

/// `Content-Type` -> `content_type`.
pub fn normalize_header_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Open,
    Finished,
    Failed,
}

/// Lazy response body. Each `read` returns the next bytes or `None` at end of stream;
/// chunked transfer-encoding is decoded underneath. After an I/O failure the reader is
/// unusable. A fully read body returns its connection to the client for reuse.
pub struct BodyReader {
    conn: Option<HttpConnection>,
    slot: Weak<Mutex<Slot>>,
    /// Slot epoch when the connection was handed out.
    epoch: u64,
    pending: BytesMut,
    state: ReaderState,
}

impl BodyReader {
    pub(crate) fn new(conn: HttpConnection, slot: Weak<Mutex<Slot>>, epoch: u64) -> Self {
        let complete = conn.is_complete();
        let mut reader = Self {
            conn: Some(conn),
            slot,
            epoch,
            pending: BytesMut::new(),
            state: ReaderState::Open,
        };
        if complete {
            reader.finish();
        }
        reader
    }

    fn finish(&mut self) {
        self.state = ReaderState::Finished;
        if let (Some(conn), Some(slot)) = (self.conn.take(), self.slot.upgrade()) {
            park(&slot, conn, self.epoch);
        }
    }

    /// Read up to `n` bytes, or everything that is left when `n` is 0.
    pub fn read(&mut self, n: usize) -> Result<Option<Bytes>> {
        if self.state == ReaderState::Failed {
            return Err(ClientError::ReaderFailed);
        }
        if self.state == ReaderState::Open && (n == 0 || self.pending.len() < n) {
            let want = if n == 0 { None } else { Some(n) };
            if let Some(conn) = self.conn.as_mut() {
                match conn.read_body(&mut self.pending, want) {
                    Ok(true) => self.finish(),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "response body read failed");
                        self.state = ReaderState::Failed;
                        self.conn = None;
                        return Err(ClientError::Read(e));
                    }
                }
            }
        }
        if self.pending.is_empty() {
            return Ok(None);
        }
        let take = if n == 0 { self.pending.len() } else { n.min(self.pending.len()) };
        Ok(Some(self.pending.split_to(take).freeze()))
    }

    /// Everything left in the body.
    pub fn read_to_end(&mut self) -> Result<Bytes> {
        Ok(self.read(0)?.unwrap_or_default())
    }

    /// The body was read to the end and nothing is buffered.
    pub fn is_finished(&self) -> bool {
        self.state == ReaderState::Finished && self.pending.is_empty()
    }
}

impl io::Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match BodyReader::read(self, buf.len()) {
            Ok(Some(data)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Ok(None) => Ok(0),
            Err(ClientError::Read(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

enum Body {
    None,
    Buffered { data: Bytes, pos: usize },
    Reader(BodyReader),
}

/// Result of one request. Exactly one of body reader / captured error is actionable:
/// `is_readable()` is true only with a reader and no error.
pub struct Response {
    code: Option<u16>,
    reason: Option<String>,
    headers: HashMap<String, String>,
    body: Body,
    error: Option<ClientError>,
}

impl Response {
    /// Response for a request that failed before a status line was accepted.
    pub(crate) fn failed(error: ClientError) -> Self {
        Self {
            code: None,
            reason: None,
            headers: HashMap::new(),
            body: Body::None,
            error: Some(error),
        }
    }

    pub(crate) fn from_head(head: &ResponseHead) -> Self {
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in &head.headers {
            headers
                .entry(normalize_header_name(name))
                .and_modify(|v| {
                    v.push_str(", ");
                    v.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }
        Self {
            code: Some(head.code),
            reason: Some(head.reason.clone()),
            headers,
            body: Body::None,
            error: None,
        }
    }

    pub(crate) fn set_error(&mut self, error: ClientError) {
        self.error = Some(error);
    }

    pub(crate) fn set_body(&mut self, data: Bytes) {
        self.body = Body::Buffered { data, pos: 0 };
    }

    pub(crate) fn set_reader(&mut self, reader: BodyReader) {
        self.body = Body::Reader(reader);
    }

    /// HTTP status code; None when the request failed before a response arrived.
    pub fn code(&self) -> Option<u16> {
        self.code
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Headers keyed by lower-cased name with `-` replaced by `_`. Repeated headers are
    /// joined with `", "`.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Header lookup; `name` is normalized the same way as the stored keys.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&normalize_header_name(name)).map(String::as_str)
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<ClientError> {
        self.error
    }

    /// String form of the captured error.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Status in `[100, 400)` and nothing went wrong.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.code.is_some_and(|c| (100..400).contains(&c))
    }

    /// A body reader is set and no error occurred.
    pub fn is_readable(&self) -> bool {
        matches!(self.body, Body::Reader(_)) && self.error.is_none()
    }

    /// Materialized body (buffered mode, success statuses only).
    pub fn body(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Buffered { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Read up to `n` bytes of the body (`n < 1` reads to the end); `None` marks end of
    /// stream. Fails when the response carries an error.
    pub fn read(&mut self, n: usize) -> Result<Option<Bytes>> {
        if let Some(error) = &self.error {
            return Err(ClientError::Read(io::Error::other(format!(
                "response is not readable: {}",
                error
            ))));
        }
        match &mut self.body {
            Body::None => Ok(None),
            Body::Buffered { data, pos } => {
                let left = data.len() - *pos;
                if left == 0 {
                    return Ok(None);
                }
                let take = if n == 0 { left } else { n.min(left) };
                let chunk = data.slice(*pos..*pos + take);
                *pos += take;
                Ok(Some(chunk))
            }
            Body::Reader(reader) => reader.read(n),
        }
    }

    /// Take the lazy reader out of a readable response.
    pub fn into_reader(self) -> Option<BodyReader> {
        match self.body {
            Body::Reader(reader) if self.error.is_none() => Some(reader),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("code", &self.code)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .field("readable", &self.is_readable())
            .field("error", &self.error)
            .finish()
    }
}

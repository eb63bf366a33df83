/*
 * parser.rs
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

//! HTTP/1.1 response push parser: status line, headers, body (Content-Length, chunked, or
//! read-until-close).

use bytes::Buf;
use bytes::BytesMut;
use std::io;

/// Protocol version from the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http1_0,
    Http1_1,
}

/// Callback for HTTP/1.1 response events.
pub trait H1ResponseHandler {
    fn status(&mut self, version: HttpVersion, code: u16, reason: &str);
    fn header(&mut self, name: &str, value: &str);
    fn body_chunk(&mut self, data: &[u8]);
    fn complete(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Response complete; bytes left in the buffer belong to the next response.
    Idle,
    StatusLine,
    Headers,
    /// Headers done; the owner must call `set_body_mode()`.
    HeadersComplete,
    Body,
    ChunkSize,
    ChunkData,
    ChunkTrailer,
}

fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Push parser for HTTP/1.1 responses. Feed bytes via `receive`; the handler is invoked as
/// complete tokens are parsed and partial data stays in the buffer.
pub struct ResponseParser {
    state: ParseState,
    /// Content-Length when known (None for chunked or read-until-close).
    content_length: Option<u64>,
    bytes_received: u64,
    chunk_remaining: u64,
    chunked: bool,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            content_length: None,
            bytes_received: 0,
            chunk_remaining: 0,
            chunked: false,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True when the body ends only when the peer closes the connection.
    pub fn is_close_delimited(&self) -> bool {
        self.state == ParseState::Body && self.content_length.is_none()
    }

    /// Peer closed a close-delimited body: the response is complete.
    pub fn finish(&mut self) {
        if self.is_close_delimited() {
            self.state = ParseState::Idle;
        }
    }

    fn find_crlf(buf: &[u8]) -> Option<usize> {
        buf.windows(2).position(|w| w == b"\r\n")
    }

    /// Split one CRLF-terminated line off `buf`, without the CRLF.
    fn take_line(buf: &mut BytesMut, what: &'static str) -> io::Result<Option<String>> {
        let Some(end) = Self::find_crlf(buf) else {
            return Ok(None);
        };
        let line = buf.split_to(end + 2);
        let line = std::str::from_utf8(&line[..end]).map_err(|_| invalid(what))?;
        Ok(Some(line.to_string()))
    }

    fn parse_status_line(line: &str) -> io::Result<(HttpVersion, u16, &str)> {
        // HTTP/1.1 200 OK, or HTTP/1.1 200
        let mut parts = line.splitn(3, ' ');
        let version = match parts.next() {
            Some("HTTP/1.1") => HttpVersion::Http1_1,
            Some("HTTP/1.0") => HttpVersion::Http1_0,
            _ => return Err(invalid("unsupported HTTP version in status line")),
        };
        let code = parts
            .next()
            .filter(|c| c.len() == 3)
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| invalid("invalid status code"))?;
        Ok((version, code, parts.next().unwrap_or("").trim()))
    }

    fn header_line<H: H1ResponseHandler>(line: &str, handler: &mut H) {
        if let Some(colon) = line.find(':') {
            handler.header(line[..colon].trim(), line[colon + 1..].trim());
        }
    }

    /// Consume and parse as much as possible from `buf`.
    pub fn receive<H: H1ResponseHandler>(&mut self, buf: &mut BytesMut, handler: &mut H) -> io::Result<()> {
        while !buf.is_empty() {
            match self.state {
                ParseState::StatusLine => {
                    let Some(line) = Self::take_line(buf, "invalid status line UTF-8")? else {
                        return Ok(());
                    };
                    if line.is_empty() {
                        // Stray CRLF after a previous body.
                        continue;
                    }
                    let (version, code, reason) = Self::parse_status_line(&line)?;
                    handler.status(version, code, reason);
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let Some(line) = Self::take_line(buf, "invalid header UTF-8")? else {
                        return Ok(());
                    };
                    if line.is_empty() {
                        self.state = ParseState::HeadersComplete;
                        return Ok(());
                    }
                    Self::header_line(&line, handler);
                }
                ParseState::HeadersComplete | ParseState::Idle => return Ok(()),
                ParseState::Body => match self.content_length {
                    Some(length) => {
                        let remaining = (length - self.bytes_received) as usize;
                        let to_read = remaining.min(buf.len());
                        let chunk = buf.split_to(to_read);
                        handler.body_chunk(&chunk);
                        self.bytes_received += to_read as u64;
                        if self.bytes_received >= length {
                            handler.complete();
                            self.state = ParseState::Idle;
                        }
                    }
                    None => {
                        let chunk = buf.split();
                        handler.body_chunk(&chunk);
                        return Ok(());
                    }
                },
                ParseState::ChunkSize => {
                    let Some(line) = Self::take_line(buf, "invalid chunk size")? else {
                        return Ok(());
                    };
                    let hex = line.split(';').next().unwrap_or("").trim();
                    self.chunk_remaining =
                        u64::from_str_radix(hex, 16).map_err(|_| invalid("invalid chunk size"))?;
                    self.state = if self.chunk_remaining == 0 {
                        ParseState::ChunkTrailer
                    } else {
                        ParseState::ChunkData
                    };
                }
                ParseState::ChunkData => {
                    if self.chunk_remaining > 0 {
                        let to_read = (self.chunk_remaining as usize).min(buf.len());
                        let chunk = buf.split_to(to_read);
                        handler.body_chunk(&chunk);
                        self.chunk_remaining -= to_read as u64;
                    }
                    if self.chunk_remaining > 0 || buf.len() < 2 {
                        return Ok(());
                    }
                    if &buf[..2] != b"\r\n" {
                        return Err(invalid("missing CRLF after chunk data"));
                    }
                    buf.advance(2);
                    self.state = ParseState::ChunkSize;
                }
                ParseState::ChunkTrailer => {
                    let Some(line) = Self::take_line(buf, "invalid trailer")? else {
                        return Ok(());
                    };
                    if line.is_empty() {
                        handler.complete();
                        self.state = ParseState::Idle;
                    }
                }
            }
        }
        Ok(())
    }

    /// Select body framing once headers are complete. `content_length` of `Some(0)` (or a
    /// response that cannot carry a body) completes the response immediately.
    pub fn set_body_mode(&mut self, content_length: Option<u64>, chunked: bool) {
        if self.state != ParseState::HeadersComplete {
            return;
        }
        self.chunked = chunked;
        self.bytes_received = 0;
        if chunked {
            self.content_length = None;
            self.state = ParseState::ChunkSize;
        } else {
            self.content_length = content_length;
            self.state = match content_length {
                Some(0) => ParseState::Idle,
                _ => ParseState::Body,
            };
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        status: Option<(HttpVersion, u16, String)>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        completed: bool,
    }

    impl H1ResponseHandler for Recorder {
        fn status(&mut self, version: HttpVersion, code: u16, reason: &str) {
            self.status = Some((version, code, reason.to_string()));
        }
        fn header(&mut self, name: &str, value: &str) {
            self.headers.push((name.to_string(), value.to_string()));
        }
        fn body_chunk(&mut self, data: &[u8]) {
            self.body.extend_from_slice(data);
        }
        fn complete(&mut self) {
            self.completed = true;
        }
    }

    #[test]
    fn content_length_body() {
        let mut p = ResponseParser::new();
        let mut r = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-A:  b \r\n\r\nhello"[..]);
        p.receive(&mut buf, &mut r).unwrap();
        assert_eq!(p.state(), ParseState::HeadersComplete);
        assert_eq!(r.status, Some((HttpVersion::Http1_1, 200, "OK".to_string())));
        assert_eq!(r.headers[1], ("X-A".to_string(), "b".to_string()));
        p.set_body_mode(Some(5), false);
        p.receive(&mut buf, &mut r).unwrap();
        assert_eq!(p.state(), ParseState::Idle);
        assert_eq!(r.body, b"hello");
        assert!(r.completed);
    }

    #[test]
    fn chunked_body_split_across_reads() {
        let mut p = ResponseParser::new();
        let mut r = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"[..]);
        p.receive(&mut buf, &mut r).unwrap();
        p.set_body_mode(None, true);
        assert!(p.is_chunked());
        for piece in [&b"5\r\nhel"[..], b"lo\r", b"\n6;ext=1\r\n world\r\n0\r\n", b"X-T: 1\r\n\r\n"] {
            buf.extend_from_slice(piece);
            p.receive(&mut buf, &mut r).unwrap();
        }
        assert_eq!(r.body, b"hello world");
        assert_eq!(p.state(), ParseState::Idle);
        assert!(r.completed);
    }

    #[test]
    fn close_delimited_body() {
        let mut p = ResponseParser::new();
        let mut r = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\n\r\nabc"[..]);
        p.receive(&mut buf, &mut r).unwrap();
        p.set_body_mode(None, false);
        p.receive(&mut buf, &mut r).unwrap();
        assert!(p.is_close_delimited());
        p.finish();
        assert_eq!(p.state(), ParseState::Idle);
        assert_eq!(r.body, b"abc");
        assert_eq!(r.status.unwrap().0, HttpVersion::Http1_0);
    }

    #[test]
    fn status_without_reason() {
        let mut p = ResponseParser::new();
        let mut r = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 204\r\n\r\n"[..]);
        p.receive(&mut buf, &mut r).unwrap();
        assert_eq!(r.status, Some((HttpVersion::Http1_1, 204, String::new())));
    }

    #[test]
    fn rejects_garbage() {
        let mut p = ResponseParser::new();
        let mut r = Recorder::default();
        let mut buf = BytesMut::from(&b"SSH-2.0-OpenSSH\r\n"[..]);
        assert!(p.receive(&mut buf, &mut r).is_err());

        let mut p = ResponseParser::new();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\n\r\nzz\r\n"[..]);
        p.receive(&mut buf, &mut r).unwrap();
        p.set_body_mode(None, true);
        assert!(p.receive(&mut buf, &mut r).is_err());
    }
}

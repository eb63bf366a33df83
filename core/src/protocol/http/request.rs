/*
 * request.rs
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

//! HTTP request: method, path, headers, optional body, per-request timeout.
//!
//! `RequestOptions` is built once per request by the client and handed to the connection.

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{ClientError, Result};
use crate::protocol::http::headers::RequestHeaders;

/// HTTP request method. Names outside the standard set travel as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Trace,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Other(s) => s,
        }
    }

    /// Methods whose requests announce `Content-Length: 0` when sent without a body.
    pub fn expects_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        match name {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            "TRACE" => Method::Trace,
            other => Method::Other(other.to_string()),
        }
    }
}

impl From<String> for Method {
    fn from(name: String) -> Self {
        Method::from(name.as_str())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body as text or bytes. Text is converted with the raw-unicode-escape codec:
/// code points below 256 become one byte each, anything above becomes `\uXXXX` or `\UXXXXXXXX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Text(String),
    Bytes(Vec<u8>),
}

impl RequestBody {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RequestBody::Bytes(b) => b,
            RequestBody::Text(s) => raw_unicode_escape(&s),
        }
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Text(s.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Text(s)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(b: Vec<u8>) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<&[u8]> for RequestBody {
    fn from(b: &[u8]) -> Self {
        RequestBody::Bytes(b.to_vec())
    }
}

fn raw_unicode_escape(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        let cp = c as u32;
        if cp < 0x100 {
            out.push(cp as u8);
        } else if cp < 0x10000 {
            out.extend_from_slice(format!("\\u{:04x}", cp).as_bytes());
        } else {
            out.extend_from_slice(format!("\\U{:08x}", cp).as_bytes());
        }
    }
    out
}

/// Everything needed to put one request on the wire.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Request target: path plus query.
    pub path: String,
    pub headers: RequestHeaders,
    pub body: Option<Vec<u8>>,
    /// Overrides the client timeout for this request only.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: RequestHeaders::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.set_header(name, Some(value), true);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into().into_bytes());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reject requests that cannot be serialized safely.
    pub fn validate(&self) -> Result<()> {
        let is_token = |s: &str| {
            !s.is_empty()
                && s.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
        };
        if !is_token(self.method.as_str()) {
            return Err(ClientError::invalid_request(format!("invalid method {:?}", self.method.as_str())));
        }
        if self.path.bytes().any(|b| b <= b' ' || b == 0x7f) {
            return Err(ClientError::invalid_request(format!("invalid request target {:?}", self.path)));
        }
        for (name, value) in self.headers.lines() {
            if !is_token(&name) {
                return Err(ClientError::invalid_request(format!("invalid header name {:?}", name)));
            }
            if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
                return Err(ClientError::invalid_request(format!("invalid value for header {}", name)));
            }
        }
        Ok(())
    }
}

/// Append an encoded query to `path`: `?` when the path has none yet, otherwise
/// `separator` unless the path already ends with it. An empty path becomes `/`.
pub fn compose_path(path: &str, separator: &str, params: Option<&str>) -> String {
    let mut out = if path.is_empty() || path.starts_with('?') {
        format!("/{}", path)
    } else {
        path.to_string()
    };
    if let Some(params) = params.filter(|p| !p.is_empty()) {
        if !out.contains('?') {
            out.push('?');
        } else if !out.ends_with(separator) && !out.ends_with('?') {
            out.push_str(separator);
        }
        out.push_str(params);
    }
    out
}

/// `Basic <base64(username:password)>`.
pub fn basic_auth_value(username: Option<&str>, password: Option<&str>) -> String {
    let credentials = format!("{}:{}", username.unwrap_or(""), password.unwrap_or(""));
    format!("Basic {}", BASE64.encode(credentials.as_bytes()))
}

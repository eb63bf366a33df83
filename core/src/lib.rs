/*
 * lib.rs
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

//! Minimal RFC-compliant HTTP/1.1 client.
//!
//! A `RawClient` is configured from a URL, keeps one connection (plain or TLS) for reuse, and
//! returns a `Response` for every request. Connection failures and error statuses are carried
//! inside the response; only an unusable URL is reported as `Err` up front.

pub mod config;
pub mod error;
pub mod log;
pub mod net;
pub mod protocol;
pub mod uri;

pub use config::{ClientConfig, TlsIdentity};
pub use error::{ClientError, Result};
pub use log::{LogSink, TracingSink};
pub use protocol::http::{
    build_query, BodyReader, HeaderValue, Method, QueryParams, QueryValue, RawClient, RequestBody,
    RequestHeaders, RequestOptions, Response, DEFAULT_SEPARATOR,
};
pub use uri::{configure, Endpoint, Scheme};

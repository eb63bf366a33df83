/*
 * mod.rs
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

//! HTTP/1.1 client: blocking, one cached connection per client, normalized responses.
//!
//! - `uri::configure` turns the URL into an `Endpoint`; `RawClient` owns it together with a
//!   single connection that is reused while host, port, and scheme stay the same.
//! - Request parameters go through `query::build_query`, headers through the case-insensitive
//!   `RequestHeaders`, bodies through `RequestBody` (text or bytes, always sent as bytes).
//! - The response head is parsed by the H1 push parser; the body is either read into memory or
//!   exposed through a `BodyReader`. Chunked transfer-encoding is decoded transparently.
//! - Status codes in `[100, 400)` are success; anything else is captured as
//!   `ClientError::Status` in the `Response`.

pub mod h1;

pub mod client;
pub mod connection;
pub mod headers;
pub mod query;
pub mod request;
pub mod response;

pub use client::RawClient;
pub use connection::{ConnectionKey, HttpConnection, ResponseHead};
pub use headers::{HeaderValue, RequestHeaders};
pub use query::{build_query, QueryParams, QueryValue, DEFAULT_SEPARATOR};
pub use request::{Method, RequestBody, RequestOptions};
pub use response::{BodyReader, Response};

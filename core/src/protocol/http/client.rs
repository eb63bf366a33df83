/*
 * client.rs
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

//! Raw HTTP client: one configured endpoint, one cached connection, shared request headers.
//!
//! Every request method returns a `Response`; transport failures and error statuses are
//! captured in it rather than returned as `Err`. Only URL configuration fails synchronously.
//! A client is meant for one thread at a time.

use bytes::BytesMut;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, TlsIdentity};
use crate::error::{ClientError, Result};
use crate::log::LogSink;
use crate::net;
use crate::protocol::http::connection::{lock_slot, park, ConnectionKey, ConnectionSlot, HttpConnection, ResponseHead};
use crate::protocol::http::headers::RequestHeaders;
use crate::protocol::http::query::{build_query, QueryParams};
use crate::protocol::http::request::{basic_auth_value, compose_path, Method, RequestBody, RequestOptions};
use crate::protocol::http::response::{BodyReader, Response};
use crate::uri::{self, Endpoint};

/// Minimal HTTP client returning raw responses.
///
/// ```no_run
/// use rfc_http_client::{QueryParams, RawClient};
///
/// let mut client = RawClient::new("http://example.com/api?x=1")?;
/// let params = QueryParams::new().with("y", 2);
/// let mut response = client.request_get(Some(&params), ";");
/// if let Some(message) = response.error_message() {
///     eprintln!("request failed: {}", message);
/// } else {
///     let body = response.read(0)?;
///     println!("{:?}", body);
/// }
/// # Ok::<(), rfc_http_client::ClientError>(())
/// ```
pub struct RawClient {
    endpoint: Endpoint,
    config: ClientConfig,
    headers: RequestHeaders,
    connection: ConnectionSlot,
    tls: Option<Arc<rustls::ClientConfig>>,
    log_handler: Option<Arc<dyn LogSink>>,
}

impl RawClient {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, ClientConfig::default())
    }

    pub fn with_config(url: &str, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            endpoint: uri::configure(url)?,
            config,
            headers: RequestHeaders::new(),
            connection: ConnectionSlot::default(),
            tls: None,
            log_handler: None,
        })
    }

    /// URL used for subsequent requests.
    pub fn url(&self) -> String {
        self.endpoint.url()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Reconfigure for `url`. The cached connection is dropped; on error nothing changes.
    pub fn set_url(&mut self, url: &str) -> Result<()> {
        self.endpoint = uri::configure(url)?;
        self.reset_connection();
        Ok(())
    }

    /// Credentials for basic auth; both `None` disables it.
    pub fn set_basic_auth(&mut self, username: Option<&str>, password: Option<&str>) {
        self.endpoint.auth_username = username.map(str::to_string);
        self.endpoint.auth_password = password.map(str::to_string);
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    pub fn set_return_reader(&mut self, return_reader: bool) {
        self.config.return_reader = return_reader;
    }

    pub fn set_ipv6_link_local_interface(&mut self, interface: Option<&str>) {
        self.config.ipv6_link_local_interface = interface.map(str::to_string);
        self.reset_connection();
    }

    /// PEM certificate (and key, if not contained in the certificate file) presented to
    /// HTTPS servers.
    pub fn set_pem_cert_file(&mut self, cert_file: impl Into<PathBuf>, key_file: Option<PathBuf>) {
        self.config.tls = TlsIdentity::new(cert_file, key_file);
        self.tls = None;
        self.reset_connection();
    }

    pub fn set_log_handler(&mut self, log_handler: Option<Arc<dyn LogSink>>) {
        self.log_handler = log_handler;
    }

    /// Set a header sent with every request; see `RequestHeaders::set_header`.
    pub fn set_header(&mut self, name: &str, value: Option<&str>, append: bool) {
        self.headers.set_header(name, value, append);
    }

    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    pub fn reset_headers(&mut self) {
        self.headers.clear();
    }

    /// Close the cached connection; the next request opens a new one. A body reader still
    /// streaming from the old connection closes it when done instead of returning it.
    pub fn reset_connection(&mut self) {
        let conn = lock_slot(&self.connection).reset();
        if let Some(conn) = conn {
            conn.close();
        }
    }

    /// A connection is cached and idle.
    pub fn has_connection(&self) -> bool {
        lock_slot(&self.connection).conn.is_some()
    }

    fn tls_config(&mut self) -> io::Result<Arc<rustls::ClientConfig>> {
        if let Some(config) = &self.tls {
            return Ok(config.clone());
        }
        let config = net::tls_client_config(&self.config.tls)?;
        self.tls = Some(config.clone());
        Ok(config)
    }

    /// The cached connection when it still matches the endpoint, else a new one.
    fn connection(&mut self, timeout: Duration) -> io::Result<HttpConnection> {
        let key = ConnectionKey::of(&self.endpoint);
        let cached = lock_slot(&self.connection).conn.take();
        if let Some(conn) = cached {
            if *conn.key() == key {
                tracing::trace!(host = %key.host, port = key.port, "reusing connection");
                conn.set_timeout(timeout)?;
                return Ok(conn);
            }
            tracing::debug!(old = %conn.key().host, new = %key.host, "endpoint changed, dropping connection");
            conn.close();
        }
        let host = self.endpoint.connect_host().to_string();
        let addrs = net::resolve(&host, key.port, self.config.ipv6_link_local_interface.as_deref())?;
        let tls = if key.secure { Some(self.tls_config()?) } else { None };
        HttpConnection::open(key, &addrs, &host, timeout, tls)
    }

    fn debug(&self, message: String) {
        if let Some(sink) = &self.log_handler {
            sink.debug(&message);
        }
    }

    fn error(&self, message: String) {
        if let Some(sink) = &self.log_handler {
            sink.error(&message);
        }
    }

    pub fn request_get(&mut self, params: Option<&QueryParams>, separator: &str) -> Response {
        let params = build_query(params, separator);
        self.request(Method::Get, separator, params.as_deref(), None)
    }

    pub fn request_head(&mut self, params: Option<&QueryParams>, separator: &str) -> Response {
        let params = build_query(params, separator);
        self.request(Method::Head, separator, params.as_deref(), None)
    }

    pub fn request_trace(&mut self, params: Option<&QueryParams>, separator: &str) -> Response {
        let params = build_query(params, separator);
        self.request(Method::Trace, separator, params.as_deref(), None)
    }

    pub fn request_post(&mut self, data: Option<RequestBody>, params: Option<&QueryParams>, separator: &str) -> Response {
        let params = build_query(params, separator);
        self.request(Method::Post, separator, params.as_deref(), data)
    }

    pub fn request_put(&mut self, data: Option<RequestBody>, params: Option<&QueryParams>, separator: &str) -> Response {
        let params = build_query(params, separator);
        self.request(Method::Put, separator, params.as_deref(), data)
    }

    pub fn request_patch(&mut self, data: Option<RequestBody>, params: Option<&QueryParams>, separator: &str) -> Response {
        let params = build_query(params, separator);
        self.request(Method::Patch, separator, params.as_deref(), data)
    }

    pub fn request_delete(&mut self, params: Option<&QueryParams>, separator: &str, data: Option<RequestBody>) -> Response {
        let params = build_query(params, separator);
        self.request(Method::Delete, separator, params.as_deref(), data)
    }

    pub fn request_options(&mut self, params: Option<&QueryParams>, separator: &str, data: Option<RequestBody>) -> Response {
        let params = build_query(params, separator);
        self.request(Method::Options, separator, params.as_deref(), data)
    }

    /// Issue `method` on the configured path with `params` (already encoded) appended.
    /// Basic-auth credentials add an `Authorization` header unless one is set explicitly.
    pub fn request(
        &mut self,
        method: impl Into<Method>,
        separator: &str,
        params: Option<&str>,
        data: Option<RequestBody>,
    ) -> Response {
        let mut options = RequestOptions::new(method.into(), compose_path(&self.endpoint.path, separator, params));
        options.headers = self.headers.clone();
        if self.endpoint.has_credentials() {
            let auth = basic_auth_value(
                self.endpoint.auth_username.as_deref(),
                self.endpoint.auth_password.as_deref(),
            );
            options.headers.set_header("Authorization", Some(&auth), false);
        }
        options.body = data.map(RequestBody::into_bytes);
        self.send(options)
    }

    /// Send a fully built request. Never fails: errors are captured in the `Response`.
    pub fn send(&mut self, options: RequestOptions) -> Response {
        self.debug(format!("RawClient::request() - {} {}", options.method, options.path));
        tracing::debug!(method = %options.method, path = %options.path, host = %self.endpoint.host, "request");

        if let Err(e) = options.validate() {
            return self.failed(&options, e);
        }
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut conn = match self.connection(timeout) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!(error = %e, host = %self.endpoint.host, "connect failed");
                return self.failed(&options, ClientError::Connection(e));
            }
        };
        let head = conn
            .write_request(&options)
            .and_then(|_| conn.read_head(&options.method));
        match head {
            Ok(head) => self.translate(conn, head, &options.method),
            Err(e) => {
                tracing::debug!(error = %e, "request failed");
                self.failed(&options, ClientError::Connection(e))
            }
        }
    }

    fn failed(&self, options: &RequestOptions, error: ClientError) -> Response {
        self.error(format!(
            "RawClient::request() - {} {} failed: {}",
            options.method, options.path, error
        ));
        Response::failed(error)
    }

    /// Classify the status and attach the body (buffered) or a reader (streaming). Error
    /// statuses in buffered mode have their body drained so the connection stays usable.
    fn translate(&self, mut conn: HttpConnection, head: ResponseHead, method: &Method) -> Response {
        let mut response = Response::from_head(&head);
        let failed = head.code < 100 || head.code >= 400;
        if failed {
            tracing::debug!(code = head.code, reason = %head.reason, "error status");
            response.set_error(ClientError::Status {
                code: head.code,
                reason: head.reason.clone(),
            });
        }

        let epoch = lock_slot(&self.connection).epoch;
        if self.config.return_reader {
            response.set_reader(BodyReader::new(conn, Arc::downgrade(&self.connection), epoch));
            return response;
        }

        let mut body = BytesMut::new();
        if let Err(e) = conn.read_body(&mut body, None) {
            tracing::warn!(error = %e, code = head.code, "response body read failed");
            self.error(format!("RawClient::request() - reading body failed: {}", e));
            if !failed {
                response.set_error(ClientError::Read(e));
            }
            return response;
        }
        park(&self.connection, conn, epoch);

        if failed {
            self.debug(format!(
                "RawClient::request() - reporting: {} for '{}'",
                head.code,
                String::from_utf8_lossy(&body)
            ));
        } else if *method != Method::Head {
            response.set_body(body.freeze());
        }
        response
    }
}

impl std::fmt::Debug for RawClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawClient")
            .field("url", &self.url())
            .field("config", &self.config)
            .field("headers", &self.headers)
            .field("connected", &self.has_connection())
            .finish()
    }
}

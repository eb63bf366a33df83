/*
 * log.rs
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

//! Event sink for request notifications.
//!
//! The client always emits `tracing` events; a `LogSink` is an optional second
//! channel handed in by the caller that receives preformatted messages.

/// Receiver of client notifications. Messages name the call site, e.g.
/// `RawClient::request() - GET /index.html`.
pub trait LogSink: Send + Sync {
    fn debug(&self, message: &str);

    /// Requests that failed before a status arrived, and body reads that failed.
    fn error(&self, message: &str) {
        self.debug(message);
    }
}

/// Sink forwarding messages to `tracing` under the `rfc_http_client` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "rfc_http_client", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "rfc_http_client", "{}", message);
    }
}

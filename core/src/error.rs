/*
 * error.rs
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

//! Client errors.
//!
//! Only `InvalidUrl` is returned synchronously (from configuration). Everything that goes
//! wrong once a request is dispatched is carried inside the `Response`.

use std::io;

/// Errors from URL configuration, request dispatch, and body reading.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The URL could not be split into a usable scheme and host.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Socket, DNS, or TLS failure before the status line was accepted.
    #[error("connection error: {0}")]
    Connection(#[source] io::Error),

    /// The request could not be built (bad header name, CR/LF in a value, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered with a status below 100 or at or above 400.
    #[error("{code} {reason}")]
    Status { code: u16, reason: String },

    /// Reading the response body failed after the status line was accepted.
    #[error("read error: {0}")]
    Read(#[source] io::Error),

    /// The body reader failed earlier and cannot be read again.
    #[error("body reader is no longer usable")]
    ReaderFailed,
}

impl ClientError {
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Status code carried by a `Status` error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/*
 * config.rs
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

//! Per-client settings that are not part of the URL: socket timeout, body mode,
//! IPv6 link-local scope, and the TLS client identity.

use std::path::PathBuf;
use std::time::Duration;

/// Socket timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// PEM files presenting a client certificate during the TLS handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsIdentity {
    /// PEM-encoded certificate chain.
    pub pem_cert_file: Option<PathBuf>,
    /// PEM-encoded private key. When unset the key is read from `pem_cert_file`.
    pub pem_key_file: Option<PathBuf>,
}

impl TlsIdentity {
    pub fn new(cert_file: impl Into<PathBuf>, key_file: Option<PathBuf>) -> Self {
        Self {
            pem_cert_file: Some(cert_file.into()),
            pem_key_file: key_file,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pem_cert_file.is_none()
    }
}

/// Client settings. Construct with struct update syntax:
///
/// ```
/// use rfc_http_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig {
///     timeout: Duration::from_secs(5),
///     return_reader: true,
///     ..Default::default()
/// };
/// assert!(config.tls.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Connect, read, and write timeout.
    pub timeout: Duration,
    /// Hand out a lazy body reader instead of reading the body into memory.
    pub return_reader: bool,
    /// Scope appended to `fe80::` hosts (interface name or numeric index).
    pub ipv6_link_local_interface: Option<String>,
    pub tls: TlsIdentity,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            return_reader: false,
            ipv6_link_local_interface: None,
            tls: TlsIdentity::default(),
        }
    }
}

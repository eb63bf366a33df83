/*
 * net.rs
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

//! Transport helpers: address resolution, TCP connect with timeout, and rustls client
//! configuration (platform roots with a bundled fallback, optional client certificate).
//!
//! `HttpStream` is plain or secure; a secure stream finishes its handshake inside
//! `connect` so TLS failures surface at connection setup.

use std::io::{self, Read, Write};
use std::net::{Ipv6Addr, Shutdown, SocketAddr, SocketAddrV6, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::config::TlsIdentity;

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = root_store.add_parsable_certificates(certs);
            tracing::trace!(added, ignored, "loaded native root certificates");
        }
        Err(e) => tracing::debug!(error = %e, "native root certificates unavailable"),
    }
    if root_store.is_empty() {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    root_store
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| invalid_data(format!("{}: {}", path.display(), e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid_data(format!("{}: {}", path.display(), e)))?;
    if certs.is_empty() {
        return Err(invalid_data(format!("{}: no certificates found", path.display())));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> io::Result<PrivateKeyDer<'static>> {
    PrivateKeyDer::from_pem_file(path).map_err(|e| invalid_data(format!("{}: {}", path.display(), e)))
}

/// HTTP/1.1 ALPN, no client auth. Shared by every client without a TLS identity.
fn default_client_config() -> Arc<ClientConfig> {
    static DEFAULT: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| {
            let mut config = ClientConfig::builder()
                .with_root_certificates(build_root_store())
                .with_no_client_auth();
            config.alpn_protocols = vec![b"http/1.1".to_vec()];
            Arc::new(config)
        })
        .clone()
}

/// TLS client config for `identity`. Without a certificate this is the shared default;
/// with one, the chain and key are loaded (key from the certificate file when no key file is set).
pub fn tls_client_config(identity: &TlsIdentity) -> io::Result<Arc<ClientConfig>> {
    let Some(cert_file) = identity.pem_cert_file.as_deref() else {
        return Ok(default_client_config());
    };
    let certs = load_certs(cert_file)?;
    let key = load_key(identity.pem_key_file.as_deref().unwrap_or(cert_file))?;
    let mut config = ClientConfig::builder()
        .with_root_certificates(build_root_store())
        .with_client_auth_cert(certs, key)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

/// Resolve `host` (brackets already removed). Link-local IPv6 hosts get the interface as
/// scope: a numeric interface becomes the scope id, a name goes through the system resolver.
pub fn resolve(host: &str, port: u16, link_local_interface: Option<&str>) -> io::Result<Vec<SocketAddr>> {
    if let (Ok(ip), Some(interface)) = (host.parse::<Ipv6Addr>(), link_local_interface) {
        if host.to_ascii_lowercase().starts_with("fe80::") {
            if let Ok(scope_id) = interface.parse::<u32>() {
                return Ok(vec![SocketAddr::V6(SocketAddrV6::new(ip, port, 0, scope_id))]);
            }
            let scoped = format!("{}%{}", host, interface);
            return Ok((scoped.as_str(), port).to_socket_addrs()?.collect());
        }
    }
    Ok((host, port).to_socket_addrs()?.collect())
}

fn connect_tcp(addrs: &[SocketAddr], timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(tcp) => {
                tcp.set_read_timeout(Some(timeout))?;
                tcp.set_write_timeout(Some(timeout))?;
                tcp.set_nodelay(true)?;
                return Ok(tcp);
            }
            Err(e) => {
                tracing::debug!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}

/// Unified blocking stream: plain TCP or TLS.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl HttpStream {
    /// Connect to the first reachable address; with `tls` set, complete the handshake
    /// against `server_name` before returning.
    pub fn connect(
        addrs: &[SocketAddr],
        server_name: &str,
        timeout: Duration,
        tls: Option<Arc<ClientConfig>>,
    ) -> io::Result<Self> {
        let mut tcp = connect_tcp(addrs, timeout)?;
        let Some(config) = tls else {
            return Ok(HttpStream::Plain(tcp));
        };
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
        let mut conn = ClientConnection::new(config, name)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        while conn.is_handshaking() {
            conn.complete_io(&mut tcp)?;
        }
        Ok(HttpStream::Tls(Box::new(StreamOwned::new(conn, tcp))))
    }

    pub fn tcp(&self) -> &TcpStream {
        match self {
            HttpStream::Plain(s) => s,
            HttpStream::Tls(s) => s.get_ref(),
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, HttpStream::Tls(_))
    }

    pub fn set_timeout(&self, timeout: Duration) -> io::Result<()> {
        let tcp = self.tcp();
        tcp.set_read_timeout(Some(timeout))?;
        tcp.set_write_timeout(Some(timeout))
    }

    pub fn shutdown(&mut self) {
        if let HttpStream::Tls(s) = self {
            s.conn.send_close_notify();
            let _ = s.conn.complete_io(&mut s.sock);
        }
        let _ = self.tcp().shutdown(Shutdown::Both);
    }
}

impl Read for HttpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            HttpStream::Plain(s) => s.read(buf),
            HttpStream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for HttpStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            HttpStream::Plain(s) => s.write(buf),
            HttpStream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            HttpStream::Plain(s) => s.flush(),
            HttpStream::Tls(s) => s.flush(),
        }
    }
}

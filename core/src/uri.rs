/*
 * uri.rs
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

//! URL configuration: split `scheme://[user[:pass]@]host[:port][/path][?query]` into the
//! connection parameters the client needs. IPv6 literals are kept in brackets; the path keeps
//! its query verbatim (no re-encoding). Userinfo is percent-decoded.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{ClientError, Result};

pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;

/// Quote-plus safe set: everything but ASCII alphanumerics and `_.-~` is encoded.
const QUOTE_PLUS: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Percent-encode for a query component or userinfo, with space as `+`.
pub fn quote_plus(s: &str) -> String {
    utf8_percent_encode(s, QUOTE_PLUS)
        .to_string()
        .replace("%20", "+")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => HTTP_PORT,
            Scheme::Https => HTTPS_PORT,
        }
    }

    pub fn is_secure(&self) -> bool {
        *self == Scheme::Https
    }
}

/// Connection parameters derived from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    /// Lower-cased host; IPv6 literals are wrapped in `[...]`.
    pub host: String,
    /// Explicit port, or the scheme default.
    pub port: u16,
    /// Raw path, with `?query` appended when the URL had one.
    pub path: String,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
}

impl Endpoint {
    /// Host as handed to the resolver: brackets removed from IPv6 literals.
    pub fn connect_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }

    pub fn is_ipv6(&self) -> bool {
        self.host.contains(':')
    }

    /// True when basic-auth credentials were embedded in the URL or set later.
    pub fn has_credentials(&self) -> bool {
        self.auth_username.is_some() || self.auth_password.is_some()
    }

    /// Rebuild the URL; the port is omitted when it is the scheme default.
    pub fn url(&self) -> String {
        let mut url = format!("{}://", self.scheme.as_str());
        if self.has_credentials() {
            if let Some(user) = &self.auth_username {
                url.push_str(&quote_plus(user));
            }
            url.push(':');
            if let Some(pass) = &self.auth_password {
                url.push_str(&quote_plus(pass));
            }
            url.push('@');
        }
        url.push_str(&self.host);
        if self.port != self.scheme.default_port() {
            url.push_str(&format!(":{}", self.port));
        }
        url.push_str(&self.path);
        url
    }
}

/// Split `scheme:` off the front when it is a valid RFC 3986 scheme.
fn split_scheme(url: &str) -> Option<(&str, &str)> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic()
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    {
        return None;
    }
    Some((scheme, &url[colon + 1..]))
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse `url` into an `Endpoint`. Fails when the scheme is not http/https, the host is
/// missing, or the port is not a number in range.
pub fn configure(url: &str) -> Result<Endpoint> {
    let url = url.trim();
    let (scheme, rest) =
        split_scheme(url).ok_or_else(|| ClientError::invalid_url(format!("no scheme in {:?}", url)))?;
    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" => Scheme::Http,
        "https" => Scheme::Https,
        other => {
            return Err(ClientError::invalid_url(format!(
                "unsupported scheme {:?}",
                other
            )))
        }
    };
    let rest = rest
        .strip_prefix("//")
        .ok_or_else(|| ClientError::invalid_url(format!("no authority in {:?}", url)))?;

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let rest = &rest[authority_end..];
    let rest = rest.split('#').next().unwrap_or("");
    let (path, query) = match rest.find('?') {
        Some(q) => (&rest[..q], &rest[q + 1..]),
        None => (rest, ""),
    };

    let (userinfo, hostport) = match authority.rfind('@') {
        Some(at) => (Some(&authority[..at]), &authority[at + 1..]),
        None => (None, authority),
    };
    let (auth_username, auth_password) = match userinfo {
        Some(info) => match info.find(':') {
            Some(c) => (Some(decode(&info[..c])), Some(decode(&info[c + 1..]))),
            None => (Some(decode(info)), None),
        },
        None => (None, None),
    };

    let (hostname, port) = if let Some(bracketed) = hostport.strip_prefix('[') {
        let close = bracketed
            .find(']')
            .ok_or_else(|| ClientError::invalid_url("unterminated IPv6 literal"))?;
        let after = &bracketed[close + 1..];
        let port = match after.strip_prefix(':') {
            Some(p) => Some(p),
            None if after.is_empty() => None,
            None => return Err(ClientError::invalid_url("garbage after IPv6 literal")),
        };
        (&bracketed[..close], port)
    } else {
        match hostport.find(':') {
            Some(c) => (&hostport[..c], Some(&hostport[c + 1..])),
            None => (hostport, None),
        }
    };
    if hostname.is_empty() {
        return Err(ClientError::invalid_url(format!("no host in {:?}", url)));
    }
    let hostname = hostname.to_ascii_lowercase();
    let host = if hostname.contains(':') {
        format!("[{}]", hostname)
    } else {
        hostname
    };

    let port = match port.filter(|p| !p.is_empty()) {
        Some(p) => p
            .parse::<u16>()
            .map_err(|_| ClientError::invalid_url(format!("invalid port {:?}", p)))?,
        None => scheme.default_port(),
    };

    let path = if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    };

    Ok(Endpoint {
        scheme,
        host,
        port,
        path,
        auth_username,
        auth_password,
    })
}

/*
 * headers.rs
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

//! Request headers: a case-insensitive, insertion-ordered map with multi-value support.
//!
//! Names are stored lower-cased and written to the wire in canonical `Title-Case`.

/// One header's value: a single string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            HeaderValue::Single(v) => std::slice::from_ref(v),
            HeaderValue::Multiple(v) => v,
        };
        values.iter().map(String::as_str)
    }

    /// The value when there is exactly one.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            HeaderValue::Single(v) => Some(v),
            HeaderValue::Multiple(_) => None,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(first) => {
                let first = std::mem::take(first);
                *self = HeaderValue::Multiple(vec![first, value]);
            }
            HeaderValue::Multiple(v) => v.push(value),
        }
    }
}

/// `content-type` -> `Content-Type`.
pub fn canonical_name(key: &str) -> String {
    key.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Case-insensitive ordered header map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: Vec<(String, HeaderValue)>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.trim().to_ascii_lowercase()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Store a header. `None` removes it. An existing header is left unchanged unless
    /// `append` is set, in which case the value is added to its list.
    pub fn set_header(&mut self, name: &str, value: Option<&str>, append: bool) {
        let key = Self::key(name);
        let Some(value) = value else {
            self.entries.retain(|(k, _)| *k != key);
            return;
        };
        match self.position(&key) {
            Some(i) if append => self.entries[i].1.push(value.to_string()),
            Some(_) => {}
            None => self.entries.push((key, HeaderValue::Single(value.to_string()))),
        }
    }

    /// Replace any existing value.
    pub fn insert(&mut self, name: &str, value: &str) {
        let key = Self::key(name);
        let value = HeaderValue::Single(value.to_string());
        match self.position(&key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let key = Self::key(name);
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        let i = self.position(&Self::key(name))?;
        Some(self.entries.remove(i).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lower-cased names with their values, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Wire lines `(Canonical-Name, value)`, one per value.
    pub fn lines(&self) -> impl Iterator<Item = (String, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, v)| v.values().map(move |value| (canonical_name(k), value)))
    }
}

//! Header set carried through the proxy as a JSON query parameter.
//!
//! Keys keep the spelling and order they arrived with, so the JSON written
//! back into rewritten manifests is the same mapping the caller supplied.
//! Header-name comparisons are ASCII case-insensitive.

use crate::error::{ProxyError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Ordered `name -> value` header mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `headers` query parameter.
    ///
    /// The value must be a JSON object whose values are all strings. An empty
    /// or whitespace-only parameter is an empty set.
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        let set: HeaderSet = serde_json::from_str(raw)
            .map_err(|e| ProxyError::InvalidRequest(format!("headers must be a JSON object of strings: {e}")))?;
        set.validate()?;
        Ok(set)
    }

    /// Compact JSON form, keys in insertion order.
    pub fn to_json(&self) -> String {
        // Serializing a list of string pairs cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Insert or replace a header. A key matching an existing one
    /// case-insensitively keeps its original position and spelling.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Reject entries that cannot be sent as HTTP headers.
    ///
    /// Names must be HTTP tokens. Values may contain horizontal tabs and
    /// non-ASCII bytes, but no other control characters and no DEL.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.entries {
            header_pair(name, value)?;
        }
        Ok(())
    }

    /// Build a reqwest header map, later entries overriding earlier ones.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let (header_name, header_value) = header_pair(name, value)?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    if name.is_empty() || name.chars().any(|c| c.is_ascii_control()) {
        return Err(ProxyError::InvalidRequest(format!(
            "header name {name:?} contains control characters"
        )));
    }
    if value.chars().any(|c| c.is_ascii_control() && c != '\t') {
        return Err(ProxyError::InvalidRequest(format!(
            "value of header {name:?} contains control characters"
        )));
    }
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ProxyError::InvalidRequest(format!("invalid header name {name:?}: {e}")))?;
    // from_bytes, unlike from_str, accepts obs-text (UTF-8 sent as raw bytes)
    let header_value = HeaderValue::from_bytes(value.as_bytes())
        .map_err(|e| ProxyError::InvalidRequest(format!("invalid value for header {name:?}: {e}")))?;
    Ok((header_name, header_value))
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl Serialize for HeaderSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct HeaderSetVisitor;

        impl<'de> Visitor<'de> for HeaderSetVisitor {
            type Value = HeaderSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object mapping header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<HeaderSet, A::Error> {
                let mut entries: Vec<(String, String)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    // Exact duplicate keys: first position, last value
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some(entry) => entry.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                Ok(HeaderSet { entries })
            }
        }

        deserializer.deserialize_map(HeaderSetVisitor)
    }
}

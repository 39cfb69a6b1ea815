//! Normalized resource identifiers.
//!
//! A [`ResourceUri`] is the identity of a cached resource. Two URIs that
//! address the same resource must compare equal, so normalization happens
//! once at construction:
//!
//! - scheme and host are lower-cased
//! - default ports (`:80` for http, `:443` for https) are dropped
//! - an empty path becomes `/`
//! - query pairs are sorted by name then value and re-encoded
//!
//! ```
//! use cachet_core::ResourceUri;
//!
//! let a = ResourceUri::parse("HTTPS://Api.Example.com:443/books?b=2&a=1").unwrap();
//! let b = ResourceUri::parse("https://api.example.com/books?a=1&b=2").unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "https://api.example.com/books?a=1&b=2");
//! ```

use std::fmt;
use std::str::FromStr;

use http::Uri;
use smol_str::SmolStr;
use thiserror::Error;

/// Error returned when a string can't be turned into a [`ResourceUri`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UriError {
    /// The input was empty.
    #[error("resource uri is empty")]
    Empty,
    /// The input is not a valid URI reference.
    #[error("invalid resource uri `{uri}`: {reason}")]
    Invalid {
        /// The rejected input.
        uri: String,
        /// Parser message.
        reason: String,
    },
}

/// Normalized target URI of a cached resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceUri(SmolStr);

impl ResourceUri {
    /// Parses and normalizes a URI string.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UriError::Empty);
        }
        // Fragments never reach the server and are not part of the identity.
        let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
        let uri = Uri::from_str(without_fragment).map_err(|err| UriError::Invalid {
            uri: input.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Self::from_uri(&uri))
    }

    /// Normalizes an already parsed [`Uri`].
    pub fn from_uri(uri: &Uri) -> Self {
        let mut normalized = String::new();

        if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
            let scheme = scheme.to_ascii_lowercase();
            let host = authority.host().to_ascii_lowercase();
            normalized.push_str(&scheme);
            normalized.push_str("://");
            normalized.push_str(&host);
            if let Some(port) = authority.port_u16() {
                let default_port = matches!(
                    (scheme.as_str(), port),
                    ("http", 80) | ("https", 443)
                );
                if !default_port {
                    normalized.push(':');
                    normalized.push_str(&port.to_string());
                }
            }
        }

        let path = uri.path();
        if path.is_empty() {
            normalized.push('/');
        } else {
            normalized.push_str(path);
        }

        if let Some(query) = uri.query()
            && !query.is_empty()
        {
            normalized.push('?');
            normalized.push_str(&canonical_query(query));
        }

        ResourceUri(SmolStr::new(normalized))
    }

    /// Returns the normalized URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sorts query pairs so parameter order never splits one resource in two.
///
/// A query that can't be decoded is kept verbatim.
fn canonical_query(query: &str) -> String {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(mut pairs) => {
            pairs.sort();
            serde_urlencoded::to_string(&pairs).unwrap_or_else(|_| query.to_owned())
        }
        Err(_) => query.to_owned(),
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceUri::parse(s)
    }
}

impl From<&Uri> for ResourceUri {
    fn from(uri: &Uri) -> Self {
        ResourceUri::from_uri(uri)
    }
}

impl TryFrom<&str> for ResourceUri {
    type Error = UriError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ResourceUri::parse(value)
    }
}

impl TryFrom<String> for ResourceUri {
    type Error = UriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ResourceUri::parse(&value)
    }
}

impl serde::Serialize for ResourceUri {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ResourceUri {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ResourceUri::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_order_is_canonical() {
        let a = ResourceUri::parse("http://h/p?z=1&a=2&a=1").unwrap();
        assert_eq!(a.as_str(), "http://h/p?a=1&a=2&z=1");
    }

    #[test]
    fn test_non_default_port_is_kept() {
        let uri = ResourceUri::parse("http://localhost:8080").unwrap();
        assert_eq!(uri.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_fragment_is_dropped() {
        let uri = ResourceUri::parse("https://h/doc#section").unwrap();
        assert_eq!(uri.as_str(), "https://h/doc");
    }

    #[test]
    fn test_relative_reference() {
        let uri = ResourceUri::parse("/books/1?x=1").unwrap();
        assert_eq!(uri.as_str(), "/books/1?x=1");
    }

    #[test]
    fn test_empty_is_rejected() {
        assert_eq!(ResourceUri::parse("  "), Err(UriError::Empty));
    }

    #[test]
    fn test_invalid_is_rejected() {
        assert!(matches!(
            ResourceUri::parse("http://exa mple.com/"),
            Err(UriError::Invalid { .. })
        ));
    }
}

//! Cache key types.
//!
//! This module provides the identity under which one cache entry is stored:
//!
//! - [`CacheKey`] - The complete key: discriminator, resource and variance
//! - [`KeyKind`] - Whether the caller wants a typed value or the raw response
//! - [`VaryPair`] - One `name:value` component taken from a varied request header
//!
//! ## Key Structure
//!
//! Cache keys have up to four components:
//!
//! 1. **Kind** - `typed` or `raw-http`
//! 2. **Result type** - For typed keys, the stable name of the requested type
//! 3. **Resource** - The normalized [`ResourceUri`]
//! 4. **Vary pairs** - For raw keys, the sorted request header pairs
//!
//! ## Format
//!
//! ```
//! use cachet_core::{CacheKey, ResourceUri, VaryPair};
//!
//! let uri = ResourceUri::parse("https://api.example.com/books").unwrap();
//!
//! let typed = CacheKey::typed("app::Book", uri.clone());
//! assert_eq!(typed.to_string(), "typed[app::Book]:https://api.example.com/books");
//!
//! let raw = CacheKey::raw(uri, vec![VaryPair::new("accept", "application/json")]);
//! assert_eq!(raw.to_string(), "raw-http:https://api.example.com/books|accept:application/json");
//! ```
//!
//! The string form is for logs only. Equality and hashing use the
//! structured parts, so a header value containing `&` or `|` can never make
//! two distinct keys collide.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;

use crate::uri::ResourceUri;

/// Discriminates typed entries from raw HTTP entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    /// The engine caches an application-level deserialized value.
    Typed,
    /// The engine caches the raw response.
    RawHttp,
}

impl KeyKind {
    /// Returns the discriminator tag.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Typed => "typed",
            KeyKind::RawHttp => "raw-http",
        }
    }
}

/// A single `header-name:header-value` component of a raw key.
///
/// Values compare ASCII case-insensitively, so `TEXT/HTML` and `text/html`
/// address one entry. The spelling seen first is the one kept.
#[derive(Clone, Debug)]
pub struct VaryPair {
    name: SmolStr,
    value: SmolStr,
}

impl VaryPair {
    /// Creates a pair from an already normalized name and value.
    pub fn new(name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        VaryPair {
            name: SmolStr::new(name),
            value: SmolStr::new(value),
        }
    }

    /// Returns the header name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the header value.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn folded_value(&self) -> impl Iterator<Item = u8> + '_ {
        self.value.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for VaryPair {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl Eq for VaryPair {}

impl Hash for VaryPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for b in self.folded_value() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl PartialOrd for VaryPair {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VaryPair {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.folded_value().cmp(other.folded_value()))
    }
}

impl fmt::Display for VaryPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.value)
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct CacheKeyInner {
    kind: KeyKind,
    result_type: Option<SmolStr>,
    uri: ResourceUri,
    vary: Vec<VaryPair>,
}

/// A cache key identifying one cached entry.
///
/// # Cheap Cloning
///
/// `CacheKey` wraps its data in [`Arc`], making `clone()` an O(1) operation.
/// Keys are cloned into store shards, invalidation indexes and handler
/// contexts, so this matters.
#[derive(Clone, Debug)]
pub struct CacheKey {
    inner: Arc<CacheKeyInner>,
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl CacheKey {
    /// Creates a key for a typed value of the named result type.
    pub fn typed(result_type: impl Into<SmolStr>, uri: ResourceUri) -> Self {
        CacheKey {
            inner: Arc::new(CacheKeyInner {
                kind: KeyKind::Typed,
                result_type: Some(result_type.into()),
                uri,
                vary: Vec::new(),
            }),
        }
    }

    /// Creates a key for a raw response.
    ///
    /// Pairs are sorted and duplicates removed, so callers may pass them in
    /// request order. Of two values equal up to ASCII case the first wins.
    pub fn raw(uri: ResourceUri, mut vary: Vec<VaryPair>) -> Self {
        vary.sort();
        vary.dedup();
        CacheKey {
            inner: Arc::new(CacheKeyInner {
                kind: KeyKind::RawHttp,
                result_type: None,
                uri,
                vary,
            }),
        }
    }

    /// Returns the discriminator.
    pub fn kind(&self) -> KeyKind {
        self.inner.kind
    }

    /// Returns the result type name folded into a typed key.
    pub fn result_type(&self) -> Option<&str> {
        self.inner.result_type.as_deref()
    }

    /// Returns the resource the key addresses.
    pub fn uri(&self) -> &ResourceUri {
        &self.inner.uri
    }

    /// Returns the vary pairs of a raw key.
    pub fn vary(&self) -> impl Iterator<Item = &VaryPair> {
        self.inner.vary.iter()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.kind.as_str())?;
        if let Some(ref result_type) = self.inner.result_type {
            write!(f, "[{}]", result_type)?;
        }
        write!(f, ":{}", self.inner.uri)?;
        for (i, pair) in self.inner.vary.iter().enumerate() {
            f.write_str(if i == 0 { "|" } else { "&" })?;
            write!(f, "{}", pair)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> ResourceUri {
        ResourceUri::parse("http://h/a").unwrap()
    }

    #[test]
    fn test_raw_pairs_sorted_and_deduplicated() {
        let key = CacheKey::raw(
            uri(),
            vec![
                VaryPair::new("b", "2"),
                VaryPair::new("a", "1"),
                VaryPair::new("b", "2"),
            ],
        );
        let pairs: Vec<_> = key.vary().map(|p| p.to_string()).collect();
        assert_eq!(pairs, vec!["a:1", "b:2"]);
    }

    #[test]
    fn test_value_case_does_not_split_keys() {
        use std::collections::HashSet;

        let upper = CacheKey::raw(uri(), vec![VaryPair::new("accept", "TEXT/HTML")]);
        let lower = CacheKey::raw(uri(), vec![VaryPair::new("accept", "text/html")]);
        assert_eq!(upper, lower);
        assert_eq!(HashSet::from([upper, lower]).len(), 1);

        let both = CacheKey::raw(
            uri(),
            vec![VaryPair::new("accept", "Text/Html"), VaryPair::new("accept", "text/html")],
        );
        let pairs: Vec<_> = both.vary().map(|p| p.to_string()).collect();
        assert_eq!(pairs, vec!["accept:Text/Html"]);
    }

    #[test]
    fn test_kinds_never_collide() {
        let typed = CacheKey::typed("raw-http", uri());
        let raw = CacheKey::raw(uri(), Vec::new());
        assert_ne!(typed, raw);
    }

    #[test]
    fn test_separator_in_value_does_not_collide() {
        let one = CacheKey::raw(uri(), vec![VaryPair::new("a", "1&b:2")]);
        let two = CacheKey::raw(uri(), vec![VaryPair::new("a", "1"), VaryPair::new("b", "2")]);
        assert_eq!(one.to_string(), two.to_string());
        assert_ne!(one, two);
    }
}

//! Vary-by header resolution.
//!
//! The [`VaryByResolver`] answers one question: which request headers must
//! be folded into the cache key for a given resource? The answer is the
//! union of the process-wide defaults and any override registered for that
//! exact resource.
//!
//! Header names are case-insensitive. They are stored as [`HeaderName`],
//! which is always lower-case, so the union needs no extra normalization.
//!
//! ```
//! use cachet_core::ResourceUri;
//! use cachet_http::VaryByResolver;
//!
//! let books = ResourceUri::parse("http://api/books").unwrap();
//! let resolver = VaryByResolver::builder()
//!     .default_header("Accept")
//!     .override_header(books.clone(), "ACCEPT-LANGUAGE")
//!     .build()
//!     .unwrap();
//!
//! let names: Vec<_> = resolver.resolve(&books).iter().map(|n| n.as_str().to_owned()).collect();
//! assert_eq!(names, vec!["accept", "accept-language"]);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use http::HeaderMap;
use http::header::{HeaderName, VARY};

use cachet_core::{ResourceUri, SmolStr};

use crate::error::ConfigError;

/// Immutable, sorted set of header names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarySet(Arc<[HeaderName]>);

impl VarySet {
    fn from_names(names: BTreeSet<HeaderNameOrd>) -> Self {
        VarySet(names.into_iter().map(|n| n.0).collect())
    }

    /// Iterates over the names in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderName> {
        self.0.iter()
    }

    /// Returns `true` if `name` is in the set.
    pub fn contains(&self, name: &HeaderName) -> bool {
        self.0.iter().any(|n| n == name)
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of names.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// HeaderName has no Ord impl.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderNameOrd(HeaderName);

impl PartialOrd for HeaderNameOrd {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeaderNameOrd {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_str().cmp(other.0.as_str())
    }
}

/// Resolves the vary-by header set of a resource.
#[derive(Debug, Clone, Default)]
pub struct VaryByResolver {
    defaults: VarySet,
    overrides: HashMap<ResourceUri, VarySet>,
}

impl VaryByResolver {
    /// Creates a new [`VaryByResolverBuilder`].
    pub fn builder() -> VaryByResolverBuilder {
        VaryByResolverBuilder::default()
    }

    /// Returns the headers to fold into the key of `uri`.
    pub fn resolve(&self, uri: &ResourceUri) -> VarySet {
        self.overrides
            .get(uri)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }

    /// Returns the process-wide defaults.
    pub fn defaults(&self) -> &VarySet {
        &self.defaults
    }
}

/// Builder for [`VaryByResolver`].
///
/// Names are validated in [`build`](VaryByResolverBuilder::build), so a
/// misconfigured header is reported before any request runs.
#[derive(Debug, Clone, Default)]
pub struct VaryByResolverBuilder {
    defaults: Vec<String>,
    overrides: Vec<(ResourceUri, String)>,
}

impl VaryByResolverBuilder {
    /// Adds a header to the default set.
    pub fn default_header(mut self, name: impl Into<String>) -> Self {
        self.defaults.push(name.into());
        self
    }

    /// Adds several headers to the default set.
    pub fn default_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds a header to the set of one resource, on top of the defaults.
    pub fn override_header(mut self, uri: ResourceUri, name: impl Into<String>) -> Self {
        self.overrides.push((uri, name.into()));
        self
    }

    /// Validates every name and builds the resolver.
    pub fn build(self) -> Result<VaryByResolver, ConfigError> {
        let defaults = self
            .defaults
            .iter()
            .map(|name| header_name(name))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut per_uri: HashMap<ResourceUri, BTreeSet<HeaderNameOrd>> = HashMap::new();
        for (uri, name) in &self.overrides {
            let name = header_name(name)?;
            per_uri
                .entry(uri.clone())
                .or_insert_with(|| defaults.clone())
                .insert(name);
        }

        Ok(VaryByResolver {
            defaults: VarySet::from_names(defaults),
            overrides: per_uri
                .into_iter()
                .map(|(uri, names)| (uri, VarySet::from_names(names)))
                .collect(),
        })
    }
}

fn header_name(name: &str) -> Result<HeaderNameOrd, ConfigError> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map(HeaderNameOrd)
        .map_err(|_| ConfigError::InvalidHeaderName(name.to_owned()))
}

/// Header names listed by a response `Vary`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseVary {
    /// Lower-cased names.
    pub names: BTreeSet<SmolStr>,
    /// `Vary: *` was present.
    pub wildcard: bool,
}

/// Parses every `Vary` field of a response.
pub fn parse_vary(headers: &HeaderMap) -> ResponseVary {
    let mut vary = ResponseVary::default();
    for token in headers
        .get_all(VARY)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        if token == "*" {
            vary.wildcard = true;
        } else {
            vary.names.insert(SmolStr::new(token.to_ascii_lowercase()));
        }
    }
    vary
}

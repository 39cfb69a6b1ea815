//! Cache entries and the exchange snapshots they own.

use http::{HeaderMap, Method, StatusCode};

use crate::metadata::FreshnessMetadata;
use crate::uri::ResourceUri;
use crate::value::CachedValue;

/// The parts of an outgoing request the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    /// Request method.
    pub method: Method,
    /// Normalized target URI.
    pub uri: ResourceUri,
    /// Outgoing request headers.
    pub headers: HeaderMap,
}

impl RequestSnapshot {
    /// Creates a snapshot without headers.
    pub fn new(method: Method, uri: ResourceUri) -> Self {
        RequestSnapshot {
            method,
            uri,
            headers: HeaderMap::new(),
        }
    }

    /// Creates a `GET` snapshot without headers.
    pub fn get(uri: ResourceUri) -> Self {
        RequestSnapshot::new(Method::GET, uri)
    }

    /// Builds a snapshot from `http` request parts.
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        RequestSnapshot {
            method: parts.method.clone(),
            uri: ResourceUri::from_uri(&parts.uri),
            headers: parts.headers.clone(),
        }
    }

    /// Replaces the headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Metadata of a received response, without the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Whether a non-empty body was received.
    pub has_body: bool,
}

impl ResponseSnapshot {
    /// Creates a snapshot.
    pub fn new(status: StatusCode, headers: HeaderMap, has_body: bool) -> Self {
        ResponseSnapshot {
            status,
            headers,
            has_body,
        }
    }

    /// Builds a snapshot from `http` response parts.
    pub fn from_parts(parts: &http::response::Parts, has_body: bool) -> Self {
        ResponseSnapshot::new(parts.status, parts.headers.clone(), has_body)
    }
}

/// One stored cache entry.
///
/// Entries are immutable. [`CacheEntry::with_metadata`] produces the next
/// version, which the store swaps in atomically.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value.
    pub value: CachedValue,
    /// The request that produced the value.
    pub request: RequestSnapshot,
    /// The response that carried the value.
    pub response: ResponseSnapshot,
    /// Freshness facts for this entry.
    pub metadata: FreshnessMetadata,
}

impl CacheEntry {
    /// Creates an entry.
    pub fn new(
        value: CachedValue,
        request: RequestSnapshot,
        response: ResponseSnapshot,
        metadata: FreshnessMetadata,
    ) -> Self {
        CacheEntry {
            value,
            request,
            response,
            metadata,
        }
    }

    /// Returns a copy of this entry with replaced metadata.
    pub fn with_metadata(&self, metadata: FreshnessMetadata) -> Self {
        CacheEntry {
            value: self.value.clone(),
            request: self.request.clone(),
            response: self.response.clone(),
            metadata,
        }
    }

    /// Returns the resource this entry caches.
    pub fn uri(&self) -> &ResourceUri {
        &self.metadata.uri
    }
}

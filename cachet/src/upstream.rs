//! The seam between the engine and whatever performs the request.
//!
//! The engine never talks to the network. On a miss or revalidation it
//! hands an [`UpstreamRequest`] to an [`Upstream`] and receives the
//! response metadata, the value the collaborator produced from the body,
//! and the [`CacheHints`] the value declared about itself.
//!
//! Any `FnMut(UpstreamRequest) -> impl Future<Output = Result<Fetched<T>, E>>`
//! is an upstream:
//!
//! ```
//! use cachet::{Fetched, UpstreamRequest, BoxError};
//! use cachet_core::{RawResponse, ResponseSnapshot};
//! use http::{HeaderMap, StatusCode};
//!
//! let upstream = |_request: UpstreamRequest| async move {
//!     let raw = RawResponse::new(StatusCode::OK, HeaderMap::new(), "hello");
//!     Ok::<_, BoxError>(Fetched::raw(raw))
//! };
//! # let _ = upstream;
//! ```

use std::future::Future;
use std::sync::Arc;

use cachet_core::{
    CacheEntry, CacheHints, DeclaresCaching, RawResponse, RequestSnapshot, ResponseSnapshot,
};
use http::StatusCode;

use crate::error::BoxError;

/// What the engine asks the upstream for.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// The outgoing request.
    pub request: RequestSnapshot,
    /// The stored entry being revalidated, if any.
    ///
    /// A collaborator that performs conditional requests can read its
    /// validators; answering `304 Not Modified` keeps the stored value.
    pub revalidating: Option<Arc<CacheEntry>>,
}

/// What the upstream produced for one request.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    /// Response metadata.
    pub response: ResponseSnapshot,
    /// The value decoded from the body. `None` for bodiless responses such
    /// as `304`.
    pub value: Option<T>,
    /// Hints declared by the value or the collaborator.
    pub hints: CacheHints,
}

impl<T> Fetched<T> {
    /// Creates a result without hints.
    pub fn new(response: ResponseSnapshot, value: T) -> Self {
        Fetched {
            response,
            value: Some(value),
            hints: CacheHints::default(),
        }
    }

    /// Creates a result for a response without a value.
    pub fn empty(response: ResponseSnapshot) -> Self {
        Fetched {
            response,
            value: None,
            hints: CacheHints::default(),
        }
    }

    /// Creates a `304 Not Modified` result.
    pub fn not_modified(headers: http::HeaderMap) -> Self {
        Self::empty(ResponseSnapshot::new(StatusCode::NOT_MODIFIED, headers, false))
    }

    /// Replaces the hints.
    pub fn with_hints(mut self, hints: CacheHints) -> Self {
        self.hints = hints;
        self
    }

    /// Returns `true` for a `304 Not Modified` response.
    pub fn is_not_modified(&self) -> bool {
        self.response.status == StatusCode::NOT_MODIFIED
    }
}

impl<T: DeclaresCaching> Fetched<T> {
    /// Creates a result whose hints come from the value itself.
    pub fn declared(response: ResponseSnapshot, value: T) -> Self {
        let hints = CacheHints::declared_by(&value);
        Fetched::new(response, value).with_hints(hints)
    }
}

impl Fetched<RawResponse> {
    /// Creates a result caching the raw response.
    pub fn raw(raw: RawResponse) -> Self {
        Fetched::new(raw.snapshot(), raw)
    }
}

/// Performs requests on behalf of the engine.
pub trait Upstream<T> {
    /// Error returned by a failed call.
    type Error: Into<BoxError>;

    /// The future that resolves to the fetched result.
    type Future: Future<Output = Result<Fetched<T>, Self::Error>> + Send;

    /// Performs `request`.
    fn call(&mut self, request: UpstreamRequest) -> Self::Future;
}

impl<T, F, Fut, E> Upstream<T> for F
where
    F: FnMut(UpstreamRequest) -> Fut,
    Fut: Future<Output = Result<Fetched<T>, E>> + Send,
    E: Into<BoxError>,
{
    type Error = E;
    type Future = Fut;

    fn call(&mut self, request: UpstreamRequest) -> Self::Future {
        self(request)
    }
}

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Engine configuration.
///
/// [`CacheConfig`] holds the engine-wide settings and is serde-friendly;
/// [`RequestOptions`] carries per-request overrides.
pub mod config;

/// [`CacheEngine`] and the results of its lifecycle operations.
pub mod engine;

/// Error types for cache operations.
///
/// Defines [`CacheError`] which covers:
/// - Configuration rejected at build time
/// - Cached values read as the wrong type
/// - Failing lifecycle handlers
/// - Upstream failures
pub mod error;

/// Lifecycle handlers: events, priorities, type constraints and the
/// registry they are collected in.
pub mod handler;

/// Dependency invalidation walk.
pub mod invalidation;

/// Request-scoped item bag shared by handlers.
pub mod items;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// for hits, misses, stale hits, stores, invalidations and handler
/// failures.
pub mod metrics;

mod pipeline;

/// Storage seam and the in-memory store.
pub mod store;

/// Seam to the collaborator that performs requests.
pub mod upstream;

pub use config::{CacheConfig, CacheConfigBuilder, RequestOptions};
pub use engine::{
    CacheEngine, CacheEngineBuilder, CacheStatus, Lookup, Outcome, SkipReason, StoreOutcome,
};
pub use error::{BoxError, CacheError};
pub use handler::{
    CacheEvent, EventContext, FnHandler, Handler, HandlerRegistry, HandlerRegistryBuilder,
    Priority, Registration, TypeConstraint,
};
pub use invalidation::Invalidated;
pub use items::Items;
pub use store::{CacheStore, MemoryStore};
pub use upstream::{Fetched, Upstream, UpstreamRequest};

pub use cachet_core::{
    CacheEntry, CacheHints, CacheKey, CachedValue, DeclaresCaching, FreshnessMetadata, KeyKind,
    RawResponse, RequestSnapshot, ResourceUri, ResponseSnapshot, ResultType, TypeMismatch,
    Validation,
};

/// The `cachet` prelude.
///
/// ```rust
/// use cachet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CacheConfig, CacheEngine, CacheError, CacheEvent, Fetched, HandlerRegistry, Priority,
        RequestOptions, TypeConstraint,
    };
}

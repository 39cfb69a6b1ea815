//! The cache engine.
//!
//! [`CacheEngine`] ties the pieces together. For a cache-eligible request:
//!
//! ```text
//! key built ─▶ lookup ─┬─ fresh / stale allowed ─▶ Hit ─▶ served
//!                      ├─ stale / must revalidate ─▶ upstream (revalidating)
//!                      │                              ├─ 304 ─▶ merge ─▶ served
//!                      │                              └─ 2xx ─▶ store
//!                      └─ nothing usable ─▶ Miss ─▶ upstream ─▶ store
//! ```
//!
//! A mutating request (`POST`, `PUT`, `PATCH`, `DELETE` or an extension
//! method) goes straight upstream. On success every entry that depends on
//! the target resource, transitively, is invalidated.
//!
//! The lifecycle operations ([`lookup`](CacheEngine::lookup),
//! [`store`](CacheEngine::store), [`revalidated`](CacheEngine::revalidated),
//! [`invalidate`](CacheEngine::invalidate)) are public for collaborators
//! that drive the request themselves. [`execute`](CacheEngine::execute)
//! drives the whole flow through an [`Upstream`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use http::{HeaderMap, StatusCode};
use tracing::{debug, trace, warn};

use cachet_core::{
    CacheEntry, CacheHints, CacheKey, CachedValue, MergePreference, RequestSnapshot, ResourceUri,
    ResponseSnapshot, ResultType, Validation, validate_at,
};
use cachet_http::{
    DurationSources, KeyContext, RequestDirectives, allow_stale, apply_request, build_key,
    extract_metadata, is_cacheable_method, is_mutating, vary_matches,
};

use crate::config::{CacheConfig, RequestOptions, Settings};
use crate::error::CacheError;
use crate::handler::{CacheEvent, EventContext, HandlerRegistry};
use crate::invalidation;
use crate::items::Items;
use crate::metrics;
use crate::pipeline::Pipeline;
use crate::store::{CacheStore, MemoryStore};
use crate::upstream::{Fetched, Upstream, UpstreamRequest};

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a fresh entry.
    Hit,
    /// Served from a stale entry the request accepted.
    Stale,
    /// The origin confirmed the stored entry with `304 Not Modified`.
    Revalidated,
    /// Fetched from upstream.
    Miss,
    /// The cache was not consulted.
    Bypass,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Stale => "stale",
            CacheStatus::Revalidated => "revalidated",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
        }
    }
}

/// Result of [`CacheEngine::lookup`].
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The request must not use the cache.
    Bypass,
    /// A fresh entry.
    Hit(Arc<CacheEntry>),
    /// A stale entry the request accepts.
    StaleHit(Arc<CacheEntry>),
    /// An entry that must be confirmed by the origin before use.
    Revalidate(Arc<CacheEntry>),
    /// Nothing usable is stored.
    Miss,
}

impl Lookup {
    /// The entry found, if any.
    pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
        match self {
            Lookup::Hit(entry) | Lookup::StaleHit(entry) | Lookup::Revalidate(entry) => Some(entry),
            Lookup::Bypass | Lookup::Miss => None,
        }
    }
}

/// Why [`CacheEngine::store`] did not write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The request must not use the cache.
    Bypass,
    /// The upstream produced no value.
    NoValue,
    /// The value declared a zero or negative cache duration.
    DeclaredUncacheable,
    /// The response failed validation.
    NotCacheable,
}

/// Result of [`CacheEngine::store`].
#[derive(Debug, Clone)]
pub enum StoreOutcome {
    /// The entry now stored under the key, merged with what was there.
    Stored(Arc<CacheEntry>),
    /// Nothing was written.
    Skipped(SkipReason),
}

/// What [`CacheEngine::execute`] returns.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    /// The value, from the cache or from upstream.
    pub value: Option<Arc<T>>,
    /// Metadata of the response the value came with.
    pub response: ResponseSnapshot,
    /// How the request was answered.
    pub status: CacheStatus,
}

struct Inner {
    config: CacheConfig,
    settings: Settings,
    handlers: HandlerRegistry,
    store: Arc<dyn CacheStore>,
}

/// Client-side HTTP response cache.
///
/// Cloning is cheap; clones share configuration, handlers and entries.
///
/// ```
/// use cachet::{CacheConfig, CacheEngine};
///
/// let engine = CacheEngine::new(CacheConfig::default()).unwrap();
/// assert!(engine.is_empty());
/// ```
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<Inner>,
}

impl fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("config", &self.inner.config)
            .field("handlers", &self.inner.handlers)
            .field("entries", &self.inner.store.len())
            .finish()
    }
}

/// Builder for [`CacheEngine`].
pub struct CacheEngineBuilder {
    config: CacheConfig,
    handlers: HandlerRegistry,
    store: Option<Arc<dyn CacheStore>>,
}

impl CacheEngineBuilder {
    /// Sets the engine-wide handlers.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Uses `store` instead of a fresh [`MemoryStore`].
    pub fn store(mut self, store: impl CacheStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Validates the configuration and builds the engine.
    pub fn build(self) -> Result<CacheEngine, CacheError> {
        let settings = self.config.compile()?;
        Ok(CacheEngine {
            inner: Arc::new(Inner {
                config: self.config,
                settings,
                handlers: self.handlers,
                store: self
                    .store
                    .unwrap_or_else(|| Arc::new(MemoryStore::new())),
            }),
        })
    }
}

impl CacheEngine {
    /// Creates an engine with no handlers and an in-memory store.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Self::builder(config).build()
    }

    /// Creates a new [`CacheEngineBuilder`].
    pub fn builder(config: CacheConfig) -> CacheEngineBuilder {
        CacheEngineBuilder {
            config,
            handlers: HandlerRegistry::default(),
            store: None,
        }
    }

    /// The configuration the engine was built from.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// The engine-wide handlers.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    /// The underlying store.
    pub fn cache_store(&self) -> &dyn CacheStore {
        self.inner.store.as_ref()
    }

    /// Builds the key `request` is stored under for `result_type`.
    pub fn key_for(&self, request: &RequestSnapshot, result_type: ResultType) -> CacheKey {
        build_key(
            &self.inner.settings.resolver,
            &KeyContext::new(result_type, &request.uri, &request.headers),
        )
    }

    /// Reads the entry under `key`.
    pub fn entry(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.inner.store.get(key)
    }

    /// Reads the value under `key` as `T`.
    ///
    /// A value of another type is an error, or `None` when type mismatches
    /// are suppressed.
    pub fn get<T: Any + Send + Sync>(&self, key: &CacheKey) -> Result<Option<Arc<T>>, CacheError> {
        match self.inner.store.get(key) {
            Some(entry) => self.read_value(&entry),
            None => Ok(None),
        }
    }

    /// Removes every entry without firing handlers.
    pub fn clear(&self) {
        self.inner.store.clear();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    fn pipeline<'a>(&'a self, options: &'a RequestOptions) -> Pipeline<'a> {
        Pipeline::new(
            &self.inner.handlers,
            options.handlers.as_ref(),
            self.inner.settings.suppress_handler_errors,
        )
    }

    fn bypasses(&self, request: &RequestSnapshot, options: &RequestOptions) -> bool {
        !self.inner.settings.enabled
            || options.no_cache
            || !is_cacheable_method(&request.method)
            || RequestDirectives::from_headers(&request.headers).no_store
    }

    fn read_value<T: Any + Send + Sync>(
        &self,
        entry: &CacheEntry,
    ) -> Result<Option<Arc<T>>, CacheError> {
        match entry.value.downcast_arc::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(mismatch) if self.inner.settings.suppress_type_mismatch => {
                warn!(
                    uri = %entry.uri(),
                    error = %mismatch,
                    "ignoring cached value of unexpected type"
                );
                Ok(None)
            }
            Err(mismatch) => Err(mismatch.into()),
        }
    }

    fn hints_for(
        &self,
        uri: &ResourceUri,
        mut hints: CacheHints,
        options: &RequestOptions,
    ) -> CacheHints {
        hints.depends_on.extend(options.depends_on.iter().cloned());
        if let Some(configured) = self.inner.settings.dependencies.get(uri) {
            hints.depends_on.extend(configured.iter().cloned());
        }
        hints
    }

    fn sources(&self, options: &RequestOptions) -> DurationSources {
        DurationSources {
            explicit: options.duration,
            declared: None,
            default: self.inner.settings.default_duration,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn fire(
        &self,
        pipeline: &Pipeline<'_>,
        event: CacheEvent,
        key: &CacheKey,
        result_type: ResultType,
        request: &RequestSnapshot,
        entry: Option<&CacheEntry>,
        items: &mut Items,
    ) -> Result<(), CacheError> {
        let mut cx = EventContext::new(event, key, result_type, request, items);
        if let Some(entry) = entry {
            cx = cx.with_response(&entry.response).with_value(&entry.value);
        }
        pipeline.run(&mut cx).await
    }

    /// Removes one entry, firing `Expiring` before and `Expired` after.
    ///
    /// The entry is removed even if an `Expiring` handler fails; the first
    /// handler error is returned once both events ran. An entry replaced
    /// while the handlers ran is left in place.
    async fn expire(
        &self,
        pipeline: &Pipeline<'_>,
        key: &CacheKey,
        entry: &Arc<CacheEntry>,
        items: &mut Items,
    ) -> Result<(), CacheError> {
        let result_type = entry.value.result_type();
        let expiring = self
            .fire(
                pipeline,
                CacheEvent::Expiring,
                key,
                result_type,
                &entry.request,
                Some(entry.as_ref()),
                items,
            )
            .await;
        if self.inner.store.remove_if_same(key, entry) {
            trace!(key = %key, "entry removed");
        } else {
            trace!(key = %key, "entry replaced before removal, kept");
        }
        let expired = self
            .fire(
                pipeline,
                CacheEvent::Expired,
                key,
                result_type,
                &entry.request,
                Some(entry.as_ref()),
                items,
            )
            .await;
        expiring.and(expired)
    }

    /// Looks up the entry for `request` and decides how it may be used.
    ///
    /// Fires `Hit` for [`Lookup::Hit`] and [`Lookup::StaleHit`], `Miss` for
    /// [`Lookup::Miss`] and [`Lookup::Revalidate`], nothing for
    /// [`Lookup::Bypass`]. An entry found to be uncacheable is removed.
    #[tracing::instrument(skip_all, fields(method = %request.method, uri = %request.uri))]
    pub async fn lookup(
        &self,
        request: &RequestSnapshot,
        result_type: ResultType,
        options: &RequestOptions,
        items: &mut Items,
    ) -> Result<Lookup, CacheError> {
        if self.bypasses(request, options) {
            debug!("cache bypassed");
            return Ok(Lookup::Bypass);
        }

        let pipeline = self.pipeline(options);
        let key = self.key_for(request, result_type);
        let Some(entry) = self.inner.store.get(&key) else {
            debug!(key = %key, "cache miss");
            metrics::miss();
            self.fire(&pipeline, CacheEvent::Miss, &key, result_type, request, None, items)
                .await?;
            return Ok(Lookup::Miss);
        };

        if !vary_matches(
            &entry.request.headers,
            &request.headers,
            &entry.metadata.vary_headers,
        ) {
            debug!(key = %key, "stored variant does not match request");
            metrics::miss();
            self.fire(&pipeline, CacheEvent::Miss, &key, result_type, request, None, items)
                .await?;
            return Ok(Lookup::Miss);
        }

        let now = Utc::now();
        let directives = RequestDirectives::from_headers(&request.headers);
        let validation = apply_request(
            validate_at(&entry.metadata, &self.inner.settings.cacheable, now),
            &directives,
            &entry.metadata,
            now,
        );
        debug!(key = %key, validation = validation.as_str(), "cache entry found");

        let lookup = match validation {
            Validation::NotCacheable => {
                self.expire(&pipeline, &key, &entry, items).await?;
                Lookup::Miss
            }
            _ if directives.no_cache => Lookup::Revalidate(entry),
            Validation::Ok => Lookup::Hit(entry),
            Validation::Stale if allow_stale(&directives, &entry.metadata, now) => {
                Lookup::StaleHit(entry)
            }
            Validation::Stale | Validation::MustRevalidate => Lookup::Revalidate(entry),
        };

        match &lookup {
            Lookup::Hit(entry) | Lookup::StaleHit(entry) => {
                metrics::hit(matches!(lookup, Lookup::StaleHit(_)));
                self.fire(
                    &pipeline,
                    CacheEvent::Hit,
                    &key,
                    result_type,
                    request,
                    Some(entry.as_ref()),
                    items,
                )
                .await?;
            }
            Lookup::Revalidate(entry) => {
                metrics::miss();
                self.fire(
                    &pipeline,
                    CacheEvent::Miss,
                    &key,
                    result_type,
                    request,
                    Some(entry.as_ref()),
                    items,
                )
                .await?;
            }
            Lookup::Miss => {
                metrics::miss();
                self.fire(&pipeline, CacheEvent::Miss, &key, result_type, request, None, items)
                    .await?;
            }
            Lookup::Bypass => {}
        }
        Ok(lookup)
    }

    /// Stores what the upstream returned for `request`.
    ///
    /// The entry is merged with any entry already stored under the same key,
    /// keeping the later instants. Fires `Store` when something was written.
    #[tracing::instrument(skip_all, fields(method = %request.method, uri = %request.uri))]
    pub async fn store<T: Any + Send + Sync>(
        &self,
        request: &RequestSnapshot,
        fetched: Fetched<T>,
        options: &RequestOptions,
        items: &mut Items,
    ) -> Result<StoreOutcome, CacheError> {
        let pipeline = self.pipeline(options);
        let Fetched {
            response,
            value,
            hints,
        } = fetched;
        self.store_value(
            &pipeline,
            request,
            ResultType::of::<T>(),
            response,
            value.map(CachedValue::typed),
            hints,
            options,
            items,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn store_value(
        &self,
        pipeline: &Pipeline<'_>,
        request: &RequestSnapshot,
        result_type: ResultType,
        response: ResponseSnapshot,
        value: Option<CachedValue>,
        hints: CacheHints,
        options: &RequestOptions,
        items: &mut Items,
    ) -> Result<StoreOutcome, CacheError> {
        if self.bypasses(request, options) {
            return Ok(StoreOutcome::Skipped(SkipReason::Bypass));
        }
        let Some(value) = value else {
            return Ok(StoreOutcome::Skipped(SkipReason::NoValue));
        };
        if hints.forbids_caching() {
            debug!("value declared itself uncacheable");
            return Ok(StoreOutcome::Skipped(SkipReason::DeclaredUncacheable));
        }

        let now = Utc::now();
        let hints = self.hints_for(&request.uri, hints, options);
        let metadata = extract_metadata(
            request.uri.clone(),
            &response,
            &hints,
            &self.sources(options),
            now,
        );
        let validation = validate_at(&metadata, &self.inner.settings.cacheable, now);
        if validation == Validation::NotCacheable {
            debug!(status = %response.status, "response not cacheable");
            return Ok(StoreOutcome::Skipped(SkipReason::NotCacheable));
        }

        let key = self.key_for(request, result_type);
        let incoming = CacheEntry::new(value, request.clone(), response, metadata);
        let entry = self.inner.store.update(key.clone(), &mut |existing| match existing {
            Some(existing) => Arc::new(incoming.with_metadata(
                existing
                    .metadata
                    .merge(&incoming.metadata, MergePreference::Greater),
            )),
            None => Arc::new(incoming.clone()),
        });
        debug!(key = %key, expiration = ?entry.metadata.expiration, "entry stored");
        metrics::stored();

        self.fire(
            pipeline,
            CacheEvent::Store,
            &key,
            result_type,
            request,
            Some(entry.as_ref()),
            items,
        )
        .await?;
        Ok(StoreOutcome::Stored(entry))
    }

    /// Applies a `304 Not Modified` to the stored entry of `request`.
    ///
    /// The stored value and status are kept; the freshness metadata of the
    /// `304` is merged in. Returns the refreshed entry, or `None` when
    /// nothing was stored or the merged entry is no longer cacheable.
    #[tracing::instrument(skip_all, fields(uri = %request.uri))]
    pub async fn revalidated(
        &self,
        request: &RequestSnapshot,
        result_type: ResultType,
        response: &ResponseSnapshot,
        options: &RequestOptions,
        items: &mut Items,
    ) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        let pipeline = self.pipeline(options);
        self.revalidated_with(&pipeline, request, result_type, response, options, items)
            .await
    }

    async fn revalidated_with(
        &self,
        pipeline: &Pipeline<'_>,
        request: &RequestSnapshot,
        result_type: ResultType,
        response: &ResponseSnapshot,
        options: &RequestOptions,
        items: &mut Items,
    ) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        let key = self.key_for(request, result_type);
        let Some(existing) = self.inner.store.get(&key) else {
            debug!(key = %key, "nothing to revalidate");
            return Ok(None);
        };

        let now = Utc::now();
        let hints = self.hints_for(&request.uri, CacheHints::default(), options);
        let mut incoming = extract_metadata(
            request.uri.clone(),
            response,
            &hints,
            &self.sources(options),
            now,
        );
        incoming.status = existing.metadata.status;

        let entry = self.inner.store.update(key.clone(), &mut |current| {
            let base = current.map(Arc::as_ref).unwrap_or(existing.as_ref());
            Arc::new(base.with_metadata(base.metadata.merge(&incoming, MergePreference::Greater)))
        });

        if validate_at(&entry.metadata, &self.inner.settings.cacheable, now)
            == Validation::NotCacheable
        {
            self.expire(pipeline, &key, &entry, items).await?;
            return Ok(None);
        }

        debug!(key = %key, expiration = ?entry.metadata.expiration, "entry revalidated");
        metrics::stored();
        self.fire(
            pipeline,
            CacheEvent::Store,
            &key,
            result_type,
            request,
            Some(entry.as_ref()),
            items,
        )
        .await?;
        Ok(Some(entry))
    }

    /// Removes every entry that depends on `uri`, transitively.
    ///
    /// Each removed entry fires `Expiring` while still stored and `Expired`
    /// once removed. Returns the keys removed, in walk order. A handler
    /// failure never keeps an entry: every planned entry is removed and the
    /// first error is returned afterwards.
    #[tracing::instrument(skip_all, fields(uri = %uri))]
    pub async fn invalidate(
        &self,
        uri: &ResourceUri,
        items: &mut Items,
    ) -> Result<Vec<CacheKey>, CacheError> {
        let options = RequestOptions::default();
        let pipeline = self.pipeline(&options);
        self.invalidate_with(&pipeline, uri, items).await
    }

    async fn invalidate_with(
        &self,
        pipeline: &Pipeline<'_>,
        uri: &ResourceUri,
        items: &mut Items,
    ) -> Result<Vec<CacheKey>, CacheError> {
        let planned = invalidation::plan(uri, self.inner.store.as_ref());
        let mut removed = Vec::with_capacity(planned.len());
        let mut first_error = None;
        // Every planned entry goes, whatever its handlers return.
        for item in planned {
            if let Err(err) = self.expire(pipeline, &item.key, &item.entry, items).await {
                first_error.get_or_insert(err);
            }
            removed.push(item.key);
        }
        debug!(removed = removed.len(), "dependents invalidated");
        metrics::invalidated(removed.len());
        match first_error {
            Some(err) => Err(err),
            None => Ok(removed),
        }
    }

    /// Answers `request` from the cache or through `upstream`.
    ///
    /// One [`Items`] bag is shared by every handler run of the request.
    #[tracing::instrument(skip_all, fields(method = %request.method, uri = %request.uri))]
    pub async fn execute<T, U>(
        &self,
        request: RequestSnapshot,
        options: &RequestOptions,
        upstream: &mut U,
    ) -> Result<Outcome<T>, CacheError>
    where
        T: Any + Send + Sync,
        U: Upstream<T>,
    {
        let mut items = Items::new();
        let pipeline = self.pipeline(options);

        if is_mutating(&request.method) {
            let fetched = fetch(upstream, &request, None).await?;
            if fetched.response.status.is_success() {
                self.invalidate_with(&pipeline, &request.uri, &mut items)
                    .await?;
            }
            return Ok(Outcome {
                value: fetched.value.map(Arc::new),
                response: fetched.response,
                status: CacheStatus::Bypass,
            });
        }

        let result_type = ResultType::of::<T>();
        let (revalidating, bypass) = match self
            .lookup(&request, result_type, options, &mut items)
            .await?
        {
            Lookup::Hit(entry) => {
                if let Some(outcome) = self.serve(&entry, CacheStatus::Hit)? {
                    return Ok(outcome);
                }
                (None, false)
            }
            Lookup::StaleHit(entry) => {
                if let Some(outcome) = self.serve(&entry, CacheStatus::Stale)? {
                    return Ok(outcome);
                }
                (None, false)
            }
            Lookup::Revalidate(entry) => (Some(entry), false),
            Lookup::Miss => (None, false),
            Lookup::Bypass => (None, true),
        };

        if !bypass && RequestDirectives::from_headers(&request.headers).only_if_cached {
            debug!("only-if-cached request without usable entry");
            return Ok(Outcome {
                value: None,
                response: ResponseSnapshot::new(
                    StatusCode::GATEWAY_TIMEOUT,
                    HeaderMap::new(),
                    false,
                ),
                status: CacheStatus::Miss,
            });
        }

        let revalidation = revalidating.is_some();
        let fetched = fetch(upstream, &request, revalidating).await?;

        if bypass {
            return Ok(Outcome {
                value: fetched.value.map(Arc::new),
                response: fetched.response,
                status: CacheStatus::Bypass,
            });
        }

        if revalidation && fetched.is_not_modified() {
            let refreshed = self
                .revalidated_with(
                    &pipeline,
                    &request,
                    result_type,
                    &fetched.response,
                    options,
                    &mut items,
                )
                .await?;
            if let Some(entry) = refreshed
                && let Some(outcome) = self.serve(&entry, CacheStatus::Revalidated)?
            {
                return Ok(outcome);
            }
            return Ok(Outcome {
                value: None,
                response: fetched.response,
                status: CacheStatus::Miss,
            });
        }

        let Fetched {
            response,
            value,
            hints,
        } = fetched;
        let value = value.map(CachedValue::typed);
        let returned = value
            .as_ref()
            .map(CachedValue::downcast_arc::<T>)
            .transpose()?;
        self.store_value(
            &pipeline,
            &request,
            result_type,
            response.clone(),
            value,
            hints,
            options,
            &mut items,
        )
        .await?;

        Ok(Outcome {
            value: returned,
            response,
            status: CacheStatus::Miss,
        })
    }

    fn serve<T: Any + Send + Sync>(
        &self,
        entry: &Arc<CacheEntry>,
        status: CacheStatus,
    ) -> Result<Option<Outcome<T>>, CacheError> {
        Ok(self.read_value::<T>(entry)?.map(|value| Outcome {
            value: Some(value),
            response: entry.response.clone(),
            status,
        }))
    }
}

async fn fetch<T, U>(
    upstream: &mut U,
    request: &RequestSnapshot,
    revalidating: Option<Arc<CacheEntry>>,
) -> Result<Fetched<T>, CacheError>
where
    U: Upstream<T>,
{
    trace!(revalidating = revalidating.is_some(), "calling upstream");
    upstream
        .call(UpstreamRequest {
            request: request.clone(),
            revalidating,
        })
        .await
        .map_err(|err| CacheError::Upstream(err.into()))
}

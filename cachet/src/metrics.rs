//! Metrics declaration and recording.
//!
//! With the `metrics` feature enabled the engine reports counters through
//! the [`metrics`](https://docs.rs/metrics) facade. Without it every
//! recording function is an empty inline function.

use crate::handler::CacheEvent;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of entries served from the cache.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_hit_total",
            "Total number of requests served from the cache."
        );
        "cachet_cache_hit_total"
    };
    /// Track number of lookups without a servable entry.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_miss_total",
            "Total number of lookups that found no servable entry."
        );
        "cachet_cache_miss_total"
    };
    /// Track number of stale entries served.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_stale_total",
            "Total number of stale entries served because the request allowed it."
        );
        "cachet_cache_stale_total"
    };
    /// Track number of entries written.
    pub static ref CACHE_STORE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_store_total",
            "Total number of entries written to the cache."
        );
        "cachet_cache_store_total"
    };
    /// Track number of entries removed by dependency invalidation.
    pub static ref CACHE_INVALIDATED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_cache_invalidated_total",
            "Total number of entries removed by dependency invalidation."
        );
        "cachet_cache_invalidated_total"
    };
    /// Track number of failed lifecycle handlers.
    pub static ref HANDLER_ERROR_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachet_handler_errors_total",
            "Total number of lifecycle handler failures."
        );
        "cachet_handler_errors_total"
    };
}

/// Records an entry served from the cache.
#[cfg(feature = "metrics")]
#[inline]
pub fn hit(stale: bool) {
    metrics::counter!(*CACHE_HIT_COUNTER).increment(1);
    if stale {
        metrics::counter!(*CACHE_STALE_COUNTER).increment(1);
    }
}

/// Records a lookup without a servable entry.
#[cfg(feature = "metrics")]
#[inline]
pub fn miss() {
    metrics::counter!(*CACHE_MISS_COUNTER).increment(1);
}

/// Records a write.
#[cfg(feature = "metrics")]
#[inline]
pub fn stored() {
    metrics::counter!(*CACHE_STORE_COUNTER).increment(1);
}

/// Records entries removed by invalidation.
#[cfg(feature = "metrics")]
#[inline]
pub fn invalidated(count: usize) {
    metrics::counter!(*CACHE_INVALIDATED_COUNTER).increment(count as u64);
}

/// Records a handler failure.
#[cfg(feature = "metrics")]
#[inline]
pub fn handler_failed(event: CacheEvent) {
    metrics::counter!(*HANDLER_ERROR_COUNTER, "event" => event.as_str()).increment(1);
}

/// No-op when the `metrics` feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline(always)]
pub fn hit(_stale: bool) {}

/// No-op when the `metrics` feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline(always)]
pub fn miss() {}

/// No-op when the `metrics` feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline(always)]
pub fn stored() {}

/// No-op when the `metrics` feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline(always)]
pub fn invalidated(_count: usize) {}

/// No-op when the `metrics` feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline(always)]
pub fn handler_failed(_event: CacheEvent) {}

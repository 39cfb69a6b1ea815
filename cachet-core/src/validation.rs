//! Classification of stored metadata.
//!
//! [`validate`] decides what the engine may do with an entry. The rules are
//! checked in a fixed order and the first match wins:
//!
//! 1. status code not cacheable → [`Validation::NotCacheable`]
//! 2. `no-store` → [`Validation::NotCacheable`]
//! 3. no body → [`Validation::NotCacheable`]
//! 4. no expiration → [`Validation::NotCacheable`]
//! 5. `no-cache` → [`Validation::MustRevalidate`]
//! 6. expired → [`Validation::MustRevalidate`] if `must-revalidate`, else [`Validation::Stale`]
//! 7. otherwise → [`Validation::Ok`]
//!
//! `no-cache` is checked before expiration so an explicitly uncacheable
//! response is never downgraded to merely stale, where a request's
//! `max-stale` could still serve it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use http::StatusCode;

use crate::metadata::FreshnessMetadata;

/// Outcome of validating an entry's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Fresh; may be served as is.
    Ok,
    /// Must not be served without contacting the origin.
    MustRevalidate,
    /// Past its expiration; servable only if the request allows stale data.
    Stale,
    /// Must not be stored or served.
    NotCacheable,
}

impl Validation {
    /// Returns the outcome as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Validation::Ok => "ok",
            Validation::MustRevalidate => "must-revalidate",
            Validation::Stale => "stale",
            Validation::NotCacheable => "not-cacheable",
        }
    }
}

/// Set of response status codes whose responses may be cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheableStatusCodes(BTreeSet<u16>);

impl CacheableStatusCodes {
    /// Creates a set from raw status codes.
    pub fn new(codes: impl IntoIterator<Item = u16>) -> Self {
        Self(codes.into_iter().collect())
    }

    /// Returns `true` if responses with `status` may be cached.
    pub fn contains(&self, status: StatusCode) -> bool {
        self.0.contains(&status.as_u16())
    }

    /// Iterates over the codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl Default for CacheableStatusCodes {
    /// Status codes that are cacheable by default (RFC 9110, section 15.1).
    fn default() -> Self {
        Self::new([200, 203, 204, 206, 300, 301, 404, 405, 410, 414, 501])
    }
}

/// Classifies `metadata` against the current time.
pub fn validate(metadata: &FreshnessMetadata, cacheable: &CacheableStatusCodes) -> Validation {
    validate_at(metadata, cacheable, Utc::now())
}

/// Classifies `metadata` against an explicit clock.
pub fn validate_at(
    metadata: &FreshnessMetadata,
    cacheable: &CacheableStatusCodes,
    now: DateTime<Utc>,
) -> Validation {
    if !cacheable.contains(metadata.status) {
        return Validation::NotCacheable;
    }
    if metadata.no_store {
        return Validation::NotCacheable;
    }
    if !metadata.has_content {
        return Validation::NotCacheable;
    }
    let Some(expiration) = metadata.expiration else {
        return Validation::NotCacheable;
    };
    if metadata.no_cache {
        return Validation::MustRevalidate;
    }
    if expiration <= now {
        return if metadata.should_revalidate {
            Validation::MustRevalidate
        } else {
            Validation::Stale
        };
    }
    Validation::Ok
}

//! Request-side freshness policy.
//!
//! The validator classifies an entry on its own. The functions here take
//! the current request into account: whether it accepts a stale entry,
//! whether it demands more remaining freshness than the entry has, and
//! whether it matches the request the entry was stored for.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use http::HeaderMap;

use cachet_core::{FreshnessMetadata, SmolStr, Validation};

use crate::directives::{MaxStale, RequestDirectives};
use crate::key::normalize_header_value;

// Directive arguments are unbounded; saturate instead of panicking.
fn seconds(n: i64) -> TimeDelta {
    TimeDelta::try_seconds(n).unwrap_or(if n < 0 { TimeDelta::MIN } else { TimeDelta::MAX })
}

/// Returns `true` if the request accepts serving a stale entry.
///
/// Directives are checked in order:
///
/// 1. an entry that is `no-cache` or `must-revalidate` is never served stale
/// 2. `min-fresh` asks for freshness, so staleness is refused
/// 3. `max-stale` accepts any staleness, or up to its limit
/// 4. `max-age=N` accepts an entry no older than `N` seconds
///
/// Without any of these directives stale entries are refused.
pub fn allow_stale(
    request: &RequestDirectives,
    metadata: &FreshnessMetadata,
    now: DateTime<Utc>,
) -> bool {
    if metadata.no_cache || metadata.should_revalidate {
        return false;
    }
    if request.min_fresh.is_some() {
        return false;
    }
    match request.max_stale {
        Some(MaxStale::Any) => return true,
        Some(MaxStale::Limit(limit)) => {
            let staleness = metadata
                .expiration
                .map(|expiration| now - expiration)
                .unwrap_or(TimeDelta::MAX);
            if staleness <= seconds(limit) {
                return true;
            }
        }
        None => {}
    }
    if let Some(max_age) = request.max_age {
        return now - metadata.date <= seconds(max_age);
    }
    false
}

/// Adjusts a validation result to the request's own freshness demands.
///
/// A fresh entry with less remaining lifetime than `min-fresh` is
/// downgraded to [`Validation::Stale`]. Other results pass through.
pub fn apply_request(
    validation: Validation,
    request: &RequestDirectives,
    metadata: &FreshnessMetadata,
    now: DateTime<Utc>,
) -> Validation {
    match (validation, request.min_fresh, metadata.expiration) {
        (Validation::Ok, Some(min_fresh), Some(expiration))
            if expiration - now < seconds(min_fresh) =>
        {
            Validation::Stale
        }
        (validation, _, _) => validation,
    }
}

/// Returns `true` if `current` carries the same values as `stored` for
/// every header listed by the stored response's `Vary`.
///
/// Values are compared the way keys compare them: normalized and ignoring
/// ASCII case.
pub fn vary_matches(
    stored: &HeaderMap,
    current: &HeaderMap,
    vary_headers: &BTreeSet<SmolStr>,
) -> bool {
    vary_headers.iter().all(|name| {
        let values = |headers: &HeaderMap| {
            headers
                .get_all(name.as_str())
                .iter()
                .map(|value| normalize_header_value(value.as_bytes()))
                .collect::<Vec<_>>()
        };
        let (stored, current) = (values(stored), values(current));
        stored.len() == current.len()
            && stored
                .iter()
                .zip(&current)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

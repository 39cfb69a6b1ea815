//! Freshness computation.
//!
//! Several sources compete to decide how long a response stays fresh. They
//! are tried in priority order and the first usable one wins:
//!
//! 1. The explicit per-request duration override
//! 2. The duration the fetched value declared about itself
//! 3. The configured default duration
//! 4. The response `max-age`
//! 5. The response `s-maxage`
//! 6. The response `Expires` header
//!
//! A zero or negative duration means "don't use this source" and falls
//! through to the next one. Durations are added to the baseline: the
//! response `Last-Modified` when present, else its `Date`. `Expires` is an
//! absolute instant and ignores the baseline.

use chrono::{DateTime, TimeDelta, Utc};
use http::header::{DATE, ETAG, EXPIRES, LAST_MODIFIED};

use cachet_core::{CacheHints, FreshnessMetadata, ResourceUri, ResponseSnapshot, SmolStr};

use crate::date::{header_date, parse_http_date};
use crate::directives::ResponseDirectives;
use crate::vary::parse_vary;

/// Configured and per-request durations fed into [`compute_expiration`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationSources {
    /// Explicit per-request override.
    pub explicit: Option<TimeDelta>,
    /// Duration declared by the fetched value.
    pub declared: Option<TimeDelta>,
    /// Configured default for values that declare themselves cacheable.
    ///
    /// [`extract_metadata`] drops it unless the hints were declared by the
    /// value.
    pub default: Option<TimeDelta>,
}

/// Value of the `Expires` header as far as freshness is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expires {
    /// A valid HTTP-date.
    At(DateTime<Utc>),
    /// Present but unparsable, which means "already expired".
    Invalid,
}

impl Expires {
    /// Reads the `Expires` header of `headers`.
    pub fn from_headers(headers: &http::HeaderMap) -> Option<Self> {
        let raw = headers.get(EXPIRES)?;
        Some(
            raw.to_str()
                .ok()
                .and_then(parse_http_date)
                .map(Expires::At)
                .unwrap_or(Expires::Invalid),
        )
    }

    fn instant(self) -> DateTime<Utc> {
        match self {
            Expires::At(at) => at,
            Expires::Invalid => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

fn positive(duration: Option<TimeDelta>) -> Option<TimeDelta> {
    duration.filter(|d| *d > TimeDelta::zero())
}

fn positive_seconds(seconds: Option<i64>) -> Option<TimeDelta> {
    positive(seconds.and_then(TimeDelta::try_seconds))
}

/// Computes the expiration instant of a response, if any source yields one.
pub fn compute_expiration(
    baseline: DateTime<Utc>,
    directives: &ResponseDirectives,
    expires: Option<Expires>,
    sources: &DurationSources,
) -> Option<DateTime<Utc>> {
    let duration = positive(sources.explicit)
        .or_else(|| positive(sources.declared))
        .or_else(|| positive(sources.default))
        .or_else(|| positive_seconds(directives.max_age))
        .or_else(|| positive_seconds(directives.s_maxage));

    match duration {
        Some(duration) => baseline.checked_add_signed(duration),
        None => expires.map(Expires::instant),
    }
}

/// Builds the freshness metadata of a freshly received response.
///
/// Missing or malformed headers fall back to defaults: no `Date` means
/// `now`, and no usable freshness source leaves `expiration` empty, which the
/// validator treats as not cacheable.
pub fn extract_metadata(
    uri: ResourceUri,
    response: &ResponseSnapshot,
    hints: &CacheHints,
    sources: &DurationSources,
    now: DateTime<Utc>,
) -> FreshnessMetadata {
    let headers = &response.headers;
    let directives = ResponseDirectives::from_headers(headers);
    let date = header_date(headers, &DATE).unwrap_or(now);

    let mut metadata = FreshnessMetadata::new(uri, response.status, date);
    metadata.last_modified = header_date(headers, &LAST_MODIFIED);
    metadata.has_content = response.has_body;
    metadata.no_store = directives.no_store;
    metadata.no_cache = directives.no_cache;
    metadata.should_revalidate = directives.must_revalidate || directives.proxy_revalidate;
    metadata.etags = headers
        .get_all(ETAG)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(|value| SmolStr::new(value.trim()))
        .filter(|value| !value.is_empty())
        .collect();
    metadata.etags.dedup();

    let vary = parse_vary(headers);
    if vary.wildcard {
        // `Vary: *` can never match a later request.
        metadata.no_cache = true;
    }
    metadata.vary_headers = vary.names;
    metadata.dependent_uris = hints.depends_on.iter().cloned().collect();

    let sources = DurationSources {
        declared: hints.duration.or(sources.declared),
        default: sources.default.filter(|_| hints.declared),
        ..*sources
    };
    metadata.expiration = compute_expiration(
        metadata.baseline(),
        &directives,
        Expires::from_headers(headers),
        &sources,
    );
    metadata
}

//! `Cache-Control` directive parsing.
//!
//! Directives are read from every `Cache-Control` field of a header map,
//! split on commas outside quoted strings, and matched case-insensitively.
//! Unknown directives are ignored. A directive whose argument doesn't parse
//! as a number of seconds is treated as absent, except `max-stale`, where a
//! missing argument means "any staleness".
//!
//! ```
//! use cachet_http::{RequestDirectives, ResponseDirectives, MaxStale};
//! use http::HeaderMap;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("cache-control", "Public, MAX-AGE=60, must-revalidate".parse().unwrap());
//! let response = ResponseDirectives::from_headers(&headers);
//! assert_eq!(response.max_age, Some(60));
//! assert!(response.must_revalidate);
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("cache-control", "max-stale".parse().unwrap());
//! let request = RequestDirectives::from_headers(&headers);
//! assert_eq!(request.max_stale, Some(MaxStale::Any));
//! ```

use http::HeaderMap;
use http::header::{CACHE_CONTROL, PRAGMA};

/// One parsed directive: lower-cased name and optional unquoted argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive name, lower-cased.
    pub name: String,
    /// Directive argument with surrounding quotes removed.
    pub value: Option<String>,
}

impl Directive {
    fn seconds(&self) -> Option<i64> {
        self.value.as_deref()?.trim().parse::<i64>().ok()
    }
}

/// Splits all `Cache-Control` fields of `headers` into directives.
pub fn parse_cache_control(headers: &HeaderMap) -> Vec<Directive> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(split_directives)
        .collect()
}

fn split_directives(field: &str) -> Vec<Directive> {
    let mut directives = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in field.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => {
                if let Some(directive) = parse_directive(&current) {
                    directives.push(directive);
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if let Some(directive) = parse_directive(&current) {
        directives.push(directive);
    }
    directives
}

fn parse_directive(raw: &str) -> Option<Directive> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (name, value) = match raw.split_once('=') {
        Some((name, value)) => {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            (name.trim(), Some(value.to_owned()))
        }
        None => (raw, None),
    };
    Some(Directive {
        name: name.to_ascii_lowercase(),
        value,
    })
}

/// Caching directives carried by a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseDirectives {
    /// `no-store`.
    pub no_store: bool,
    /// `no-cache`, or `Pragma: no-cache` without any `Cache-Control`.
    pub no_cache: bool,
    /// `must-revalidate`.
    pub must_revalidate: bool,
    /// `proxy-revalidate`.
    pub proxy_revalidate: bool,
    /// `private`.
    pub private: bool,
    /// `public`.
    pub public: bool,
    /// `max-age`, in seconds.
    pub max_age: Option<i64>,
    /// `s-maxage`, in seconds.
    pub s_maxage: Option<i64>,
}

impl ResponseDirectives {
    /// Parses the directives of a response header map.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut directives = ResponseDirectives::default();
        let parsed = parse_cache_control(headers);

        for directive in &parsed {
            match directive.name.as_str() {
                "no-store" => directives.no_store = true,
                "no-cache" => directives.no_cache = true,
                "must-revalidate" => directives.must_revalidate = true,
                "proxy-revalidate" => directives.proxy_revalidate = true,
                "private" => directives.private = true,
                "public" => directives.public = true,
                "max-age" => directives.max_age = directive.seconds(),
                "s-maxage" => directives.s_maxage = directive.seconds(),
                _ => {}
            }
        }

        if parsed.is_empty() && pragma_no_cache(headers) {
            directives.no_cache = true;
        }
        directives
    }
}

/// How much staleness a request accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxStale {
    /// `max-stale` without argument.
    Any,
    /// `max-stale=N`.
    Limit(i64),
}

/// Caching directives carried by a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDirectives {
    /// `no-store`: the request must not read or write the cache.
    pub no_store: bool,
    /// `no-cache` or `Pragma: no-cache`: stored entries must not be served.
    pub no_cache: bool,
    /// `max-age`, in seconds.
    pub max_age: Option<i64>,
    /// `max-stale`.
    pub max_stale: Option<MaxStale>,
    /// `min-fresh`, in seconds.
    pub min_fresh: Option<i64>,
    /// `only-if-cached`.
    pub only_if_cached: bool,
}

impl RequestDirectives {
    /// Parses the directives of a request header map.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut directives = RequestDirectives::default();
        let parsed = parse_cache_control(headers);

        for directive in &parsed {
            match directive.name.as_str() {
                "no-store" => directives.no_store = true,
                "no-cache" => directives.no_cache = true,
                "max-age" => directives.max_age = directive.seconds(),
                "max-stale" => {
                    directives.max_stale = match directive.value {
                        None => Some(MaxStale::Any),
                        Some(_) => directive.seconds().map(MaxStale::Limit),
                    }
                }
                "min-fresh" => directives.min_fresh = directive.seconds(),
                "only-if-cached" => directives.only_if_cached = true,
                _ => {}
            }
        }

        if parsed.is_empty() && pragma_no_cache(headers) {
            directives.no_cache = true;
        }
        directives
    }
}

fn pragma_no_cache(headers: &HeaderMap) -> bool {
    headers
        .get_all(PRAGMA)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("no-cache"))
}

#![warn(missing_docs)]
//! # cachet-http
//!
//! HTTP caching semantics for the cachet response cache.
//!
//! This crate reads headers and turns them into the facts `cachet-core`
//! works with:
//!
//! | Concern | Entry point |
//! |---------|-------------|
//! | `Cache-Control` and `Pragma` | [`ResponseDirectives`], [`RequestDirectives`] |
//! | HTTP-dates | [`parse_http_date`] |
//! | Freshness lifetime | [`compute_expiration`], [`extract_metadata`] |
//! | Stale serving and `min-fresh` | [`allow_stale`], [`apply_request`] |
//! | Vary-by headers | [`VaryByResolver`], [`parse_vary`], [`vary_matches`] |
//! | Cache keys | [`build_key`] |
//! | Mutating methods | [`is_mutating`] |
//!
//! Nothing here performs I/O or keeps state beyond immutable configuration.

pub mod date;
pub mod directives;
pub mod error;
pub mod freshness;
pub mod key;
pub mod method;
pub mod policy;
pub mod vary;

pub use date::{format_http_date, header_date, parse_http_date};
pub use directives::{
    Directive, MaxStale, RequestDirectives, ResponseDirectives, parse_cache_control,
};
pub use error::ConfigError;
pub use freshness::{DurationSources, Expires, compute_expiration, extract_metadata};
pub use key::{KeyContext, build_key, normalize_header_value};
pub use method::{is_cacheable_method, is_mutating};
pub use policy::{allow_stale, apply_request, vary_matches};
pub use vary::{ResponseVary, VaryByResolver, VaryByResolverBuilder, VarySet, parse_vary};

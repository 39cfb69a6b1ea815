#![warn(missing_docs)]
//! # cachet-core
//!
//! Data model of the cachet client-side HTTP response cache.
//!
//! This crate holds the types every other part of cachet passes around and
//! the pure decisions made over them:
//!
//! - **Identify** resources and entries ([`ResourceUri`], [`CacheKey`])
//! - **Describe** freshness ([`FreshnessMetadata`]) and **merge** it ([`MergePreference`])
//! - **Classify** stored entries ([`validate`], [`Validation`])
//! - **Hold** cached values ([`CacheEntry`], [`CachedValue`], [`RawResponse`])
//! - **Declare** application hints ([`CacheHints`], [`DeclaresCaching`])
//!
//! HTTP header semantics live in `cachet-http`; the engine itself lives in
//! `cachet`.

pub mod entry;
pub mod hints;
pub mod key;
pub mod metadata;
pub mod uri;
pub mod validation;
pub mod value;

pub use entry::{CacheEntry, RequestSnapshot, ResponseSnapshot};
pub use hints::{CacheHints, DeclaresCaching};
pub use key::{CacheKey, KeyKind, VaryPair};
pub use metadata::{FreshnessMetadata, MergePreference};
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use uri::{ResourceUri, UriError};
pub use validation::{CacheableStatusCodes, Validation, validate, validate_at};
pub use value::{CachedValue, RawResponse, ResultType, TypeMismatch};

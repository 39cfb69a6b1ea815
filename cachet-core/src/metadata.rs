//! Freshness metadata attached to every cache entry.
//!
//! [`FreshnessMetadata`] is an immutable record of everything the engine
//! knows about the freshness of one cached response. New information never
//! mutates a record in place: [`FreshnessMetadata::merge`] builds a fresh
//! record from two inputs, and the store swaps the whole entry.
//!
//! ## Merging
//!
//! When the same key is written twice (a re-fetch, or a revalidation), the
//! two records are combined field by field:
//!
//! | field | rule |
//! |-------|------|
//! | `date`, `last_modified`, `expiration` | greater or lesser, per [`MergePreference`] |
//! | `status`, `uri` | taken from the incoming record |
//! | `etags` | concatenated, distinct |
//! | `no_store`, `no_cache`, `should_revalidate`, `has_content` | OR |
//! | `vary_headers`, `dependent_uris` | union |

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use http::StatusCode;
use smol_str::SmolStr;

use crate::uri::ResourceUri;

/// Which of two instants a merge keeps.
///
/// No `Default` impl: every call site picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePreference {
    /// Keep the later instant (extends freshness).
    Greater,
    /// Keep the earlier instant.
    Lesser,
}

impl MergePreference {
    fn pick(self, a: DateTime<Utc>, b: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            MergePreference::Greater => a.max(b),
            MergePreference::Lesser => a.min(b),
        }
    }

    fn pick_opt(
        self,
        a: Option<DateTime<Utc>>,
        b: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        match (a, b) {
            (Some(a), Some(b)) => Some(self.pick(a, b)),
            (a, b) => a.or(b),
        }
    }
}

/// Freshness-relevant facts about one cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessMetadata {
    /// Normalized target URI.
    pub uri: ResourceUri,
    /// Status code of the last response.
    pub status: StatusCode,
    /// Response `Date`, or the time the response was observed.
    pub date: DateTime<Utc>,
    /// Response `Last-Modified`.
    pub last_modified: Option<DateTime<Utc>>,
    /// Computed instant after which the entry is no longer fresh.
    pub expiration: Option<DateTime<Utc>>,
    /// Distinct entity tags in arrival order.
    pub etags: Vec<SmolStr>,
    /// Whether the response carried a body.
    pub has_content: bool,
    /// `Cache-Control: no-store`.
    pub no_store: bool,
    /// `Cache-Control: no-cache`.
    pub no_cache: bool,
    /// `Cache-Control: must-revalidate` (or `proxy-revalidate`).
    pub should_revalidate: bool,
    /// Lower-cased header names from the response `Vary`.
    pub vary_headers: BTreeSet<SmolStr>,
    /// Resources this entry depends on. Mutating any of them invalidates it.
    pub dependent_uris: BTreeSet<ResourceUri>,
}

impl FreshnessMetadata {
    /// Creates a record with no freshness information.
    ///
    /// Such a record is not cacheable until an expiration is computed.
    pub fn new(uri: ResourceUri, status: StatusCode, date: DateTime<Utc>) -> Self {
        FreshnessMetadata {
            uri,
            status,
            date,
            last_modified: None,
            expiration: None,
            etags: Vec::new(),
            has_content: false,
            no_store: false,
            no_cache: false,
            should_revalidate: false,
            vary_headers: BTreeSet::new(),
            dependent_uris: BTreeSet::new(),
        }
    }

    /// Returns the entity tags joined as an `If-None-Match` list.
    pub fn etag(&self) -> Option<String> {
        if self.etags.is_empty() {
            None
        } else {
            Some(
                self.etags
                    .iter()
                    .map(SmolStr::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        }
    }

    /// Returns the instant freshness is measured from.
    ///
    /// `Last-Modified` when known, the response date otherwise.
    pub fn baseline(&self) -> DateTime<Utc> {
        self.last_modified.unwrap_or(self.date)
    }

    /// Returns `true` if the expiration lies at or before `now`.
    ///
    /// A record without expiration is never considered expired here; the
    /// validator rejects it as not cacheable instead.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }

    /// Combines this record with newer information into a new record.
    pub fn merge(&self, incoming: &FreshnessMetadata, preference: MergePreference) -> Self {
        let mut etags = self.etags.clone();
        for tag in &incoming.etags {
            if !etags.contains(tag) {
                etags.push(tag.clone());
            }
        }

        FreshnessMetadata {
            uri: incoming.uri.clone(),
            status: incoming.status,
            date: preference.pick(self.date, incoming.date),
            last_modified: preference.pick_opt(self.last_modified, incoming.last_modified),
            expiration: preference.pick_opt(self.expiration, incoming.expiration),
            etags,
            has_content: self.has_content || incoming.has_content,
            no_store: self.no_store || incoming.no_store,
            no_cache: self.no_cache || incoming.no_cache,
            should_revalidate: self.should_revalidate || incoming.should_revalidate,
            vary_headers: self
                .vary_headers
                .union(&incoming.vary_headers)
                .cloned()
                .collect(),
            dependent_uris: self
                .dependent_uris
                .union(&incoming.dependent_uris)
                .cloned()
                .collect(),
        }
    }
}

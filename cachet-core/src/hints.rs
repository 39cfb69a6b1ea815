//! Application-declared cache hints.
//!
//! A fetched value may know better than its headers how long it stays
//! valid, or which other resources it was derived from. [`CacheHints`]
//! carries that knowledge to the engine; [`DeclaresCaching`] lets a result
//! type report it about itself.

use chrono::TimeDelta;

use crate::uri::ResourceUri;

/// Cache hints attached to one fetched result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheHints {
    /// Self-reported cache duration.
    ///
    /// Zero or negative means the result must not be cached, whatever its
    /// headers say.
    pub duration: Option<TimeDelta>,
    /// Resources the result depends on.
    pub depends_on: Vec<ResourceUri>,
    /// The hints came from a value implementing [`DeclaresCaching`].
    ///
    /// Only such values fall back to the configured default duration.
    pub declared: bool,
}

impl CacheHints {
    /// Creates empty hints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the declared duration.
    pub fn duration(mut self, duration: TimeDelta) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Adds a resource the result depends on.
    pub fn depends_on(mut self, uri: ResourceUri) -> Self {
        self.depends_on.push(uri);
        self
    }

    /// Collects the hints a value declares about itself.
    pub fn declared_by<T: DeclaresCaching + ?Sized>(value: &T) -> Self {
        CacheHints {
            duration: value.cache_duration(),
            depends_on: value.depends_on(),
            declared: true,
        }
    }

    /// Returns `true` if the declared duration forbids caching.
    pub fn forbids_caching(&self) -> bool {
        self.duration.is_some_and(|d| d <= TimeDelta::zero())
    }
}

/// Implemented by result types that know how they should be cached.
///
/// Both methods default to "no opinion".
pub trait DeclaresCaching {
    /// How long the value may be cached.
    fn cache_duration(&self) -> Option<TimeDelta> {
        None
    }

    /// Resources whose mutation invalidates this value.
    fn depends_on(&self) -> Vec<ResourceUri> {
        Vec::new()
    }
}

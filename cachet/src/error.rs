//! Engine error type.

use cachet_core::{TypeMismatch, UriError};
use cachet_http::ConfigError;
use thiserror::Error;

use crate::handler::CacheEvent;

/// Boxed error used at the handler and upstream seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error produced by the cache engine.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The configuration was rejected while building the engine.
    #[error("invalid cache configuration: {0}")]
    InvalidConfiguration(String),
    /// A resource URI could not be parsed.
    #[error(transparent)]
    Uri(#[from] UriError),
    /// A cached value was read as the wrong type.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatch),
    /// A lifecycle handler failed and aborted the pipeline run.
    #[error("{event} handler failed: {source}")]
    Handler {
        /// Event whose pipeline was running.
        event: CacheEvent,
        /// Error returned by the handler.
        #[source]
        source: BoxError,
    },
    /// The upstream call failed.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] BoxError),
}

impl From<ConfigError> for CacheError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Uri(err) => CacheError::Uri(err),
            err => CacheError::InvalidConfiguration(err.to_string()),
        }
    }
}

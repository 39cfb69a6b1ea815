//! Configuration errors of the HTTP layer.

use cachet_core::UriError;
use thiserror::Error;

/// Error raised while building HTTP-layer configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A vary-by entry is not a valid header name.
    #[error("invalid vary-by header name `{0}`")]
    InvalidHeaderName(String),
    /// A configured resource URI doesn't parse.
    #[error(transparent)]
    Uri(#[from] UriError),
}

//! Engine configuration.
//!
//! [`CacheConfig`] is plain data: it can be built in code through
//! [`CacheConfig::builder`] or deserialized from any serde format, with
//! durations written in humantime notation (`"30s"`, `"5m"`).
//!
//! ```
//! use std::time::Duration;
//! use cachet::CacheConfig;
//!
//! let config = CacheConfig::builder()
//!     .vary_by("Accept")
//!     .vary_by_for("https://api.example.com/me", "Authorization")
//!     .default_duration(Duration::from_secs(60))
//!     .dependency("https://api.example.com/books/1", "https://api.example.com/authors/7")
//!     .build()
//!     .unwrap();
//! assert!(config.enabled);
//! ```
//!
//! Validation happens once, in [`CacheConfigBuilder::build`] and again when
//! an engine is created from a deserialized config. A bad header name or
//! URI is reported before the first request runs.
//!
//! Per-request settings live in [`RequestOptions`].

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use cachet_core::{CacheableStatusCodes, ResourceUri};
use cachet_http::VaryByResolver;

use crate::error::CacheError;
use crate::handler::HandlerRegistry;

/// Configuration of a [`CacheEngine`](crate::CacheEngine).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. A disabled engine bypasses every request.
    pub enabled: bool,
    /// Request headers folded into every raw HTTP key.
    pub default_vary_by: Vec<String>,
    /// Extra vary-by headers per resource URI.
    pub vary_by_overrides: BTreeMap<String, Vec<String>>,
    /// Freshness lifetime applied before response headers are consulted
    /// (e.g., "30s", "5m").
    #[serde(with = "humantime_serde")]
    pub default_duration: Option<Duration>,
    /// Response status codes that may be cached.
    pub cacheable_status_codes: Vec<u16>,
    /// Resource URI → URIs it depends on.
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// Read a mistyped entry as absent instead of failing.
    pub suppress_type_mismatch: bool,
    /// Log failing handlers and keep running the pipeline.
    pub suppress_handler_errors: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            default_vary_by: Vec::new(),
            vary_by_overrides: BTreeMap::new(),
            default_duration: None,
            cacheable_status_codes: CacheableStatusCodes::default().iter().collect(),
            dependencies: BTreeMap::new(),
            suppress_type_mismatch: false,
            suppress_handler_errors: false,
        }
    }
}

impl CacheConfig {
    /// Creates a new [`CacheConfigBuilder`].
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validates the configuration and resolves it into engine settings.
    pub(crate) fn compile(&self) -> Result<Settings, CacheError> {
        let mut resolver =
            VaryByResolver::builder().default_headers(self.default_vary_by.iter().cloned());
        for (uri, headers) in &self.vary_by_overrides {
            let uri = ResourceUri::parse(uri)?;
            for header in headers {
                resolver = resolver.override_header(uri.clone(), header.clone());
            }
        }

        if let Some(code) = self
            .cacheable_status_codes
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(CacheError::InvalidConfiguration(format!(
                "`{code}` is not an HTTP status code"
            )));
        }

        let default_duration = self
            .default_duration
            .map(TimeDelta::from_std)
            .transpose()
            .map_err(|_| {
                CacheError::InvalidConfiguration("default duration is out of range".to_owned())
            })?;

        let mut dependencies: HashMap<ResourceUri, Vec<ResourceUri>> = HashMap::new();
        for (uri, depends_on) in &self.dependencies {
            let targets = depends_on
                .iter()
                .map(|dep| ResourceUri::parse(dep))
                .collect::<Result<Vec<_>, _>>()?;
            dependencies
                .entry(ResourceUri::parse(uri)?)
                .or_default()
                .extend(targets);
        }

        Ok(Settings {
            enabled: self.enabled,
            resolver: resolver.build()?,
            cacheable: CacheableStatusCodes::new(self.cacheable_status_codes.iter().copied()),
            default_duration,
            dependencies,
            suppress_type_mismatch: self.suppress_type_mismatch,
            suppress_handler_errors: self.suppress_handler_errors,
        })
    }
}

/// Validated form of [`CacheConfig`] used by the engine.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) enabled: bool,
    pub(crate) resolver: VaryByResolver,
    pub(crate) cacheable: CacheableStatusCodes,
    pub(crate) default_duration: Option<TimeDelta>,
    pub(crate) dependencies: HashMap<ResourceUri, Vec<ResourceUri>>,
    pub(crate) suppress_type_mismatch: bool,
    pub(crate) suppress_handler_errors: bool,
}

/// Builder for [`CacheConfig`].
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Turns the engine on or off.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Adds a default vary-by header.
    pub fn vary_by(mut self, header: impl Into<String>) -> Self {
        self.config.default_vary_by.push(header.into());
        self
    }

    /// Adds a vary-by header for one resource.
    pub fn vary_by_for(mut self, uri: impl Into<String>, header: impl Into<String>) -> Self {
        self.config
            .vary_by_overrides
            .entry(uri.into())
            .or_default()
            .push(header.into());
        self
    }

    /// Sets the default freshness lifetime.
    pub fn default_duration(mut self, duration: Duration) -> Self {
        self.config.default_duration = Some(duration);
        self
    }

    /// Replaces the cacheable status codes.
    pub fn cacheable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.config.cacheable_status_codes = codes.into_iter().collect();
        self
    }

    /// Declares that entries for `uri` depend on `depends_on`.
    pub fn dependency(mut self, uri: impl Into<String>, depends_on: impl Into<String>) -> Self {
        self.config
            .dependencies
            .entry(uri.into())
            .or_default()
            .push(depends_on.into());
        self
    }

    /// Reads mistyped entries as absent.
    pub fn suppress_type_mismatch(mut self, suppress: bool) -> Self {
        self.config.suppress_type_mismatch = suppress;
        self
    }

    /// Keeps running the pipeline when a handler fails.
    pub fn suppress_handler_errors(mut self, suppress: bool) -> Self {
        self.config.suppress_handler_errors = suppress;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<CacheConfig, CacheError> {
        self.config.compile()?;
        Ok(self.config)
    }
}

/// Per-request cache options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Explicit freshness lifetime. Wins over every other source when
    /// positive; zero or negative is ignored.
    pub duration: Option<TimeDelta>,
    /// Bypass the cache entirely for this request.
    pub no_cache: bool,
    /// Extra resources the stored entry depends on.
    pub depends_on: Vec<ResourceUri>,
    /// Handlers that run after the global ones within each priority tier.
    pub handlers: Option<HandlerRegistry>,
}

impl RequestOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the explicit duration.
    pub fn duration(mut self, duration: TimeDelta) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Bypasses the cache.
    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Adds a dependency.
    pub fn depends_on(mut self, uri: ResourceUri) -> Self {
        self.depends_on.push(uri);
        self
    }

    /// Sets per-request handlers.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }
}

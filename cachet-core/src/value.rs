//! Cached value types.
//!
//! The engine stores one of two shapes of value:
//!
//! - [`CachedValue::Raw`] - The raw response ([`RawResponse`]), for callers
//!   that want status, headers and bytes
//! - [`CachedValue::Typed`] - An application-level deserialized value, held
//!   behind `Arc<dyn Any>` so one store can hold values of many types
//!
//! Reading a typed value back is a checked downcast. Asking for the wrong
//! type yields a [`TypeMismatch`] naming both types.
//!
//! ```
//! use cachet_core::{CachedValue, ResultType};
//!
//! #[derive(Debug, PartialEq)]
//! struct Book { title: String }
//!
//! let value = CachedValue::typed(Book { title: "Solaris".into() });
//! assert_eq!(value.result_type(), ResultType::of::<Book>());
//! assert_eq!(value.downcast_ref::<Book>().unwrap().title, "Solaris");
//! assert!(value.downcast_ref::<String>().is_err());
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::entry::ResponseSnapshot;

/// A stored value was asked for as a type it isn't.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cached value type mismatch: expected `{expected}`, found `{actual}`")]
pub struct TypeMismatch {
    /// Type the caller asked for.
    pub expected: &'static str,
    /// Type actually stored.
    pub actual: &'static str,
}

/// Runtime identity of a result type.
///
/// Carries a [`TypeId`] for comparisons and the type name for keys and
/// error messages.
#[derive(Clone, Copy, Debug)]
pub struct ResultType {
    id: TypeId,
    name: &'static str,
}

impl ResultType {
    /// Returns the identity of `T`.
    pub fn of<T: Any>() -> Self {
        ResultType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`].
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` for [`RawResponse`], which selects raw-HTTP keys.
    pub fn is_raw(&self) -> bool {
        self.id == TypeId::of::<RawResponse>()
    }
}

impl PartialEq for ResultType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResultType {}

impl std::hash::Hash for ResultType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A fully received response: status, headers and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Creates a raw response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        RawResponse {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Returns the metadata view of this response.
    pub fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot::new(self.status, self.headers.clone(), !self.body.is_empty())
    }
}

/// A value held by a cache entry.
#[derive(Clone)]
pub enum CachedValue {
    /// The raw response.
    Raw(RawResponse),
    /// A deserialized application value.
    Typed {
        /// The shared value.
        value: Arc<dyn Any + Send + Sync>,
        /// Identity of the stored type.
        result_type: ResultType,
    },
}

impl CachedValue {
    /// Wraps an application value.
    ///
    /// A [`RawResponse`] passed here is stored as [`CachedValue::Raw`].
    pub fn typed<T: Any + Send + Sync>(value: T) -> Self {
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);
        match boxed.downcast::<RawResponse>() {
            Ok(raw) => CachedValue::Raw(*raw),
            Err(other) => CachedValue::Typed {
                value: Arc::from(other),
                result_type: ResultType::of::<T>(),
            },
        }
    }

    /// Returns the identity of the stored type.
    pub fn result_type(&self) -> ResultType {
        match self {
            CachedValue::Raw(_) => ResultType::of::<RawResponse>(),
            CachedValue::Typed { result_type, .. } => *result_type,
        }
    }

    /// Returns the value as `&dyn Any` for capability checks.
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        match self {
            CachedValue::Raw(raw) => raw,
            CachedValue::Typed { value, .. } => value.as_ref(),
        }
    }

    /// Borrows the value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Result<&T, TypeMismatch> {
        let any: &dyn Any = self.as_any();
        any.downcast_ref::<T>().ok_or_else(|| TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual: self.result_type().name(),
        })
    }

    /// Returns a shared handle to the value as `T`.
    ///
    /// Typed values share the stored allocation. A raw response is cloned
    /// into a new `Arc`; its body is reference counted, so this is cheap.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Result<Arc<T>, TypeMismatch> {
        let shared: Arc<dyn Any + Send + Sync> = match self {
            CachedValue::Raw(raw) => Arc::new(raw.clone()),
            CachedValue::Typed { value, .. } => Arc::clone(value),
        };
        shared.downcast::<T>().map_err(|_| TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual: self.result_type().name(),
        })
    }

    /// Returns the raw response, if this is one.
    pub fn as_raw(&self) -> Option<&RawResponse> {
        match self {
            CachedValue::Raw(raw) => Some(raw),
            CachedValue::Typed { .. } => None,
        }
    }
}

impl fmt::Debug for CachedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachedValue::Raw(raw) => f.debug_tuple("Raw").field(raw).finish(),
            CachedValue::Typed { result_type, .. } => f
                .debug_struct("Typed")
                .field("result_type", &result_type.name())
                .finish_non_exhaustive(),
        }
    }
}

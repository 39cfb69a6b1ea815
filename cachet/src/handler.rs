//! Lifecycle handlers.
//!
//! Handlers observe the engine at five points of a request's life:
//!
//! | Event | Fired when |
//! |-------|------------|
//! | [`CacheEvent::Miss`] | no servable entry was found |
//! | [`CacheEvent::Hit`] | an entry is served from the cache |
//! | [`CacheEvent::Store`] | an entry was written |
//! | [`CacheEvent::Expiring`] | an entry is about to be removed |
//! | [`CacheEvent::Expired`] | an entry was removed |
//!
//! Each registration carries a [`Priority`] tier and a [`TypeConstraint`]
//! on the result type of the request. For one event the pipeline runs every
//! matching handler strictly one after the other: by tier, then in
//! registration order. Handlers registered on the engine run before
//! per-request handlers of the same tier.
//!
//! There is a single [`Handler`] trait. Synchronous closures are adapted
//! into it with [`HandlerRegistryBuilder::on_fn`], so sync and async
//! handlers interleave in one order.
//!
//! ```
//! use cachet::{CacheEvent, HandlerRegistry, Priority, TypeConstraint};
//!
//! let handlers = HandlerRegistry::builder()
//!     .on_fn(CacheEvent::Hit, Priority::First, TypeConstraint::Any, |cx| {
//!         cx.items_mut().insert("served-from-cache", true);
//!         Ok(())
//!     })
//!     .build();
//! assert_eq!(handlers.len(), 1);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use cachet_core::{CacheKey, CachedValue, RequestSnapshot, ResponseSnapshot, ResultType};

use crate::error::BoxError;
use crate::items::Items;

/// Lifecycle point a handler is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    /// No servable entry was found.
    Miss,
    /// An entry is served.
    Hit,
    /// An entry was written.
    Store,
    /// An entry is about to be removed.
    Expiring,
    /// An entry was removed.
    Expired,
}

impl CacheEvent {
    /// Every event, in lifecycle order.
    pub const ALL: [CacheEvent; 5] = [
        CacheEvent::Miss,
        CacheEvent::Hit,
        CacheEvent::Store,
        CacheEvent::Expiring,
        CacheEvent::Expired,
    ];

    /// Returns the event name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheEvent::Miss => "miss",
            CacheEvent::Hit => "hit",
            CacheEvent::Store => "store",
            CacheEvent::Expiring => "expiring",
            CacheEvent::Expired => "expired",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering tier of a handler. Lower tiers run first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Runs before everything else.
    First,
    /// Runs before default handlers.
    High,
    /// The default tier.
    #[default]
    Default,
    /// Runs after default handlers.
    Low,
    /// Runs after everything else.
    Last,
}

/// Result types a handler accepts.
#[derive(Clone)]
pub enum TypeConstraint {
    /// Every result type.
    Any,
    /// Exactly one type.
    Exact(ResultType),
    /// A caller-declared family of types, recognized by a predicate.
    Family {
        /// Name used in logs.
        name: &'static str,
        /// Returns `true` for members of the family.
        accepts: Arc<dyn Fn(ResultType) -> bool + Send + Sync>,
    },
}

impl TypeConstraint {
    /// Accepts exactly `T`.
    pub fn exact<T: Any>() -> Self {
        TypeConstraint::Exact(ResultType::of::<T>())
    }

    /// Accepts every type for which `accepts` returns `true`.
    pub fn family<F>(name: &'static str, accepts: F) -> Self
    where
        F: Fn(ResultType) -> bool + Send + Sync + 'static,
    {
        TypeConstraint::Family {
            name,
            accepts: Arc::new(accepts),
        }
    }

    /// Accepts any of the listed types.
    pub fn one_of(name: &'static str, types: impl IntoIterator<Item = ResultType>) -> Self {
        let types: Vec<ResultType> = types.into_iter().collect();
        Self::family(name, move |ty| types.contains(&ty))
    }

    /// Returns `true` if a handler with this constraint sees `result_type`.
    pub fn accepts(&self, result_type: ResultType) -> bool {
        match self {
            TypeConstraint::Any => true,
            TypeConstraint::Exact(ty) => *ty == result_type,
            TypeConstraint::Family { accepts, .. } => accepts(result_type),
        }
    }
}

impl fmt::Debug for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeConstraint::Any => f.write_str("Any"),
            TypeConstraint::Exact(ty) => f.debug_tuple("Exact").field(&ty.name()).finish(),
            TypeConstraint::Family { name, .. } => f.debug_tuple("Family").field(name).finish(),
        }
    }
}

/// What a handler sees of the event it observes.
pub struct EventContext<'a> {
    event: CacheEvent,
    key: &'a CacheKey,
    result_type: ResultType,
    request: &'a RequestSnapshot,
    response: Option<&'a ResponseSnapshot>,
    value: Option<&'a CachedValue>,
    items: &'a mut Items,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(
        event: CacheEvent,
        key: &'a CacheKey,
        result_type: ResultType,
        request: &'a RequestSnapshot,
        items: &'a mut Items,
    ) -> Self {
        EventContext {
            event,
            key,
            result_type,
            request,
            response: None,
            value: None,
            items,
        }
    }

    pub(crate) fn with_response(mut self, response: &'a ResponseSnapshot) -> Self {
        self.response = Some(response);
        self
    }

    pub(crate) fn with_value(mut self, value: &'a CachedValue) -> Self {
        self.value = Some(value);
        self
    }

    /// The event being observed.
    pub fn event(&self) -> CacheEvent {
        self.event
    }

    /// The cache key of the entry.
    pub fn key(&self) -> &CacheKey {
        self.key
    }

    /// The concrete result type of the request.
    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    /// The request the event belongs to.
    pub fn request(&self) -> &RequestSnapshot {
        self.request
    }

    /// The response involved, if any.
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        self.response
    }

    /// The cached value involved, if any.
    pub fn value(&self) -> Option<&CachedValue> {
        self.value
    }

    /// The value as `T`, if there is one of that type.
    pub fn value_as<T: Any>(&self) -> Option<&T> {
        self.value?.downcast_ref::<T>().ok()
    }

    /// Request-scoped items.
    pub fn items(&self) -> &Items {
        &*self.items
    }

    /// Request-scoped items, for writing.
    pub fn items_mut(&mut self) -> &mut Items {
        &mut *self.items
    }
}

impl fmt::Debug for EventContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("event", &self.event)
            .field("key", &self.key)
            .field("result_type", &self.result_type.name())
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

/// A lifecycle handler.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Observes one event. An error aborts the rest of the pipeline run
    /// unless handler errors are suppressed.
    async fn handle(&self, cx: &mut EventContext<'_>) -> Result<(), BoxError>;
}

/// Adapts a synchronous closure into a [`Handler`].
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(&mut EventContext<'_>) -> Result<(), BoxError> + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        FnHandler(f)
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut EventContext<'_>) -> Result<(), BoxError> + Send + Sync,
{
    async fn handle(&self, cx: &mut EventContext<'_>) -> Result<(), BoxError> {
        (self.0)(cx)
    }
}

/// One registered handler.
#[derive(Clone)]
pub struct Registration {
    priority: Priority,
    constraint: TypeConstraint,
    handler: Arc<dyn Handler>,
    is_async: bool,
    sequence: usize,
}

impl Registration {
    /// The ordering tier.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The accepted result types.
    pub fn constraint(&self) -> &TypeConstraint {
        &self.constraint
    }

    /// Whether the handler was registered as asynchronous.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub(crate) fn sequence(&self) -> usize {
        self.sequence
    }

    pub(crate) fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("priority", &self.priority)
            .field("constraint", &self.constraint)
            .field("is_async", &self.is_async)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Immutable set of handlers, grouped by event.
///
/// Cloning is cheap and clones share the registrations.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    by_event: Arc<[Vec<Registration>; 5]>,
}

impl HandlerRegistry {
    /// Creates a new [`HandlerRegistryBuilder`].
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Registrations for `event`, in run order.
    pub fn for_event(&self, event: CacheEvent) -> &[Registration] {
        &self.by_event[event.index()]
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.by_event.iter().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in CacheEvent::ALL {
            map.entry(&event, &self.for_event(event).len());
        }
        map.finish()
    }
}

/// Builder for [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    by_event: [Vec<Registration>; 5],
    sequence: usize,
}

impl HandlerRegistryBuilder {
    /// Registers an asynchronous handler.
    pub fn on<H>(
        self,
        event: CacheEvent,
        priority: Priority,
        constraint: TypeConstraint,
        handler: H,
    ) -> Self
    where
        H: Handler + 'static,
    {
        self.register(event, priority, constraint, Arc::new(handler), true)
    }

    /// Registers a synchronous closure.
    pub fn on_fn<F>(
        self,
        event: CacheEvent,
        priority: Priority,
        constraint: TypeConstraint,
        f: F,
    ) -> Self
    where
        F: Fn(&mut EventContext<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.register(event, priority, constraint, Arc::new(FnHandler::new(f)), false)
    }

    fn register(
        mut self,
        event: CacheEvent,
        priority: Priority,
        constraint: TypeConstraint,
        handler: Arc<dyn Handler>,
        is_async: bool,
    ) -> Self {
        self.by_event[event.index()].push(Registration {
            priority,
            constraint,
            handler,
            is_async,
            sequence: self.sequence,
        });
        self.sequence += 1;
        self
    }

    /// Freezes the registrations.
    pub fn build(mut self) -> HandlerRegistry {
        for registrations in &mut self.by_event {
            registrations.sort_by_key(|r| (r.priority, r.sequence));
        }
        HandlerRegistry {
            by_event: Arc::new(self.by_event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Book;
    struct Author;

    fn noop(_: &mut EventContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }

    #[test]
    fn test_constraints() {
        let book = ResultType::of::<Book>();
        let author = ResultType::of::<Author>();
        assert!(TypeConstraint::Any.accepts(book));
        assert!(TypeConstraint::exact::<Book>().accepts(book));
        assert!(!TypeConstraint::exact::<Book>().accepts(author));

        let library = TypeConstraint::one_of("library", [book, author]);
        assert!(library.accepts(author));
        assert!(!library.accepts(ResultType::of::<String>()));
    }

    #[test]
    fn test_registrations_sorted_by_tier_then_order() {
        let registry = HandlerRegistry::builder()
            .on_fn(CacheEvent::Hit, Priority::Last, TypeConstraint::Any, noop)
            .on_fn(CacheEvent::Hit, Priority::Default, TypeConstraint::Any, noop)
            .on_fn(CacheEvent::Miss, Priority::First, TypeConstraint::Any, noop)
            .on_fn(CacheEvent::Hit, Priority::First, TypeConstraint::Any, noop)
            .on_fn(CacheEvent::Hit, Priority::Default, TypeConstraint::Any, noop)
            .build();

        let order: Vec<_> = registry
            .for_event(CacheEvent::Hit)
            .iter()
            .map(|r| (r.priority(), r.sequence))
            .collect();
        assert_eq!(
            order,
            vec![
                (Priority::First, 3),
                (Priority::Default, 1),
                (Priority::Default, 4),
                (Priority::Last, 0),
            ]
        );
        assert_eq!(registry.len(), 5);
        assert!(registry.for_event(CacheEvent::Store).is_empty());
    }
}

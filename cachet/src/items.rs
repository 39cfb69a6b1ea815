//! Request-scoped item bag shared between handlers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// String-keyed values shared by the handlers of one logical request.
///
/// A handler's writes are visible to every handler that runs after it, in
/// the same event and in later events of the same request. Each request
/// gets its own bag.
#[derive(Default)]
pub struct Items {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Items {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Borrows the value under `key` if it is a `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Mutably borrows the value under `key` if it is a `T`.
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.downcast_mut::<T>()
    }

    /// Removes and returns the value under `key` if it is a `T`.
    ///
    /// A value of another type is left in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key)?.is::<T>() {
            return None;
        }
        let boxed = self.values.remove(key)?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    /// Returns `true` if anything is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Items {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

use alloc::{string::String, sync::Arc, vec::Vec};
use core::fmt;

use indexmap::IndexMap;
use spin::RwLock;

use super::Value;

#[derive(Default)]
struct Properties {
    enumerable: IndexMap<String, Value>,
    hidden: IndexMap<String, Value>,
}

/// A shared, mutable key/value container.
///
/// Keys keep their insertion order. Properties defined with
/// [`Object::define_hidden`] are readable through [`Object::get`] but are not
/// enumerable, so [`Object::entries`], [`Object::keys`] and the serializer
/// never see them.
#[derive(Clone, Default)]
pub struct Object(Arc<RwLock<Properties>>);

impl Object {
    /// Creates an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Object::insert`].
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets an enumerable property, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let mut properties = self.0.write();
        properties.hidden.shift_remove(&key);
        properties.enumerable.insert(key, value.into())
    }

    /// Sets a non-enumerable property.
    pub fn define_hidden(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let mut properties = self.0.write();
        properties.enumerable.shift_remove(&key);
        properties.hidden.insert(key, value.into());
    }

    /// Reads a property, enumerable or not.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let properties = self.0.read();
        properties
            .enumerable
            .get(key)
            .or_else(|| properties.hidden.get(key))
            .cloned()
    }

    /// Returns `true` if the property exists, enumerable or not.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        let properties = self.0.read();
        properties.enumerable.contains_key(key) || properties.hidden.contains_key(key)
    }

    /// Removes a property, preserving the order of the remaining keys.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut properties = self.0.write();
        properties
            .enumerable
            .shift_remove(key)
            .or_else(|| properties.hidden.shift_remove(key))
    }

    /// Inserts every pair, overwriting existing keys.
    pub fn extend<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut properties = self.0.write();
        for (key, value) in entries {
            let key = key.into();
            properties.hidden.shift_remove(&key);
            properties.enumerable.insert(key, value.into());
        }
    }

    /// A snapshot of the enumerable properties in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .read()
            .enumerable
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// The enumerable keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.0.read().enumerable.keys().cloned().collect()
    }

    /// The number of enumerable properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().enumerable.len()
    }

    /// Returns `true` when there are no enumerable properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().enumerable.is_empty()
    }

    /// Returns `true` if both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).addr()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        object.extend(iter);
        object
    }
}

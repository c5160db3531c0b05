use alloc::{sync::Arc, vec::Vec};
use core::fmt;

use spin::RwLock;

use super::Value;

/// A shared, mutable, ordered list of values.
///
/// Cloning an [`Array`] clones the handle. Every clone observes the same
/// elements, which is what allows arrays to contain themselves.
#[derive(Clone, Default)]
pub struct Array(Arc<RwLock<Vec<Value>>>);

impl Array {
    /// Creates an empty array.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    pub fn push(&self, value: impl Into<Value>) {
        self.0.write().push(value.into());
    }

    /// Replaces the value at `index`, padding with [`Value::Undefined`] when
    /// `index` is past the end.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let mut items = self.0.write();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value.into();
    }

    /// Returns a clone of the value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// The number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns `true` when the array holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// A snapshot of the elements.
    ///
    /// The snapshot is taken under the lock and returned without it, so the
    /// caller may walk it while other handles mutate the array.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Returns `true` if both handles point at the same array.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).addr()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

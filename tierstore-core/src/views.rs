//! Key and element collection views over a `Store`.
//!
//! Both views are thin, weakly-consistent windows onto the same underlying
//! segments, and neither materializes its own copy of the data. `clear`/
//! `size` delegate straight through to the `Store` on both views, and
//! `KeyView::contains`/`remove` do too — a key is always unique and
//! comparable by definition. `ElementView` has no such guarantee over
//! elements, so `contains`, `remove`, `add`/`add_all`, and its set-algebra
//! operations all fail with `ErrorKind::Unsupported` instead of guessing at
//! a linear-scan semantics nobody asked for; `KeyView::add`/`add_all` fail
//! for the complementary reason — there's no element to pair a bare key
//! with.

use std::hash::Hash;
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};
use crate::factory::SubstituteFactory;
use crate::store::Store;

/// A weakly-consistent view over a store's keys.
pub struct KeyView<K, E, F: SubstituteFactory<Key = K, Element = E>> {
    store: Arc<Store<K, E, F>>,
}

impl<K, E, F> KeyView<K, E, F>
where
    K: Hash + Eq + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: SubstituteFactory<Key = K, Element = E> + 'static,
{
    pub(crate) fn new(store: Arc<Store<K, E, F>>) -> Self {
        KeyView { store }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.store.contains_key(key)
    }

    pub fn remove(&self, key: &K) -> Result<bool> {
        Ok(self.store.remove(key)?.is_some())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()
    }

    pub fn size(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Always fails: a key view has no element to pair a freshly-added key
    /// with, and the store has no notion of a valueless entry.
    pub fn add(&self, _key: K) -> Result<bool> {
        Err(Error::from((
            ErrorKind::Unsupported,
            "KeyView does not support add; insert through Store::put instead",
        )))
    }

    pub fn add_all<I: IntoIterator<Item = K>>(&self, _keys: I) -> Result<bool> {
        Err(Error::from((
            ErrorKind::Unsupported,
            "KeyView does not support add_all; insert through Store::put instead",
        )))
    }

    /// Weakly-consistent snapshot of every live key, in the same
    /// descending-segment-index order as `Store::for_each`.
    pub fn snapshot(&self) -> Vec<Arc<K>> {
        let mut keys = Vec::with_capacity(self.store.len());
        self.store.for_each_key_arc(|key| keys.push(key));
        keys
    }
}

/// A weakly-consistent view over a store's elements.
pub struct ElementView<K, E, F: SubstituteFactory<Key = K, Element = E>> {
    store: Arc<Store<K, E, F>>,
}

impl<K, E, F> ElementView<K, E, F>
where
    K: Hash + Eq + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: SubstituteFactory<Key = K, Element = E> + 'static,
{
    pub(crate) fn new(store: Arc<Store<K, E, F>>) -> Self {
        ElementView { store }
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()
    }

    pub fn size(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Weakly-consistent snapshot of every live element.
    pub fn snapshot(&self) -> Vec<E> {
        let mut elements = Vec::with_capacity(self.store.len());
        self.store.for_each(|_key, element| elements.push(element));
        elements
    }

    /// Always fails: elements aren't required to be unique or comparable,
    /// so membership has no defined meaning over this collection.
    pub fn contains(&self, _element: &E) -> Result<bool> {
        Err(Error::from((
            ErrorKind::Unsupported,
            "ElementView does not support contains",
        )))
    }

    /// Always fails: removing by value has the same no-defined-meaning
    /// problem as `contains`, and would need a `Store::remove_if` pass over
    /// undecoded keys to even attempt.
    pub fn remove(&self, _element: &E) -> Result<bool> {
        Err(Error::from((
            ErrorKind::Unsupported,
            "ElementView does not support remove",
        )))
    }

    /// Always fails: an element has no key to insert under.
    pub fn add(&self, _element: E) -> Result<bool> {
        Err(Error::from((
            ErrorKind::Unsupported,
            "ElementView does not support add; insert through Store::put instead",
        )))
    }

    pub fn add_all<I: IntoIterator<Item = E>>(&self, _elements: I) -> Result<bool> {
        Err(Error::from((
            ErrorKind::Unsupported,
            "ElementView does not support add_all; insert through Store::put instead",
        )))
    }

    /// Set algebra (`retainAll`/`removeAll`) over an element collection has
    /// no defined meaning here: elements aren't required to be unique or
    /// comparable for membership the way keys are, so these always fail
    /// rather than silently doing a linear scan a caller didn't ask for.
    pub fn retain_all(&self, _keep: &[E]) -> Result<bool> {
        Err(Error::from((
            ErrorKind::Unsupported,
            "ElementView does not support set-algebra operations",
        )))
    }

    pub fn remove_all(&self, _drop: &[E]) -> Result<bool> {
        Err(Error::from((
            ErrorKind::Unsupported,
            "ElementView does not support set-algebra operations",
        )))
    }
}

//! SubstituteFactory: encodes elements into substitutes, decodes them back,
//! and reclaims resources when a substitute is displaced.

use std::any::Any;
use std::sync::Arc;

/// Encodes a freshly-installed element into a substitute, decodes a
/// substitute back into the logical element on read, and frees a displaced
/// substitute's resources exactly once. All operations except `free` are
/// side-effect-free from the store's point of view; the factory may read or
/// write external storage (e.g. disk) behind `decode`/`retrieve`/`create`,
/// and those calls are treated as possibly expensive but non-failing by the
/// core — a factory that can fail should surface that as a panic or via its
/// own out-of-band channel, since the core has no factory-error channel.
pub trait SubstituteFactory: Send + Sync {
    type Key;
    type Element;
    type Substitute: Send + Sync + 'static;

    /// Encodes `element` into a fresh substitute.
    fn create(&self, key: &Self::Key, element: Self::Element) -> Self::Substitute;

    /// Materializes the logical element from a substitute without recording
    /// a hit (used by non-retrieval reads such as iteration).
    fn decode(&self, key: &Self::Key, substitute: &Self::Substitute) -> Self::Element;

    /// Materializes the logical element from a substitute, recording a hit
    /// against the substitute's tier. Defaults to `decode`.
    fn retrieve(&self, key: &Self::Key, substitute: &Self::Substitute) -> Self::Element {
        self.decode(key, substitute)
    }

    /// Reclaims resources held by a substitute that has just been displaced
    /// (replaced, removed, evicted, or lost a losing `fault`). Called
    /// exactly once per installed substitute.
    fn free(&self, substitute: Self::Substitute) {
        drop(substitute);
    }

    /// Returns `true` if this factory produced `substitute`. Used to
    /// distinguish heterogeneous substitutes when more than one factory
    /// shares a store (not exercised by the single-factory `Segment`/`Store`
    /// in this crate, but part of the contract external callers may rely on).
    fn created(&self, _substitute: &Self::Substitute) -> bool {
        true
    }

    /// Lifecycle hook invoked once the factory is attached to a store.
    fn bind(&self, _store: &dyn Any) {}

    /// Lifecycle hook invoked once the factory is detached from a store
    /// (on `Store::dispose`). Called at most once, even if `dispose` is
    /// called more than once.
    fn unbind(&self, _store: &dyn Any) {}
}

/// The distinguished identity factory: substitutes it produces *are* the
/// elements themselves, reference-counted. Used for heap-only
/// configurations where no disk or other overflow tier exists.
#[derive(Debug, Default)]
pub struct IdentityFactory<E> {
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E> IdentityFactory<E> {
    pub fn new() -> Self {
        IdentityFactory {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<K, E> SubstituteFactory for IdentityFactory<E>
where
    K: Send + Sync,
    E: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Element = E;
    type Substitute = Arc<E>;

    fn create(&self, _key: &K, element: E) -> Arc<E> {
        Arc::new(element)
    }

    fn decode(&self, _key: &K, substitute: &Arc<E>) -> E {
        (**substitute).clone()
    }

    fn created(&self, _substitute: &Arc<E>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_factory_round_trips() {
        let factory: IdentityFactory<String> = IdentityFactory::new();
        let key = "k";
        let substitute = SubstituteFactory::create(&factory, &key, "v".to_string());
        assert_eq!(*substitute, "v".to_string());
        assert_eq!(factory.decode(&key, &substitute), "v".to_string());
        assert!(factory.created(&substitute));
    }
}

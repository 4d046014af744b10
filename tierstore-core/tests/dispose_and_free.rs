//! Invariant 5: repeated `dispose()` calls `factory.unbind` at most once.
//! Invariant 6: every installed substitute is passed to `factory.free`
//! exactly once by the time its key is gone.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tierstore_core::{SubstituteFactory, Store};

/// Counts `free`/`unbind` calls. Cheap to clone: every clone shares the same
/// counters, so a handle kept outside the `Store` can observe them.
#[derive(Clone, Default)]
struct CountingFactory {
    frees: Arc<AtomicUsize>,
    unbinds: Arc<AtomicUsize>,
}

impl SubstituteFactory for CountingFactory {
    type Key = &'static str;
    type Element = i32;
    type Substitute = i32;

    fn create(&self, _key: &&'static str, element: i32) -> i32 {
        element
    }

    fn decode(&self, _key: &&'static str, substitute: &i32) -> i32 {
        *substitute
    }

    fn free(&self, _substitute: i32) {
        self.frees.fetch_add(1, Ordering::SeqCst);
    }

    fn unbind(&self, _store: &dyn Any) {
        self.unbinds.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn dispose_is_idempotent() {
    let factory = CountingFactory::default();
    let unbinds = factory.unbinds.clone();
    let store: Arc<Store<&'static str, i32, CountingFactory>> = Store::with_defaults(factory);

    store.dispose();
    store.dispose();
    store.dispose();

    assert_eq!(unbinds.load(Ordering::SeqCst), 1);
}

#[test]
fn every_displaced_substitute_is_freed_exactly_once() {
    let factory = CountingFactory::default();
    let frees = factory.frees.clone();
    let store: Arc<Store<&'static str, i32, CountingFactory>> = Store::with_defaults(factory);

    store.put("a", 1).unwrap();
    store.put("a", 2).unwrap(); // displaces 1
    store.put("a", 3).unwrap(); // displaces 2
    store.remove(&"a").unwrap(); // displaces 3

    assert!(!store.contains_key(&"a"));
    assert_eq!(frees.load(Ordering::SeqCst), 3);
}

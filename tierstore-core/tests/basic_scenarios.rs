//! Literal end-to-end scenarios against a heap-only store: empty-store put,
//! update-in-place, and remove, each checked against the listener bus too.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tierstore_core::{IdentityFactory, Listener, Store};

#[derive(Default)]
struct CountingListener {
    updates: AtomicUsize,
    removes: AtomicUsize,
    last_update: std::sync::Mutex<Option<(i32, i32)>>,
}

impl Listener<&'static str, i32, Arc<i32>> for CountingListener {
    fn on_update(&self, _key: &&'static str, displaced: &Arc<i32>, new_element: &i32) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.last_update.lock().unwrap() = Some((**displaced, *new_element));
    }

    fn on_remove(&self, _key: &&'static str, _displaced: &Arc<i32>, _removed_element: &i32) {
        self.removes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn s1_put_into_empty_store_is_observable() {
    let store: Arc<Store<&'static str, i32, IdentityFactory<i32>>> =
        Store::with_defaults(IdentityFactory::default());

    let previous = store.put("a", 1).unwrap();
    assert_eq!(previous, None);
    assert_eq!(store.get(&"a"), Some(1));
    assert_eq!(store.len(), 1);
}

#[test]
fn s2_put_over_existing_key_updates_and_notifies() {
    let store: Arc<Store<&'static str, i32, IdentityFactory<i32>>> =
        Store::with_defaults(IdentityFactory::default());
    let listener = Arc::new(CountingListener::default());
    store.add_listener(listener.clone());

    store.put("a", 1).unwrap();
    let previous = store.put("a", 2).unwrap();

    assert_eq!(previous, Some(1));
    assert_eq!(store.get(&"a"), Some(2));
    assert_eq!(listener.updates.load(Ordering::SeqCst), 1);
    assert_eq!(*listener.last_update.lock().unwrap(), Some((1, 2)));
}

#[test]
fn s3_remove_clears_key_and_notifies() {
    let store: Arc<Store<&'static str, i32, IdentityFactory<i32>>> =
        Store::with_defaults(IdentityFactory::default());
    let listener = Arc::new(CountingListener::default());
    store.add_listener(listener.clone());

    store.put("a", 1).unwrap();
    let removed = store.remove(&"a").unwrap();

    assert_eq!(removed, Some(1));
    assert_eq!(store.get(&"a"), None);
    assert_eq!(store.len(), 0);
    assert_eq!(listener.removes.load(Ordering::SeqCst), 1);
}

#[test]
fn key_uniqueness_holds_across_repeated_puts() {
    let store: Arc<Store<&'static str, i32, IdentityFactory<i32>>> =
        Store::with_defaults(IdentityFactory::default());

    for value in 0..50 {
        store.put("k", value).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains_key(&"k"));
    }
    assert_eq!(store.get(&"k"), Some(49));

    store.remove(&"k").unwrap();
    assert!(!store.contains_key(&"k"));
    assert_eq!(store.len(), 0);
}

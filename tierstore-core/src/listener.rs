//! Synchronous, ordered listener notification for committed mutations.

use std::sync::{Arc, Mutex};

/// Notified by the `Store` after a segment mutation commits. Every method
/// has a no-op default so implementers only override what they care about.
///
/// Listeners must not reenter the store on the same key from inside a
/// callback while the segment's write lock that triggered the callback is
/// still held elsewhere — the core does not detect this and a listener that
/// does so may deadlock.
pub trait Listener<K, E, S>: Send + Sync {
    /// Fired on replace, or `put` of an already-present key.
    fn on_update(&self, _key: &K, _displaced: &S, _new_element: &E) {}
    /// Fired on `remove`.
    fn on_remove(&self, _key: &K, _displaced: &S, _removed_element: &E) {}
    /// Fired on `evict`.
    fn on_evict(&self, _key: &K, _evicted_element: &E) {}
    /// Fired on a successful `fault`.
    fn on_fault(&self, _key: &K, _expect: &S, _fault: &S) {}
}

/// Ordered registration list of listeners, dispatched in registration order.
/// Registration/deregistration take a short-lived lock; dispatch clones the
/// current listener list out from under the lock and calls out unlocked, so
/// a listener cannot block another thread's registration by running long,
/// and cannot deadlock the bus by registering from inside a callback.
pub struct ListenerBus<K, E, S> {
    listeners: Mutex<Vec<Arc<dyn Listener<K, E, S>>>>,
}

impl<K, E, S> ListenerBus<K, E, S> {
    pub fn new() -> Self {
        ListenerBus {
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, listener: Arc<dyn Listener<K, E, S>>) {
        self.listeners.lock().unwrap().push(listener);
    }

    fn snapshot(&self) -> Vec<Arc<dyn Listener<K, E, S>>> {
        self.listeners.lock().unwrap().clone()
    }

    pub fn notify_update(&self, key: &K, displaced: &S, new_element: &E) {
        for listener in self.snapshot() {
            listener.on_update(key, displaced, new_element);
        }
    }

    pub fn notify_remove(&self, key: &K, displaced: &S, removed_element: &E) {
        for listener in self.snapshot() {
            listener.on_remove(key, displaced, removed_element);
        }
    }

    pub fn notify_evict(&self, key: &K, evicted_element: &E) {
        for listener in self.snapshot() {
            listener.on_evict(key, evicted_element);
        }
    }

    pub fn notify_fault(&self, key: &K, expect: &S, fault: &S) {
        for listener in self.snapshot() {
            listener.on_fault(key, expect, fault);
        }
    }
}

impl<K, E, S> Default for ListenerBus<K, E, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        updates: AtomicUsize,
        removes: AtomicUsize,
        faults: AtomicUsize,
    }

    impl Listener<&'static str, i32, i32> for CountingListener {
        fn on_update(&self, _key: &&'static str, _displaced: &i32, _new_element: &i32) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
        fn on_remove(&self, _key: &&'static str, _displaced: &i32, _removed_element: &i32) {
            self.removes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_fault(&self, _key: &&'static str, _expect: &i32, _fault: &i32) {
            self.faults.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dispatches_to_all_registered_listeners_in_order() {
        let bus: ListenerBus<&'static str, i32, i32> = ListenerBus::new();
        let listener = Arc::new(CountingListener {
            updates: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            faults: AtomicUsize::new(0),
        });
        bus.add(listener.clone());

        bus.notify_update(&"a", &1, &2);
        bus.notify_remove(&"a", &2, &2);
        bus.notify_fault(&"a", &1, &3);

        assert_eq!(listener.updates.load(Ordering::SeqCst), 1);
        assert_eq!(listener.removes.load(Ordering::SeqCst), 1);
        assert_eq!(listener.faults.load(Ordering::SeqCst), 1);
    }
}

//! Invariant 4 / S5: of two concurrent `fault(k, expect, _)` calls racing
//! against the same installed substitute, exactly one wins; the loser's
//! candidate is freed and never observed by listeners.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tierstore_core::{IdentityFactory, Listener, Store};

#[derive(Default)]
struct FaultCounter {
    faults: AtomicUsize,
}

impl Listener<&'static str, i32, Arc<i32>> for FaultCounter {
    fn on_fault(&self, _key: &&'static str, _expect: &Arc<i32>, _fault: &Arc<i32>) {
        self.faults.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn exactly_one_concurrent_fault_wins() {
    let store: Arc<Store<&'static str, i32, IdentityFactory<i32>>> =
        Store::with_defaults(IdentityFactory::default());
    let listener = Arc::new(FaultCounter::default());
    store.add_listener(listener.clone());

    store.put("k", 1).unwrap();
    let expect = store
        .random_sample_any(1)
        .into_iter()
        .next()
        .expect("key present after put");

    let barrier = Arc::new(Barrier::new(2));

    let store_a = store.clone();
    let expect_a = expect.clone();
    let barrier_a = barrier.clone();
    let a = thread::spawn(move || {
        barrier_a.wait();
        store_a.fault(&"k", &expect_a, Arc::new(100)).unwrap()
    });

    let store_b = store.clone();
    let expect_b = expect.clone();
    let barrier_b = barrier.clone();
    let b = thread::spawn(move || {
        barrier_b.wait();
        store_b.fault(&"k", &expect_b, Arc::new(200)).unwrap()
    });

    let result_a = a.join().unwrap();
    let result_b = b.join().unwrap();

    assert_ne!(result_a, result_b, "exactly one fault must win");
    assert_eq!(listener.faults.load(Ordering::SeqCst), 1);

    let winner_value = store.get(&"k").unwrap();
    assert!(winner_value == 100 || winner_value == 200);
}

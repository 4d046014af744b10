//! Invariant 3: `size()` is exact once all mutation has quiesced.
//! S6 / invariant 8: sampling across a 10,000-key, 64-segment store returns
//! at least the requested count and doesn't always start from the same
//! segment.

use std::collections::HashSet;
use std::sync::Arc;

use tierstore_core::{IdentityFactory, Store};

#[test]
fn size_is_exact_at_quiescence() {
    let store: Arc<Store<usize, usize, IdentityFactory<usize>>> =
        Store::with_defaults(IdentityFactory::default());

    for i in 0..5_000 {
        store.put(i, i).unwrap();
    }
    for i in 0..1_000 {
        store.remove(&i).unwrap();
    }

    assert_eq!(store.len(), 4_000);
    assert!(!store.is_empty());

    for i in 1_000..5_000 {
        store.remove(&i).unwrap();
    }
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
}

#[test]
fn sample_returns_requested_count_from_large_store() {
    let store: Arc<Store<usize, usize, IdentityFactory<usize>>> =
        Store::new(64, 64 * 16, 0.75, IdentityFactory::default());

    for i in 0..10_000 {
        store.put(i, i).unwrap();
    }
    assert_eq!(store.len(), 10_000);

    let sample = store.random_sample_any(100);
    assert!(sample.len() >= 100);
}

#[test]
fn sample_start_segment_is_not_always_the_same() {
    let store: Arc<Store<usize, usize, IdentityFactory<usize>>> =
        Store::new(64, 64 * 16, 0.75, IdentityFactory::default());
    for i in 0..10_000 {
        store.put(i, i).unwrap();
    }

    // A single-element sample's value is determined by whichever segment
    // the scan started from; collecting many first-samples should surface
    // more than one distinct value if the starting segment varies.
    let mut first_values = HashSet::new();
    for _ in 0..200 {
        if let Some(value) = store.random_sample_any(1).into_iter().next() {
            first_values.insert(**value);
        }
    }
    assert!(
        first_values.len() > 1,
        "expected sampling to vary its starting point across calls"
    );
}

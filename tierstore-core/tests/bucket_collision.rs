//! S4: two keys that land in the same segment and the same bucket still
//! chain correctly — removing one leaves the other fully reachable.

use std::sync::Arc;

use tierstore_core::hashing::{bucket_index, raw_hash, spread};
use tierstore_core::{IdentityFactory, Store};

const TABLE_LEN: usize = 16;

/// Finds two distinct `usize` keys whose spread hash maps to the same
/// bucket in a table of `TABLE_LEN` slots. `raw_hash`/`spread` are pure
/// functions of the key and `DefaultHasher`'s fixed keys, so this search is
/// deterministic across runs.
fn colliding_pair() -> (usize, usize) {
    let mut seen = std::collections::HashMap::new();
    for key in 0..10_000usize {
        let bucket = bucket_index(spread(raw_hash(&key)), TABLE_LEN);
        if let Some(&other) = seen.get(&bucket) {
            return (other, key);
        }
        seen.insert(bucket, key);
    }
    panic!("no colliding pair found in search range");
}

#[test]
fn same_bucket_chain_survives_removal_of_either_member() {
    let (first, second) = colliding_pair();
    assert_ne!(first, second);

    // A single segment with a table that won't rehash away from TABLE_LEN
    // before these two entries are in it.
    let store: Arc<Store<usize, usize, IdentityFactory<usize>>> =
        Store::new(1, TABLE_LEN, 0.75, IdentityFactory::default());

    store.put(first, first * 10).unwrap();
    store.put(second, second * 10).unwrap();
    assert_eq!(store.len(), 2);

    let removed = store.remove(&first).unwrap();
    assert_eq!(removed, Some(first * 10));

    assert_eq!(store.get(&second), Some(second * 10));
    assert_eq!(store.len(), 1);
}

//! Throughput benchmarks for the segment-striped store's core operations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tierstore_core::{IdentityFactory, Store};

fn filled_store(count: usize) -> std::sync::Arc<Store<usize, usize, IdentityFactory<usize>>> {
    let store = Store::with_defaults(IdentityFactory::default());
    for i in 0..count {
        store.put(i, i * 2).unwrap();
    }
    store
}

pub fn put_throughput(c: &mut Criterion) {
    c.bench_function("put 1k fresh keys", |b| {
        b.iter(|| {
            let store = Store::with_defaults(IdentityFactory::default());
            for i in 0..1_000 {
                store.put(black_box(i), black_box(i)).unwrap();
            }
            assert_eq!(store.len(), 1_000);
        })
    });
}

pub fn get_throughput(c: &mut Criterion) {
    let store = filled_store(10_000);

    c.bench_function("get hit, 10k entries", |b| {
        b.iter(|| {
            let value = store.get(black_box(&4_242));
            assert_eq!(value, Some(8_484));
        })
    });

    c.bench_function("get miss, 10k entries", |b| {
        b.iter(|| {
            let value = store.get(black_box(&50_000));
            assert_eq!(value, None);
        })
    });
}

pub fn fault_throughput(c: &mut Criterion) {
    let store = filled_store(1_000);

    c.bench_function("fault one key in place", |b| {
        b.iter(|| {
            let current = store
                .random_sample(1, &|s: &std::sync::Arc<usize>| **s == 0)
                .into_iter()
                .next()
                .expect("key 0 is present with its identity substitute");
            let fault_substitute = (*current).clone();
            let installed = store
                .fault(black_box(&0), &current, fault_substitute)
                .unwrap();
            assert!(installed);
        })
    });
}

criterion_group! {
    name = segment_ops;
    config = Criterion::default().without_plots().sample_size(30);
    targets = put_throughput, get_throughput, fault_throughput
}
criterion_main!(segment_ops);

//! Demo binary for tierstore-core: puts a few entries into a heap-only
//! store, then shows a second store faulting an entry out to a toy disk
//! tier and reading it back through the same substitute indirection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::info;

use tierstore_core::{IdentityFactory, Store, SubstituteFactory};

/// Where an element currently lives: resident on heap, or parked on the
/// toy disk tier below under its own key.
enum Residency<E> {
    Heap(Arc<E>),
    Disk(String),
}

/// Stands in for a disk tier with an in-memory map guarded by a mutex. A
/// real factory would serialize to a file or object store instead of
/// `disk`. Cheap to clone: every clone shares the same backing map, which
/// lets the demo hold a handle to the disk state alongside the `Store`
/// that owns the factory.
#[derive(Clone, Default)]
struct DiskProxyFactory<E> {
    disk: Arc<Mutex<HashMap<String, E>>>,
}

impl<E> DiskProxyFactory<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Parks `element` on the toy disk tier under `key`, returning the
    /// substitute to hand to `Store::fault`.
    fn park(&self, key: &str, element: E) -> Residency<E> {
        self.disk.lock().unwrap().insert(key.to_string(), element);
        Residency::Disk(key.to_string())
    }
}

impl<E> SubstituteFactory for DiskProxyFactory<E>
where
    E: Clone + Send + Sync + 'static,
{
    type Key = String;
    type Element = E;
    type Substitute = Residency<E>;

    fn create(&self, _key: &String, element: E) -> Residency<E> {
        Residency::Heap(Arc::new(element))
    }

    fn decode(&self, key: &String, substitute: &Residency<E>) -> E {
        match substitute {
            Residency::Heap(arc) => (**arc).clone(),
            Residency::Disk(_) => self
                .disk
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .expect("disk entry present while a substitute still references it"),
        }
    }

    fn free(&self, substitute: Residency<E>) {
        if let Residency::Disk(tag) = substitute {
            self.disk.lock().unwrap().remove(&tag);
        }
    }

    fn created(&self, substitute: &Residency<E>) -> bool {
        matches!(substitute, Residency::Heap(_))
    }
}

fn main() {
    env_logger::init();

    heap_only_demo();
    tiered_demo();
}

/// A store with no fault tier at all: every substitute is the element
/// itself, reference-counted.
fn heap_only_demo() {
    let store: Arc<Store<String, String, IdentityFactory<String>>> =
        Store::with_defaults(IdentityFactory::default());

    store.put("mango".to_string(), "sweet".to_string()).unwrap();
    store.put("lime".to_string(), "sour".to_string()).unwrap();

    info!("heap-only store holds {} entries", store.len());
    info!("mango tastes {:?}", store.get(&"mango".to_string()));

    store.dispose();
}

/// A store whose factory can swap a resident element for a disk-backed
/// stand-in, exercising `fault`.
fn tiered_demo() {
    let disk_factory = DiskProxyFactory::<String>::default();
    let store: Arc<Store<String, String, DiskProxyFactory<String>>> =
        Store::with_defaults(disk_factory.clone());

    let key = "archive/2026".to_string();
    store
        .put(key.clone(), "cold record".to_string())
        .unwrap();

    info!(
        "before fault: {:?}",
        store.get(&key)
    );

    // Fault needs the currently-installed substitute as a CAS witness. A
    // real caller would get this from a sampling pass or a listener
    // callback; with exactly one entry in the store, sampling for one
    // substitute is guaranteed to return this key's.
    let resident = store
        .random_sample_any(1)
        .into_iter()
        .next()
        .expect("store holds exactly one entry");

    let parked = disk_factory.park(&key, "cold record".to_string());
    let faulted = store.fault(&key, &resident, parked).unwrap();
    info!("faulted {key} to disk: {faulted}");

    info!("after fault: {:?}", store.get(&key));

    store.dispose();
}

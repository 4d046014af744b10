//! Store: the public, segment-striped concurrent map.

use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use rand::Rng;

use crate::error::{Error, ErrorKind, Result};
use crate::factory::SubstituteFactory;
use crate::hashing;
use crate::listener::{Listener, ListenerBus};
use crate::lock::SyncHandle;
use crate::segment::{
    AcceptAll, Displaced, FaultOutcome, SampleFilter, Segment, DEFAULT_INITIAL_CAPACITY,
    DEFAULT_LOAD_FACTOR,
};
use crate::status::{Status, StatusCell};
use crate::views::{ElementView, KeyView};
use crate::writer::WriterManager;

/// Default number of segments, matching the historical
/// `ConcurrentHashMap` default concurrency level.
pub const DEFAULT_SEGMENTS: usize = 64;

/// A segment-striped concurrent key/value store. Reads are lock-free in the
/// steady state; mutations take only their target segment's write lock, so
/// unrelated keys never contend. Values are held behind a `SubstituteFactory`
/// indirection, letting a configuration keep hot values on heap and cold
/// ones behind an arbitrary encoded representation (e.g. on disk).
pub struct Store<K, E, F: SubstituteFactory<Key = K, Element = E>> {
    segments: Vec<Segment<K, E, F>>,
    segment_shift: u32,
    factory: Arc<F>,
    status: StatusCell,
    listeners: ListenerBus<K, E, F::Substitute>,
    writer: Option<Arc<dyn WriterManager<K, E>>>,
    key_view: OnceLock<Arc<KeyView<K, E, F>>>,
    element_view: OnceLock<Arc<ElementView<K, E, F>>>,
}

impl<K, E, F> Store<K, E, F>
where
    K: Hash + Eq + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: SubstituteFactory<Key = K, Element = E> + 'static,
{
    /// Builds a store with `num_segments` stripes (rounded up to a power of
    /// two) and `initial_capacity` total buckets spread evenly across them.
    pub fn new(num_segments: usize, initial_capacity: usize, load_factor: f64, factory: F) -> Arc<Self> {
        let num_segments = num_segments.max(1).next_power_of_two();
        let per_segment_capacity = (initial_capacity / num_segments).max(1);
        let factory = Arc::new(factory);

        let segments = (0..num_segments)
            .map(|_| Segment::new(per_segment_capacity, load_factor, factory.clone()))
            .collect();

        let store = Store {
            segments,
            segment_shift: hashing::segment_shift(num_segments),
            factory,
            status: StatusCell::new(),
            listeners: ListenerBus::new(),
            writer: None,
            key_view: OnceLock::new(),
            element_view: OnceLock::new(),
        };
        store.status.set(Status::Alive);
        Arc::new(store)
    }

    /// Builds a store using `DEFAULT_SEGMENTS`/`DEFAULT_INITIAL_CAPACITY`/
    /// `DEFAULT_LOAD_FACTOR`.
    pub fn with_defaults(factory: F) -> Arc<Self> {
        Self::new(DEFAULT_SEGMENTS, DEFAULT_INITIAL_CAPACITY * DEFAULT_SEGMENTS, DEFAULT_LOAD_FACTOR, factory)
    }

    /// Attaches a write-behind collaborator. Only meaningful before the
    /// store is shared; there is no thread-safe way to swap it afterward.
    pub fn with_writer(mut self: Arc<Self>, writer: Arc<dyn WriterManager<K, E>>) -> Arc<Self> {
        match Arc::get_mut(&mut self) {
            Some(store) => store.writer = Some(writer),
            None => panic!("Store::with_writer must be called before the store is shared"),
        }
        self
    }

    pub fn add_listener(&self, listener: Arc<dyn Listener<K, E, F::Substitute>>) {
        self.listeners.add(listener);
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.status.get() == Status::Alive {
            Ok(())
        } else {
            Err(Error::from(ErrorKind::NotAlive))
        }
    }

    fn hash_of(&self, key: &K) -> i32 {
        hashing::spread(hashing::raw_hash(key))
    }

    fn segment_for(&self, hash: i32) -> &Segment<K, E, F> {
        let idx = hashing::segment_index(hash, self.segment_shift);
        &self.segments[idx]
    }

    /// Number of segment stripes.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Hands back a lock handle over the structural lock of whichever
    /// segment `key` hashes to, letting a caller hold a segment locked
    /// across more than one store call (e.g. read-then-conditionally-fault
    /// without another writer interleaving).
    pub fn sync_for(&self, key: &K) -> SyncHandle<'_, K, E, F> {
        let hash = self.hash_of(key);
        SyncHandle::new(self.segment_for(hash))
    }

    pub fn get(&self, key: &K) -> Option<E> {
        let hash = self.hash_of(key);
        self.segment_for(hash).get(key, hash)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let hash = self.hash_of(key);
        self.segment_for(hash).contains(key, hash)
    }

    /// Installs `element`, returning the previously-installed element, if
    /// any. Notifies `on_update` listeners and the write-behind collaborator
    /// after the in-core mutation has committed.
    pub fn put(&self, key: K, element: E) -> Result<Option<E>> {
        self.put_impl(key, element, false)
    }

    /// As `put`, but leaves an existing mapping untouched.
    pub fn put_if_absent(&self, key: K, element: E) -> Result<Option<E>> {
        self.put_impl(key, element, true)
    }

    fn put_impl(&self, key: K, element: E, only_if_absent: bool) -> Result<Option<E>> {
        self.ensure_alive()?;
        let key = Arc::new(key);
        let hash = self.hash_of(&key);
        let segment = self.segment_for(hash);
        let displaced = segment.put(key.clone(), hash, element, only_if_absent);
        self.finish_update(&key, segment, displaced)
    }

    /// Directly installs a pre-encoded substitute, bypassing
    /// `factory.create`. Used to seed a store from an external snapshot.
    pub fn put_raw_if_absent(&self, key: K, substitute: F::Substitute) -> Result<bool> {
        self.ensure_alive()?;
        let key = Arc::new(key);
        let hash = self.hash_of(&key);
        Ok(self.segment_for(hash).put_raw_if_absent(key, hash, substitute))
    }

    /// Replaces the element for an already-present key. No-op (returns
    /// `None`) if absent.
    pub fn replace(&self, key: &K, new_element: E) -> Result<Option<E>> {
        self.ensure_alive()?;
        let hash = self.hash_of(key);
        let segment = self.segment_for(hash);
        let displaced = segment.replace(key, hash, new_element);
        self.finish_update(key, segment, displaced)
    }

    /// Replaces only if the current element equals `old_element` under
    /// `PartialEq`.
    pub fn replace_cmp(&self, key: &K, old_element: &E, new_element: E) -> Result<Option<E>>
    where
        E: PartialEq,
    {
        self.ensure_alive()?;
        let hash = self.hash_of(key);
        let segment = self.segment_for(hash);
        let displaced = segment.replace_cmp(key, hash, old_element, new_element, PartialEq::eq);
        self.finish_update(key, segment, displaced)
    }

    /// Notifies listeners and the write-behind collaborator for a
    /// `put`/`replace`, then frees the displaced substitute — unconditionally,
    /// even if the write-behind call failed, since the in-core mutation has
    /// already committed and a write-behind failure never rolls it back.
    fn finish_update(
        &self,
        key: &K,
        segment: &Segment<K, E, F>,
        displaced: Displaced<E, F::Substitute>,
    ) -> Result<Option<E>> {
        let mut writer_result = Ok(());
        if let Some(new_substitute) = &displaced.new_substitute {
            let new_element = self.factory.decode(key, new_substitute);
            if let Some(old_substitute) = &displaced.old_substitute {
                self.listeners.notify_update(key, old_substitute, &new_element);
            }
            writer_result = self.notify_writer_put(key, &new_element);
        }
        if let Some(old_substitute) = displaced.old_substitute {
            segment.free_displaced(old_substitute);
        }
        writer_result?;
        Ok(displaced.old_element)
    }

    /// Removes a key unconditionally.
    pub fn remove(&self, key: &K) -> Result<Option<E>> {
        self.ensure_alive()?;
        let hash = self.hash_of(key);
        let segment = self.segment_for(hash);
        let displaced = segment.remove(key, hash, None, |_: &E, _: &E| true);
        self.finish_remove(key, segment, displaced)
    }

    /// Removes a key only if the current element equals `expected`.
    pub fn remove_if(&self, key: &K, expected: &E) -> Result<Option<E>>
    where
        E: PartialEq,
    {
        self.ensure_alive()?;
        let hash = self.hash_of(key);
        let segment = self.segment_for(hash);
        let displaced = segment.remove(key, hash, Some(expected), PartialEq::eq);
        self.finish_remove(key, segment, displaced)
    }

    /// As `finish_update`, but for `remove`: frees the displaced substitute
    /// unconditionally, propagating a write-behind failure only afterward.
    fn finish_remove(
        &self,
        key: &K,
        segment: &Segment<K, E, F>,
        displaced: Displaced<E, F::Substitute>,
    ) -> Result<Option<E>> {
        let mut writer_result = Ok(());
        if let (Some(old_substitute), Some(old_element)) = (&displaced.old_substitute, &displaced.old_element) {
            self.listeners.notify_remove(key, old_substitute, old_element);
            writer_result = self.notify_writer_remove(key);
        }
        if let Some(old_substitute) = displaced.old_substitute {
            segment.free_displaced(old_substitute);
        }
        writer_result?;
        Ok(displaced.old_element)
    }

    /// Atomically swaps the value slot for `key` from `expect` to a
    /// caller-supplied replacement substitute, bypassing `factory.create`.
    /// Used to move an entry to a colder representation (e.g. fault it out
    /// to disk) without decoding/re-encoding the element.
    pub fn fault(&self, key: &K, expect: &Arc<F::Substitute>, fault: F::Substitute) -> Result<bool> {
        self.ensure_alive()?;
        let hash = self.hash_of(key);
        let segment = self.segment_for(hash);
        match segment.fault(key, hash, expect, fault) {
            FaultOutcome::Installed { previous, installed } => {
                self.listeners.notify_fault(key, &previous, &installed);
                segment.free_displaced(previous);
                Ok(true)
            }
            FaultOutcome::Rejected => Ok(false),
        }
    }

    /// As `fault`, but gives up immediately on lock contention instead of
    /// blocking.
    pub fn try_fault(&self, key: &K, expect: &Arc<F::Substitute>, fault: F::Substitute) -> Result<bool> {
        self.ensure_alive()?;
        let hash = self.hash_of(key);
        let segment = self.segment_for(hash);
        match segment.try_fault(key, hash, expect, fault) {
            FaultOutcome::Installed { previous, installed } => {
                self.listeners.notify_fault(key, &previous, &installed);
                segment.free_displaced(previous);
                Ok(true)
            }
            FaultOutcome::Rejected => Ok(false),
        }
    }

    /// Removes `key` only if its current substitute is referentially the
    /// one supplied (or unconditionally, if `None`), without invoking the
    /// write-behind collaborator — eviction is an internal capacity
    /// decision, not a logical delete.
    pub fn evict(&self, key: &K, expect: Option<&Arc<F::Substitute>>) -> Result<Option<E>> {
        self.ensure_alive()?;
        let hash = self.hash_of(key);
        let segment = self.segment_for(hash);
        let evicted = segment.evict(key, hash, expect);
        if let Some(element) = &evicted {
            self.listeners.notify_evict(key, element);
        }
        Ok(evicted)
    }

    pub fn clear(&self) -> Result<()> {
        self.ensure_alive()?;
        for segment in &self.segments {
            segment.clear();
        }
        Ok(())
    }

    /// Number of reachable entries. Tries an unlocked two-pass estimate
    /// first (stable if no segment's mod-count changes between passes);
    /// falls back to acquiring every segment's read lock, always in
    /// ascending segment-index order, to avoid lock-ordering deadlocks with
    /// any other store-wide operation that also locks in ascending order.
    pub fn len(&self) -> usize {
        for _ in 0..2 {
            let before: usize = self.segments.iter().map(Segment::mod_count).sum();
            let count: usize = self.segments.iter().map(Segment::len).sum();
            let after: usize = self.segments.iter().map(Segment::mod_count).sum();
            if before == after {
                return count;
            }
        }
        let _guards: Vec<_> = self
            .segments
            .iter()
            .map(|segment| segment.structural_lock().read().unwrap())
            .collect();
        self.segments.iter().map(Segment::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean heap hit rate across segments that have recorded at least one
    /// lookup, i.e. `mean_i(heap_hit_i / (heap_hit_i + heap_miss_i))` over
    /// segments with `heap_hit_i + heap_miss_i > 0`. A segment with no
    /// recorded lookups is excluded rather than counted as a zero, so a
    /// freshly-started store with most segments still empty doesn't drag
    /// the average down.
    pub fn heap_hit_rate(&self) -> f64 {
        let mut total = 0.0;
        let mut counted = 0usize;
        for segment in &self.segments {
            let hit = segment.heap_hit() as f64;
            let miss = segment.heap_miss() as f64;
            let total_lookups = hit + miss;
            if total_lookups > 0.0 {
                total += hit / total_lookups;
                counted += 1;
            }
        }
        if counted == 0 {
            0.0
        } else {
            total / counted as f64
        }
    }

    /// Randomly samples up to `target_size` substitutes accepted by
    /// `filter`, visiting segments in a ring starting from a random offset
    /// so repeated calls don't always favor the same early segments.
    pub fn random_sample<Filter: SampleFilter<F::Substitute>>(
        &self,
        target_size: usize,
        filter: &Filter,
    ) -> Vec<Arc<F::Substitute>> {
        let mut out = Vec::with_capacity(target_size);
        if self.segments.is_empty() {
            return out;
        }
        let mut rng = rand::thread_rng();
        let start = rng.gen_range(0..self.segments.len());
        let seed_hash: i32 = rng.gen();

        for offset in 0..self.segments.len() {
            if out.len() >= target_size {
                break;
            }
            let idx = (start + offset) % self.segments.len();
            self.segments[idx].add_random_sample(filter, target_size, &mut out, seed_hash);
        }
        out
    }

    /// As `random_sample`, accepting every substitute.
    pub fn random_sample_any(&self, target_size: usize) -> Vec<Arc<F::Substitute>> {
        self.random_sample(target_size, &AcceptAll)
    }

    /// Weakly-consistent iteration over every live `(Key, Element)` pair, in
    /// descending segment-index order. A mutation concurrent with iteration
    /// may or may not be observed, but no entry is ever produced twice and
    /// every entry present for the iteration's entire duration is produced
    /// exactly once.
    pub fn for_each<Func: FnMut(&K, E)>(&self, mut f: Func) {
        for segment in self.segments.iter().rev() {
            segment.for_each_entry(|entry| {
                let substitute = entry.load();
                let element = self.factory.decode(&entry.key, &substitute);
                f(&entry.key, element);
            });
        }
    }

    /// As `for_each`, but visits only keys, skipping the factory decode —
    /// used by `KeyView` iteration. Hands back the entry's own `Arc<K>`
    /// (a cheap refcount bump) rather than requiring `K: Clone`.
    pub(crate) fn for_each_key_arc<Func: FnMut(Arc<K>)>(&self, mut f: Func) {
        for segment in self.segments.iter().rev() {
            segment.for_each_entry(|entry| f(entry.key.clone()));
        }
    }

    /// Lazily-constructed, memoized key-set view. Requires the store to be
    /// held behind an `Arc` since the view holds a back-reference.
    pub fn key_view(self: &Arc<Self>) -> Arc<KeyView<K, E, F>> {
        self.key_view
            .get_or_init(|| Arc::new(KeyView::new(self.clone())))
            .clone()
    }

    /// Lazily-constructed, memoized element-collection view.
    pub fn element_view(self: &Arc<Self>) -> Arc<ElementView<K, E, F>> {
        self.element_view
            .get_or_init(|| Arc::new(ElementView::new(self.clone())))
            .clone()
    }

    /// Transitions to `Shutdown`, idempotently. The first caller to win the
    /// transition drains every segment's retirement queue (blocking until
    /// any in-flight reader finishes with a displaced substitute) and then
    /// runs `factory.unbind`; later callers (including concurrent ones that
    /// lost the race) are no-ops.
    pub fn dispose(&self) {
        if self.status.mark_shutdown() {
            for segment in &self.segments {
                segment.drain_retired_blocking();
            }
            self.factory.unbind(self as &dyn std::any::Any);
        }
    }

    fn notify_writer_put(&self, key: &K, element: &E) -> Result<()> {
        match &self.writer {
            Some(writer) => writer.put(key, element).map_err(Error::store_update),
            None => Ok(()),
        }
    }

    fn notify_writer_remove(&self, key: &K) -> Result<()> {
        match &self.writer {
            Some(writer) => writer.remove(key).map_err(Error::store_update),
            None => Ok(()),
        }
    }
}

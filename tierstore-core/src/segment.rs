//! Segment: one lock stripe — an independent open-chained hash table guarded
//! by a single structural read/write lock, with a lock-free steady-state
//! read path.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::ThreadId;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::entry::{CasOutcome, HashEntry};
use crate::factory::SubstituteFactory;
use crate::hashing;

/// Default initial per-segment bucket-array capacity.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;
/// Default load factor: a segment rehashes once `count > capacity * factor`.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;
/// Segments never grow their bucket array past this size.
pub const MAX_CAPACITY: usize = 1 << 30;

type Bucket<K, S> = ArcSwapOption<HashEntry<K, S>>;
type Table<K, S> = Vec<Bucket<K, S>>;

/// A filter applied during random sampling; only substitutes for which this
/// returns `true` are appended to the output sample.
pub trait SampleFilter<S> {
    fn allows(&self, substitute: &S) -> bool;
}

/// A filter that accepts every substitute.
pub struct AcceptAll;

impl<S> SampleFilter<S> for AcceptAll {
    fn allows(&self, _substitute: &S) -> bool {
        true
    }
}

impl<S, Func: Fn(&S) -> bool> SampleFilter<S> for Func {
    fn allows(&self, substitute: &S) -> bool {
        self(substitute)
    }
}

/// One stripe of a `Store`: an independent hash table with its own
/// read/write lock, mod-count, and hit/miss counters. All public operations
/// take an already-spread hash (see `hashing::spread`).
pub struct Segment<K, E, F: SubstituteFactory<Key = K, Element = E>> {
    table: ArcSwap<Table<K, F::Substitute>>,
    count: AtomicUsize,
    mod_count: AtomicUsize,
    threshold: AtomicUsize,
    load_factor: f64,
    structural_lock: RwLock<()>,
    write_holder: Mutex<Option<ThreadId>>,
    factory: Arc<F>,
    heap_hit: AtomicI64,
    heap_miss: AtomicI64,
    disk_hit: AtomicI64,
    disk_miss: AtomicI64,
    /// Displaced substitutes not yet confirmed free of outside references.
    /// A lock-free reader can hold its own clone (taken from
    /// `HashEntry::load` before the displacement) while it's mid-`retrieve`/
    /// `decode`, which the factory contract allows to do disk I/O — freeing
    /// the resource out from under that call would corrupt it. Every
    /// displacement is queued here and retried on each subsequent
    /// displacement and on `dispose`, instead of attempted once and
    /// abandoned, so a transient extra reference delays the free rather than
    /// losing it.
    retired: Mutex<Vec<Arc<F::Substitute>>>,
}

/// What a mutation displaced, if anything, paired with the previous decoded
/// element for the caller. `old_substitute` is left un-freed: the `Store`
/// notifies listeners with it first, then calls `Segment::free_displaced`
/// — freeing it here, before dispatch, would let a listener observe a
/// substitute the factory has already reclaimed.
pub struct Displaced<E, S> {
    pub old_element: Option<E>,
    pub old_substitute: Option<Arc<S>>,
    /// Set on a successful `put`/`replace` to the substitute now occupying
    /// the slot, so the `Store` can decode it for `on_update` without
    /// requiring `E: Clone`. Always `None` for `remove`/`evict`, which have
    /// no replacement.
    pub new_substitute: Option<Arc<S>>,
}

impl<E, S> Displaced<E, S> {
    fn none() -> Self {
        Displaced {
            old_element: None,
            old_substitute: None,
            new_substitute: None,
        }
    }
}

/// Result of `Segment::fault`/`try_fault`.
pub enum FaultOutcome<S> {
    /// The CAS succeeded. `previous` is un-freed, same rule as `Displaced`:
    /// the `Store` notifies `on_fault` first, then frees it via
    /// `free_displaced`. `installed` is the substitute now in the slot, for
    /// the listener callout.
    Installed { previous: Arc<S>, installed: Arc<S> },
    /// Stale `expect`, a contended `try_fault`, or the key is gone. The
    /// candidate substitute has already been freed.
    Rejected,
}

impl<K, E, F> Segment<K, E, F>
where
    K: Eq + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: SubstituteFactory<Key = K, Element = E>,
{
    pub fn new(initial_capacity: usize, load_factor: f64, factory: Arc<F>) -> Self {
        let capacity = initial_capacity.max(1).next_power_of_two();
        let mut table = Vec::with_capacity(capacity);
        table.resize_with(capacity, ArcSwapOption::const_empty);
        let threshold = ((capacity as f64) * load_factor) as usize;

        Segment {
            table: ArcSwap::from_pointee(table),
            count: AtomicUsize::new(0),
            mod_count: AtomicUsize::new(0),
            threshold: AtomicUsize::new(threshold),
            load_factor,
            structural_lock: RwLock::new(()),
            write_holder: Mutex::new(None),
            factory,
            heap_hit: AtomicI64::new(0),
            heap_miss: AtomicI64::new(0),
            disk_hit: AtomicI64::new(0),
            disk_miss: AtomicI64::new(0),
            retired: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn structural_lock(&self) -> &RwLock<()> {
        &self.structural_lock
    }

    pub(crate) fn write_holder(&self) -> &Mutex<Option<ThreadId>> {
        &self.write_holder
    }

    /// Number of reachable entries, read without locking (the caller's
    /// `Store` is responsible for the two-phase-then-locked size protocol
    /// across segments).
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn mod_count(&self) -> usize {
        self.mod_count.load(Ordering::Acquire)
    }

    pub fn heap_hit(&self) -> i64 {
        self.heap_hit.load(Ordering::Relaxed)
    }
    pub fn heap_miss(&self) -> i64 {
        self.heap_miss.load(Ordering::Relaxed)
    }
    pub fn disk_hit(&self) -> i64 {
        self.disk_hit.load(Ordering::Relaxed)
    }
    pub fn disk_miss(&self) -> i64 {
        self.disk_miss.load(Ordering::Relaxed)
    }

    fn walk(
        mut node: Option<Arc<HashEntry<K, F::Substitute>>>,
        key: &K,
        hash: i32,
    ) -> Option<Arc<HashEntry<K, F::Substitute>>> {
        while let Some(entry) = node {
            if entry.hash == hash && &*entry.key == key {
                return Some(entry);
            }
            node = entry.next();
        }
        None
    }

    fn find(&self, key: &K, hash: i32) -> Option<Arc<HashEntry<K, F::Substitute>>> {
        let table = self.table.load();
        let idx = hashing::bucket_index(hash, table.len());
        Self::walk(table[idx].load_full(), key, hash)
    }

    /// Finds an entry lock-free, retrying once under the read lock only if
    /// the bucket slot itself looked empty — the narrow window where a
    /// concurrent rehash has published a new, not-yet-fully-populated table.
    /// A populated bucket that simply doesn't contain `key` is a genuine
    /// miss and returns `None` immediately; it never blocks behind a writer.
    fn find_with_retry(&self, key: &K, hash: i32) -> Option<Arc<HashEntry<K, F::Substitute>>> {
        let table = self.table.load();
        let idx = hashing::bucket_index(hash, table.len());
        let head = table[idx].load_full();
        if head.is_some() {
            return Self::walk(head, key, hash);
        }
        let _read = self.structural_lock.read().unwrap();
        self.find(key, hash)
    }

    /// Decodes via the factory and records a heap/disk hit; `None` records
    /// a miss on both counters.
    pub fn get(&self, key: &K, hash: i32) -> Option<E> {
        match self.find_with_retry(key, hash) {
            Some(entry) => {
                let substitute = entry.load();
                self.record_hit(&substitute);
                Some(self.factory.retrieve(key, &substitute))
            }
            None => {
                self.heap_miss.fetch_add(1, Ordering::Relaxed);
                self.disk_miss.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn record_hit(&self, substitute: &F::Substitute) {
        if self.factory.created(substitute) {
            self.heap_hit.fetch_add(1, Ordering::Relaxed);
        } else {
            self.heap_miss.fetch_add(1, Ordering::Relaxed);
            self.disk_hit.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// No decode, no stats.
    pub fn contains(&self, key: &K, hash: i32) -> bool {
        self.find_with_retry(key, hash).is_some()
    }

    /// Returns the raw slot contents without decoding or recording stats.
    pub fn unretrieved_get(&self, key: &K, hash: i32) -> Option<Arc<F::Substitute>> {
        self.find_with_retry(key, hash).map(|entry| entry.load())
    }

    /// Installs `element` via `factory.create`. If `only_if_absent` and the
    /// key is already present, makes no change and returns the current
    /// decoded element as `old_element` with no displaced substitute.
    /// Triggers a rehash when `count` exceeds `threshold` after the insert.
    pub fn put(
        &self,
        key: Arc<K>,
        hash: i32,
        element: E,
        only_if_absent: bool,
    ) -> Displaced<E, F::Substitute> {
        let _write = self.structural_lock.write().unwrap();
        self.track_write_holder();

        if let Some(entry) = self.find(&key, hash) {
            if only_if_absent {
                let current = entry.load();
                let old_element = self.factory.decode(&key, &current);
                self.clear_write_holder();
                return Displaced {
                    old_element: Some(old_element),
                    old_substitute: None,
                    new_substitute: None,
                };
            }
            let new_substitute = self.factory.create(&key, element);
            let old_substitute = entry.store(new_substitute);
            let old_element = self.factory.decode(&key, &old_substitute);
            self.mod_count.fetch_add(1, Ordering::AcqRel);
            let installed = entry.load();
            self.clear_write_holder();
            return Displaced {
                old_element: Some(old_element),
                old_substitute: Some(old_substitute),
                new_substitute: Some(installed),
            };
        }

        let substitute = self.factory.create(&key, element);
        let installed = self.insert_new(key, hash, substitute);
        self.clear_write_holder();
        Displaced {
            old_element: None,
            old_substitute: None,
            new_substitute: Some(installed),
        }
    }

    /// Directly installs `substitute` without invoking `factory.create`.
    /// Returns `true` if installed (key was absent), `false` if the key was
    /// already present (no change made).
    pub fn put_raw_if_absent(&self, key: Arc<K>, hash: i32, substitute: F::Substitute) -> bool {
        let _write = self.structural_lock.write().unwrap();
        self.track_write_holder();
        if self.find(&key, hash).is_some() {
            self.clear_write_holder();
            return false;
        }
        let _ = self.insert_new(key, hash, substitute);
        self.clear_write_holder();
        true
    }

    fn insert_new(&self, key: Arc<K>, hash: i32, substitute: F::Substitute) -> Arc<F::Substitute> {
        let table = self.table.load();
        let idx = hashing::bucket_index(hash, table.len());
        let head = table[idx].load_full();
        let entry = HashEntry::new(key, hash, head, substitute);
        let installed = entry.load();
        table[idx].store(Some(entry));

        self.mod_count.fetch_add(1, Ordering::AcqRel);
        let new_count = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        if new_count > self.threshold.load(Ordering::Acquire) {
            self.rehash(&table);
        }
        installed
    }

    /// Only replaces if the key is present.
    pub fn replace(&self, key: &K, hash: i32, new_element: E) -> Displaced<E, F::Substitute> {
        self.replace_if(key, hash, new_element, |_existing| true)
    }

    /// Only replaces if the key is present and `cmp(existing_decoded,
    /// old_element)` holds.
    pub fn replace_cmp<Cmp>(
        &self,
        key: &K,
        hash: i32,
        old_element: &E,
        new_element: E,
        cmp: Cmp,
    ) -> Displaced<E, F::Substitute>
    where
        Cmp: Fn(&E, &E) -> bool,
    {
        self.replace_if(key, hash, new_element, |existing| cmp(existing, old_element))
    }

    fn replace_if<Pred>(
        &self,
        key: &K,
        hash: i32,
        new_element: E,
        predicate: Pred,
    ) -> Displaced<E, F::Substitute>
    where
        Pred: Fn(&E) -> bool,
    {
        let _write = self.structural_lock.write().unwrap();
        self.track_write_holder();

        let result = match self.find(key, hash) {
            Some(entry) => {
                let current = entry.load();
                let decoded = self.factory.decode(key, &current);
                if predicate(&decoded) {
                    let new_substitute = self.factory.create(key, new_element);
                    let old_substitute = entry.store(new_substitute);
                    self.mod_count.fetch_add(1, Ordering::AcqRel);
                    let installed = entry.load();
                    Displaced {
                        old_element: Some(decoded),
                        old_substitute: Some(old_substitute),
                        new_substitute: Some(installed),
                    }
                } else {
                    Displaced::none()
                }
            }
            None => Displaced::none(),
        };
        self.clear_write_holder();
        result
    }

    /// Removes the key, optionally only if `maybe_match` matches the
    /// currently-decoded element under `cmp`.
    pub fn remove<Cmp>(
        &self,
        key: &K,
        hash: i32,
        maybe_match: Option<&E>,
        cmp: Cmp,
    ) -> Displaced<E, F::Substitute>
    where
        Cmp: Fn(&E, &E) -> bool,
    {
        let _write = self.structural_lock.write().unwrap();
        self.track_write_holder();
        let table = self.table.load();
        let idx = hashing::bucket_index(hash, table.len());

        let mut prev: Option<Arc<HashEntry<K, F::Substitute>>> = None;
        let mut node = table[idx].load_full();

        let result = loop {
            match node {
                None => break Displaced::none(),
                Some(entry) => {
                    if entry.hash == hash && &*entry.key == key {
                        let substitute = entry.load();
                        let decoded = self.factory.decode(key, &substitute);
                        let matches = match maybe_match {
                            Some(expected) => cmp(&decoded, expected),
                            None => true,
                        };
                        if !matches {
                            break Displaced::none();
                        }

                        let next = entry.next();
                        match &prev {
                            Some(p) => p.set_next(next),
                            None => table[idx].store(next),
                        }
                        self.mod_count.fetch_add(1, Ordering::AcqRel);
                        self.count.fetch_sub(1, Ordering::AcqRel);
                        break Displaced {
                            old_element: Some(decoded),
                            old_substitute: Some(substitute),
                            new_substitute: None,
                        };
                    }
                    let next = entry.next();
                    prev = Some(entry);
                    node = next;
                }
            }
        };
        self.clear_write_holder();
        result
    }

    /// Under the write lock, CASes the value slot from `expect` to `fault`.
    /// On success, returns the previous and newly-installed substitutes so
    /// the caller (the `Store`) can notify listeners before freeing the
    /// previous one via `free_displaced`. On failure — stale `expect` or a
    /// key that's no longer present — the rejected candidate is freed here,
    /// since nothing ever observed it.
    pub fn fault(
        &self,
        key: &K,
        hash: i32,
        expect: &Arc<F::Substitute>,
        fault: F::Substitute,
    ) -> FaultOutcome<F::Substitute> {
        let _write = self.structural_lock.write().unwrap();
        self.track_write_holder();
        let outcome = self.fault_locked(key, hash, expect, fault);
        self.clear_write_holder();
        outcome
    }

    /// As `fault`, but only attempts the write lock; returns `Rejected`
    /// immediately on contention, freeing `fault` in that case too.
    pub fn try_fault(
        &self,
        key: &K,
        hash: i32,
        expect: &Arc<F::Substitute>,
        fault: F::Substitute,
    ) -> FaultOutcome<F::Substitute> {
        match self.structural_lock.try_write() {
            Ok(_write) => {
                self.track_write_holder();
                let outcome = self.fault_locked(key, hash, expect, fault);
                self.clear_write_holder();
                outcome
            }
            Err(_) => {
                self.factory.free(fault);
                FaultOutcome::Rejected
            }
        }
    }

    fn fault_locked(
        &self,
        key: &K,
        hash: i32,
        expect: &Arc<F::Substitute>,
        fault: F::Substitute,
    ) -> FaultOutcome<F::Substitute> {
        match self.find(key, hash) {
            Some(entry) => match entry.compare_and_set(expect, fault) {
                CasOutcome::Installed(previous) => {
                    self.mod_count.fetch_add(1, Ordering::AcqRel);
                    let installed = entry.load();
                    FaultOutcome::Installed { previous, installed }
                }
                CasOutcome::Rejected { rejected, .. } => {
                    self.factory.free(rejected);
                    FaultOutcome::Rejected
                }
            },
            None => {
                self.factory.free(fault);
                FaultOutcome::Rejected
            }
        }
    }

    /// Referential equality against the current substitute; if it matches
    /// (or `maybe_substitute` is `None`), removes and decodes.
    pub fn evict(&self, key: &K, hash: i32, maybe_substitute: Option<&Arc<F::Substitute>>) -> Option<E> {
        let _write = self.structural_lock.write().unwrap();
        self.track_write_holder();
        let table = self.table.load();
        let idx = hashing::bucket_index(hash, table.len());

        let mut prev: Option<Arc<HashEntry<K, F::Substitute>>> = None;
        let mut node = table[idx].load_full();

        let result = loop {
            match node {
                None => break None,
                Some(entry) => {
                    if entry.hash == hash && &*entry.key == key {
                        let current = entry.load();
                        let referentially_matches = match maybe_substitute {
                            Some(expected) => Arc::ptr_eq(expected, &current),
                            None => true,
                        };
                        if !referentially_matches {
                            break None;
                        }
                        let next = entry.next();
                        match &prev {
                            Some(p) => p.set_next(next),
                            None => table[idx].store(next),
                        }
                        self.mod_count.fetch_add(1, Ordering::AcqRel);
                        self.count.fetch_sub(1, Ordering::AcqRel);
                        let decoded = self.factory.decode(key, &current);
                        self.retire(current);
                        break Some(decoded);
                    }
                    let next = entry.next();
                    prev = Some(entry);
                    node = next;
                }
            }
        };
        self.clear_write_holder();
        result
    }

    /// Frees every substitute currently stored, then empties the table.
    pub fn clear(&self) {
        let _write = self.structural_lock.write().unwrap();
        self.track_write_holder();
        let table = self.table.load();
        for bucket in table.iter() {
            let mut node = bucket.load_full();
            bucket.store(None);
            while let Some(entry) = node {
                let substitute = entry.load();
                self.retire(substitute);
                node = entry.next();
            }
        }
        self.count.store(0, Ordering::Release);
        self.mod_count.fetch_add(1, Ordering::AcqRel);
        self.clear_write_holder();
    }

    /// Under the read lock, samples up to `target` substitutes accepted by
    /// `filter`, starting from a bucket derived from `seed_hash` and
    /// scanning cyclically.
    pub fn add_random_sample<Filter: SampleFilter<F::Substitute>>(
        &self,
        filter: &Filter,
        target_size: usize,
        out: &mut Vec<Arc<F::Substitute>>,
        seed_hash: i32,
    ) {
        let _read = self.structural_lock.read().unwrap();
        if self.count.load(Ordering::Acquire) == 0 {
            return;
        }

        let table = self.table.load();
        let len = table.len();
        let bits = len.trailing_zeros();
        let start = if bits == 0 {
            0
        } else {
            ((seed_hash as u32) >> (32 - bits)) as usize & (len - 1)
        };

        for offset in 0..len {
            if out.len() >= target_size {
                return;
            }
            let idx = (start + offset) & (len - 1);
            let mut node = table[idx].load_full();
            while let Some(entry) = node {
                if out.len() >= target_size {
                    return;
                }
                let substitute = entry.load();
                if filter.allows(&substitute) {
                    out.push(substitute);
                }
                node = entry.next();
            }
        }
    }

    /// Iterates every live entry under no additional lock beyond what the
    /// caller already holds (or none, for a weakly-consistent snapshot).
    pub(crate) fn for_each_entry<Func: FnMut(&Arc<HashEntry<K, F::Substitute>>)>(&self, mut f: Func) {
        let table = self.table.load();
        for bucket in table.iter() {
            let mut node = bucket.load_full();
            while let Some(entry) = node {
                f(&entry);
                node = entry.next();
            }
        }
    }

    /// Doubles the table (bounded by `MAX_CAPACITY`), rewiring unchanged
    /// chain tails in place and cloning only the entries whose bucket
    /// assignment actually changes — the classic Doug Lea
    /// `ConcurrentHashMap.Segment.rehash` trick, which lets concurrent
    /// lock-free readers holding the *old* table keep following untouched
    /// `Arc<HashEntry>` nodes without ever observing a half-rewired chain.
    fn rehash(&self, old_table: &Arc<Table<K, F::Substitute>>) {
        let old_capacity = old_table.len();
        if old_capacity >= MAX_CAPACITY {
            return;
        }
        let new_capacity = old_capacity * 2;
        let mut new_table: Table<K, F::Substitute> = Vec::with_capacity(new_capacity);
        new_table.resize_with(new_capacity, ArcSwapOption::const_empty);

        for old_idx in 0..old_capacity {
            let head = old_table[old_idx].load_full();
            let Some(head) = head else { continue };

            let next = head.next();
            let idx = hashing::bucket_index(head.hash, new_capacity);

            match next {
                None => {
                    new_table[idx].store(Some(head));
                }
                Some(_) => {
                    // Find the longest run at the tail of the chain whose
                    // members all land in the same new bucket; that run can
                    // be reused as-is.
                    let mut last_run = head.clone();
                    let mut last_idx = idx;
                    let mut cursor = head.next();
                    while let Some(node) = cursor {
                        let k = hashing::bucket_index(node.hash, new_capacity);
                        if k != last_idx {
                            last_idx = k;
                            last_run = node.clone();
                        }
                        cursor = node.next();
                    }
                    new_table[last_idx].store(Some(last_run.clone()));

                    // Clone every node up to (not including) last_run,
                    // prepending each into its new bucket.
                    let mut p = Some(head);
                    while let Some(node) = p {
                        if Arc::ptr_eq(&node, &last_run) {
                            break;
                        }
                        let k = hashing::bucket_index(node.hash, new_capacity);
                        let existing_head = new_table[k].load_full();
                        let cloned = HashEntry::with_slot(
                            node.key.clone(),
                            node.hash,
                            existing_head,
                            node.load(),
                        );
                        new_table[k].store(Some(cloned));
                        p = node.next();
                    }
                }
            }
        }

        self.threshold
            .store(((new_capacity as f64) * self.load_factor) as usize, Ordering::Release);
        self.table.store(Arc::new(new_table));
    }

    fn track_write_holder(&self) {
        *self.write_holder.lock().unwrap() = Some(std::thread::current().id());
    }

    fn clear_write_holder(&self) {
        *self.write_holder.lock().unwrap() = None;
    }

    /// Frees a displaced substitute once the `Store` has finished notifying
    /// listeners with it (see `Displaced`/`FaultOutcome`).
    pub fn free_displaced(&self, substitute: Arc<F::Substitute>) {
        self.retire(substitute);
    }

    /// Queues a displaced substitute for freeing and opportunistically
    /// drains the retirement queue. `factory.free` is guaranteed to run
    /// exactly once per displaced substitute, eventually — a reference
    /// still held by an in-flight reader only delays that, it never skips
    /// it, since anything `Arc::try_unwrap` rejects here stays queued and
    /// is retried on the next displacement (or the blocking drain in
    /// `drain_retired_blocking`) instead of being dropped on the floor.
    fn retire(&self, substitute: Arc<F::Substitute>) {
        let mut retired = self.retired.lock().unwrap();
        retired.push(substitute);
        Self::drain_locked(&self.factory, &mut retired);
    }

    fn drain_locked(factory: &F, retired: &mut Vec<Arc<F::Substitute>>) {
        let pending = std::mem::take(retired);
        for substitute in pending {
            match Arc::try_unwrap(substitute) {
                Ok(value) => factory.free(value),
                Err(still_referenced) => retired.push(still_referenced),
            }
        }
    }

    /// Blocks until every currently-queued substitute has been freed.
    /// Called once per segment by `Store::dispose`, by which point no new
    /// mutation can add to the queue, so the only thing left to wait out is
    /// an in-flight reader finishing its own `retrieve`/`decode` call.
    pub(crate) fn drain_retired_blocking(&self) {
        loop {
            let mut retired = self.retired.lock().unwrap();
            if retired.is_empty() {
                return;
            }
            Self::drain_locked(&self.factory, &mut retired);
            if retired.is_empty() {
                return;
            }
            drop(retired);
            std::thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A factory whose substitute *is* the element, with no extra `Arc`
    /// indirection beyond what `HashEntry`'s slot already adds — keeps these
    /// unit tests working with plain `i32`s instead of `IdentityFactory`'s
    /// `Arc<E>` substitutes.
    struct RawFactory;

    impl SubstituteFactory for RawFactory {
        type Key = i32;
        type Element = i32;
        type Substitute = i32;

        fn create(&self, _key: &i32, element: i32) -> i32 {
            element
        }

        fn decode(&self, _key: &i32, substitute: &i32) -> i32 {
            *substitute
        }
    }

    fn segment() -> Segment<i32, i32, RawFactory> {
        Segment::new(4, 0.75, Arc::new(RawFactory))
    }

    #[test]
    fn put_then_get_round_trips() {
        let seg = segment();
        let displaced = seg.put(Arc::new(1), 1, 10, false);
        assert!(displaced.old_element.is_none());
        assert_eq!(seg.get(&1, 1), Some(10));
        assert_eq!(seg.len(), 1);
    }

    #[test]
    fn put_only_if_absent_leaves_existing_value() {
        let seg = segment();
        seg.put(Arc::new(1), 1, 10, false);
        let displaced = seg.put(Arc::new(1), 1, 99, true);
        assert_eq!(displaced.old_element, Some(10));
        assert!(displaced.old_substitute.is_none());
        assert_eq!(seg.get(&1, 1), Some(10));
    }

    #[test]
    fn remove_unlinks_and_shrinks_count() {
        let seg = segment();
        seg.put(Arc::new(1), 1, 10, false);
        let displaced = seg.remove(&1, 1, None, |_: &i32, _: &i32| true);
        assert_eq!(displaced.old_element, Some(10));
        assert_eq!(seg.len(), 0);
        assert!(seg.get(&1, 1).is_none());
    }

    #[test]
    fn rehash_preserves_every_entry_across_several_growth_triggers() {
        let seg = segment(); // capacity 4, threshold 3
        for i in 0..20i32 {
            seg.put(Arc::new(i), i, i * 10, false);
        }
        assert_eq!(seg.len(), 20);
        for i in 0..20i32 {
            assert_eq!(seg.get(&i, i), Some(i * 10));
        }
    }

    #[test]
    fn fault_installs_on_matching_expect_and_rejects_on_stale() {
        let seg = segment();
        seg.put(Arc::new(1), 1, 10, false);
        let current = seg.unretrieved_get(&1, 1).unwrap();

        let stale: Arc<i32> = Arc::new(10);
        match seg.fault(&1, 1, &stale, 20) {
            FaultOutcome::Rejected => {}
            FaultOutcome::Installed { .. } => panic!("stale expect must not install"),
        }
        assert_eq!(seg.get(&1, 1), Some(10));

        match seg.fault(&1, 1, &current, 20) {
            FaultOutcome::Installed { previous, installed } => {
                assert_eq!(*previous, 10);
                assert_eq!(*installed, 20);
            }
            FaultOutcome::Rejected => panic!("matching expect must install"),
        }
        assert_eq!(seg.get(&1, 1), Some(20));
    }
}

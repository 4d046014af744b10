//! HashEntry: an immutable (key, hash, next) cell holding a mutable value slot.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

/// One chained cell in a segment's bucket. `key` and `hash` are fixed at
/// construction; `next` links to the rest of the chain and is published
/// with release ordering so a concurrent reader observes either the old or
/// the fully-initialized new chain, never a partially-built one. `slot`
/// holds the entry's current substitute and supports lock-free load/store/
/// compare-and-set via `ArcSwap`.
pub struct HashEntry<K, S> {
    pub key: Arc<K>,
    pub hash: i32,
    next: ArcSwapOption<HashEntry<K, S>>,
    slot: ArcSwap<S>,
}

impl<K, S> HashEntry<K, S> {
    /// Builds a new entry, already linked to `next`, with `initial`
    /// installed in its value slot. The entry is returned behind an `Arc`
    /// so it can be published into a bucket head with a single release
    /// store.
    pub fn new(
        key: Arc<K>,
        hash: i32,
        next: Option<Arc<HashEntry<K, S>>>,
        initial: S,
    ) -> Arc<Self> {
        Self::with_slot(key, hash, next, Arc::new(initial))
    }

    /// As `new`, but installs an already-shared substitute `Arc` directly
    /// rather than wrapping a fresh value. Used by rehash, which relocates
    /// entries into a bigger table without disturbing the identity of their
    /// current substitute (any caller holding that `Arc` from a prior
    /// `load()` must keep seeing the same allocation).
    pub fn with_slot(
        key: Arc<K>,
        hash: i32,
        next: Option<Arc<HashEntry<K, S>>>,
        slot: Arc<S>,
    ) -> Arc<Self> {
        Arc::new(HashEntry {
            key,
            hash,
            next: ArcSwapOption::from(next),
            slot: ArcSwap::new(slot),
        })
    }

    /// Acquire-loads the next entry in the chain, if any.
    pub fn next(&self) -> Option<Arc<HashEntry<K, S>>> {
        self.next.load_full()
    }

    /// Release-stores a new next pointer, rewiring the chain tail.
    pub fn set_next(&self, next: Option<Arc<HashEntry<K, S>>>) {
        self.next.store(next);
    }

    /// Acquire-loads the current substitute occupying the value slot.
    pub fn load(&self) -> Arc<S> {
        self.slot.load_full()
    }

    /// Release-stores a new substitute into the value slot, unconditionally.
    /// The caller is responsible for freeing the displaced substitute via
    /// the factory — `store` itself does not know about factories.
    pub fn store(&self, new: S) -> Arc<S> {
        self.slot.swap(Arc::new(new))
    }

    /// Compares the value slot against `expect` by pointer identity and, if
    /// it still matches, installs `new`. On success, returns the displaced
    /// previous value for the caller to free. On failure, `new` never
    /// entered the slot at all, so it comes back whole (not wrapped in an
    /// `Arc`) alongside the value actually found, letting the caller free
    /// the rejected candidate directly rather than through a shared
    /// reference.
    pub fn compare_and_set(&self, expect: &Arc<S>, new: S) -> CasOutcome<S> {
        let candidate = Arc::new(new);
        let previous = self.slot.compare_and_swap(expect, candidate.clone());
        if Arc::ptr_eq(&previous, expect) {
            CasOutcome::Installed(previous)
        } else {
            let rejected = Arc::try_unwrap(candidate).unwrap_or_else(|_| {
                unreachable!("candidate was never published, so only this call can hold it")
            });
            CasOutcome::Rejected {
                current: previous,
                rejected,
            }
        }
    }
}

/// Result of `HashEntry::compare_and_set`.
pub enum CasOutcome<S> {
    /// `expect` matched; the slot now holds the new value and this is what
    /// it displaced.
    Installed(Arc<S>),
    /// `expect` no longer matched; nothing changed. `current` is what's
    /// actually in the slot, `rejected` is the candidate handed back for
    /// the caller to dispose of.
    Rejected { current: Arc<S>, rejected: S },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_is_observable_fully_initialized() {
        let entry = HashEntry::new(Arc::new("k"), 7, None, 100i32);
        assert_eq!(entry.hash, 7);
        assert_eq!(*entry.key, "k");
        assert_eq!(*entry.load(), 100);
        assert!(entry.next().is_none());
    }

    #[test]
    fn chain_links_and_rewires() {
        let tail = HashEntry::new(Arc::new("tail"), 1, None, 1i32);
        let head = HashEntry::new(Arc::new("head"), 2, Some(tail.clone()), 2i32);
        assert!(Arc::ptr_eq(&head.next().unwrap(), &tail));

        head.set_next(None);
        assert!(head.next().is_none());
    }

    #[test]
    fn compare_and_set_succeeds_on_match_and_fails_otherwise() {
        let entry = HashEntry::new(Arc::new("k"), 0, None, 10i32);
        let current = entry.load();

        let stale = Arc::new(999i32);
        match entry.compare_and_set(&stale, 20) {
            CasOutcome::Rejected { current, rejected } => {
                assert_eq!(*current, 10);
                assert_eq!(rejected, 20);
            }
            CasOutcome::Installed(_) => panic!("expected rejection on stale expect"),
        }
        assert_eq!(*entry.load(), 10);

        match entry.compare_and_set(&current, 20) {
            CasOutcome::Installed(previous) => assert_eq!(*previous, 10),
            CasOutcome::Rejected { .. } => panic!("expected success on matching expect"),
        }
        assert_eq!(*entry.load(), 20);
    }
}

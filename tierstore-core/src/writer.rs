//! WriterManager: optional external write-behind collaborator.
//!
//! The store treats this as a narrow, possibly-failing sink called after an
//! in-core mutation has already committed. A failure here never rolls back
//! the in-core state; it surfaces to the caller of the triggering operation
//! as `Error::StoreUpdate { .. }`.

/// Receives committed puts/removes for asynchronous persistence. Scheduling
/// and batching are entirely the implementer's concern — the store makes no
/// assumption about whether `put`/`remove` block or queue work elsewhere.
pub trait WriterManager<K, E>: Send + Sync {
    fn put(&self, key: &K, element: &E) -> std::io::Result<()>;
    fn remove(&self, key: &K) -> std::io::Result<()>;
}

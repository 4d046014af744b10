//! tierstore-core: a segmented, concurrent key/value store.
//!
//! The store is split into a fixed number of independent segments, each
//! guarding its own hash table behind a short-lived structural lock.
//! Reads never block: a segment's bucket array and each entry's value slot
//! are published through `arc-swap`, so a reader walks a stable snapshot of
//! whatever was most recently installed without taking any lock at all.
//! Writers only ever hold one segment's lock at a time, so unrelated
//! segments never contend.
//!
//! Values aren't stored directly. Each entry holds a "substitute" —
//! whatever representation a `SubstituteFactory` chooses to keep resident,
//! which may be the element itself (`IdentityFactory`) or a stand-in for an
//! element that has been moved to colder storage. `Store::fault` swaps a
//! substitute for another representation of the same element without
//! removing the entry, which is how tiering between representations is
//! implemented.

pub mod entry;
pub mod error;
pub mod factory;
pub mod hashing;
pub mod listener;
pub mod lock;
pub mod segment;
pub mod status;
pub mod store;
pub mod views;
pub mod writer;

pub use entry::{CasOutcome, HashEntry};
pub use error::{Error, ErrorKind, Result};
pub use factory::{IdentityFactory, SubstituteFactory};
pub use listener::{Listener, ListenerBus};
pub use lock::{LockKind, SyncGuard, SyncHandle};
pub use segment::{Displaced, FaultOutcome, SampleFilter, Segment};
pub use status::{Status, StatusCell};
pub use store::Store;
pub use views::{ElementView, KeyView};
pub use writer::WriterManager;

//! `SyncHandle`: a narrow adapter exposing a segment's structural lock as an
//! explicit lock/unlock pair, for callers that want to hold a segment
//! locked across more than one store call (e.g. read-then-conditionally-
//! fault without another writer interleaving).

use std::sync::{RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::error::{Error, ErrorKind, Result};
use crate::factory::SubstituteFactory;
use crate::segment::Segment;

/// Which of a segment's two lock modes to take.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LockKind {
    Read,
    Write,
}

/// An acquired lock on a segment's structural gate. Dropping it releases the
/// lock, same as any other `std::sync` guard.
pub enum SyncGuard<'a> {
    Read(RwLockReadGuard<'a, ()>),
    Write(RwLockWriteGuard<'a, ()>),
}

/// Adapter around one segment's structural `RwLock`.
pub struct SyncHandle<'a, K, E, F: SubstituteFactory<Key = K, Element = E>> {
    segment: &'a Segment<K, E, F>,
}

impl<'a, K, E, F: SubstituteFactory<Key = K, Element = E>> SyncHandle<'a, K, E, F> {
    pub fn new(segment: &'a Segment<K, E, F>) -> Self {
        SyncHandle { segment }
    }

    /// Blocks until `kind` is acquired.
    pub fn lock(&self, kind: LockKind) -> SyncGuard<'a> {
        match kind {
            LockKind::Read => SyncGuard::Read(self.segment.structural_lock().read().unwrap()),
            LockKind::Write => SyncGuard::Write(self.segment.structural_lock().write().unwrap()),
        }
    }

    /// Attempts to acquire `kind`, retrying with bounded exponential
    /// backoff until `timeout` elapses. `std::sync::RwLock` has no native
    /// timed try-lock, so this polls `try_read`/`try_write` rather than
    /// blocking indefinitely.
    pub fn try_lock(&self, kind: LockKind, timeout: Duration) -> Option<SyncGuard<'a>> {
        let deadline = Instant::now() + timeout;
        let mut backoff = Duration::from_micros(50);

        loop {
            let attempt = match kind {
                LockKind::Read => self
                    .segment
                    .structural_lock()
                    .try_read()
                    .ok()
                    .map(SyncGuard::Read),
                LockKind::Write => self
                    .segment
                    .structural_lock()
                    .try_write()
                    .ok()
                    .map(SyncGuard::Write),
            };
            if attempt.is_some() {
                return attempt;
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            std::thread::sleep(backoff.min(deadline - now));
            backoff = (backoff * 2).min(Duration::from_millis(5));
        }
    }

    /// Reports whether the calling thread holds the write lock. Read-lock
    /// ownership isn't tracked per-thread (a `RwLock` may be held by many
    /// concurrent readers at once, so "the" holder isn't a meaningful
    /// question), and asking for it is an error rather than a silent `false`.
    pub fn is_held_by_current_thread(&self, kind: LockKind) -> Result<bool> {
        match kind {
            LockKind::Write => {
                let holder = self.segment.write_holder().lock().unwrap();
                Ok(*holder == Some(std::thread::current().id()))
            }
            LockKind::Read => Err(Error::from((
                ErrorKind::Unsupported,
                "read-lock ownership is not tracked per thread",
            ))),
        }
    }
}

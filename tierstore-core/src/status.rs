//! Tri-state store lifecycle status, externally readable without locking.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a `Store`. Transitions `Uninitialised -> Alive` happen
/// once, at the end of construction; `Alive -> Shutdown` happens at most
/// once, on `dispose`. `dispose` is idempotent: calling it again after
/// shutdown is a no-op.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Status {
    Uninitialised = 0,
    Alive = 1,
    Shutdown = 2,
}

impl Status {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Status::Uninitialised,
            1 => Status::Alive,
            2 => Status::Shutdown,
            _ => unreachable!("status is only ever set to a Status discriminant"),
        }
    }
}

/// Atomic holder for `Status`, safe to read from any thread at any time.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn new() -> Self {
        StatusCell(AtomicU8::new(Status::Uninitialised as u8))
    }

    pub fn get(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, status: Status) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Transitions to `Shutdown` and reports whether this call performed
    /// the transition (`true`) or found the store already shut down
    /// (`false`), so callers can invoke `factory.unbind` at most once.
    pub fn mark_shutdown(&self) -> bool {
        self.0
            .compare_exchange(
                Status::Alive as u8,
                Status::Shutdown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialised_then_alive() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), Status::Uninitialised);
        cell.set(Status::Alive);
        assert_eq!(cell.get(), Status::Alive);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let cell = StatusCell::new();
        cell.set(Status::Alive);
        assert!(cell.mark_shutdown());
        assert_eq!(cell.get(), Status::Shutdown);
        // Second call observes it's already shut down.
        assert!(!cell.mark_shutdown());
        assert_eq!(cell.get(), Status::Shutdown);
    }
}

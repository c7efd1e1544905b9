//! Per-owner write locks.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use topicflow_types::OwnerId;

/// Lazily-populated table of one mutex per owner.
///
/// Read-modify-write sequences for one owner run under that owner's lock;
/// different owners never contend.
#[derive(Default)]
pub struct OwnerLocks {
    locks: DashMap<OwnerId, Arc<Mutex<()>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the owner's mutex, created on first use.
    pub fn handle(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        self.locks
            .entry(owner.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Acquire a mutex, recovering the guard if a previous holder panicked.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_owner_shares_lock() {
        let locks = OwnerLocks::new();
        let owner = OwnerId::parse("u1").unwrap();
        let a = locks.handle(&owner);
        let b = locks.handle(&owner);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_owners_do_not_share() {
        let locks = OwnerLocks::new();
        let a = locks.handle(&OwnerId::parse("u1").unwrap());
        let b = locks.handle(&OwnerId::parse("u2").unwrap());
        assert!(!Arc::ptr_eq(&a, &b));

        let _ga = acquire(&a);
        // Would deadlock if the owners shared a mutex.
        let _gb = acquire(&b);
    }
}

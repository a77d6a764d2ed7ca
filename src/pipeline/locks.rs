//! Per-repository mutual exclusion for sync and build.
//!
//! Two pushes to the same repository must not run git in the same working
//! tree at once. Pushes to different repositories proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::RepoName;

/// Lazily populated table of one mutex per repository name.
#[derive(Debug, Default)]
pub struct RepoLocks {
    locks: Mutex<HashMap<RepoName, Arc<Mutex<()>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        RepoLocks::default()
    }

    /// Returns the lock for `name`, creating it on first use.
    pub fn lock_for(&self, name: &RepoName) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(name.clone()).or_default().clone()
    }

    /// Number of repositories that have been locked at least once.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquires a repository lock, ignoring poisoning.
///
/// The guarded state is `()`, so a panic in a previous holder leaves nothing
/// inconsistent; the working tree is repaired by the next sync anyway.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_name_shares_a_lock() {
        let locks = RepoLocks::new();
        let a1 = locks.lock_for(&RepoName::from("a"));
        let a2 = locks.lock_for(&RepoName::from("a"));
        let b = locks.lock_for(&RepoName::from("b"));

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn holders_of_one_name_never_overlap() {
        let locks = Arc::new(RepoLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let lock = locks.lock_for(&RepoName::from("demo"));
                    let _guard = acquire(&lock);
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}

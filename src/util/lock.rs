//! Poison-tolerant access to the std locks guarding in-process stores.
//!
//! A lock poisoned by a panicking holder is recovered with a warning.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), source, op, "read")
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), source, op, "write")
}

fn recover<G>(result: LockResult<G>, source: &'static str, op: &'static str, mode: &str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "quire::lock",
            source,
            op,
            mode,
            "lock poisoned by an earlier panic; continuing with its last state"
        );
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn poisoned_lock_stays_usable() {
        let lock = Arc::new(RwLock::new(vec![1]));

        let writer = Arc::clone(&lock);
        let joined = thread::spawn(move || {
            let mut guard = writer.write().expect("first write");
            guard.push(2);
            panic!("poison the lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(lock.is_poisoned());

        assert_eq!(*rw_read(&lock, "tests", "read"), vec![1, 2]);
        rw_write(&lock, "tests", "write").push(3);
        assert_eq!(rw_read(&lock, "tests", "read").len(), 3);
    }
}

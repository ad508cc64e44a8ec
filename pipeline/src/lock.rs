/// Per-fingerprint build locks: for a given fingerprint, at most one
/// producer runs concurrently process-wide; concurrent requests de-duplicate
/// by joining the in-flight build's completion signal. Backed by a
/// `DashMap` the way `metacache`'s store shares concurrent state without one
/// global lock.
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct FingerprintLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// RAII guard: holding it is "RUNNING" for this fingerprint. Dropping it
/// (including via cancellation) releases the advisory lock. A filesystem
/// sibling lock file gives the same guarantee across processes, since the
/// in-process map alone can't coordinate separate `pipeline` invocations.
pub struct FingerprintGuard {
    _mutex_guard: OwnedMutexGuard<()>,
    lock_file: Option<std::fs::File>,
    lock_file_path: Option<std::path::PathBuf>,
}

impl Drop for FingerprintGuard {
    fn drop(&mut self) {
        self.lock_file = None;
        if let Some(path) = &self.lock_file_path {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl FingerprintLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_for(&self, fingerprint: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(fingerprint.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).value())
    }

    /// Acquires the in-process lock for `fingerprint`; if `lock_dir` is
    /// given, also creates `<fingerprint>.lock` there, blocking (short
    /// polling backoff) until any other process's lock file is gone.
    pub async fn acquire(&self, fingerprint: &str, lock_dir: Option<&Path>) -> FingerprintGuard {
        let mutex = self.entry_for(fingerprint);
        let guard = mutex.lock_owned().await;

        let (lock_file, lock_file_path) = match lock_dir {
            Some(dir) => {
                let path = dir.join(format!("{fingerprint}.lock"));
                loop {
                    match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                        Ok(f) => break (Some(f), Some(path)),
                        Err(_) => tokio::time::sleep(std::time::Duration::from_millis(25)).await,
                    }
                }
            }
            None => (None, None),
        };

        FingerprintGuard { _mutex_guard: guard, lock_file, lock_file_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_waits_for_the_first_to_drop() {
        let locks = Arc::new(FingerprintLocks::new());
        let first = locks.acquire("f1", None).await;

        let locks2 = Arc::clone(&locks);
        let handle = tokio::spawn(async move {
            let _second = locks2.acquire("f1", None).await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(first);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn distinct_fingerprints_do_not_contend() {
        let locks = FingerprintLocks::new();
        let a = locks.acquire("f1", None).await;
        let b = locks.acquire("f2", None).await;
        drop(a);
        drop(b);
    }
}

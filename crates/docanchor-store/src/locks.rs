//! Per-key async locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use docanchor_core::RecordKey;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Mutex for one key and the number of callers holding or awaiting it
#[derive(Default)]
struct Entry {
    mutex: Arc<AsyncMutex<()>>,
    users: usize,
}

/// Serializes operations on the same record key
///
/// An entry lives only while some task holds or waits for it, including
/// tasks whose wait is cancelled.
#[derive(Default)]
pub struct KeyLocks {
    inner: Mutex<HashMap<RecordKey, Entry>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<RecordKey, Entry>> {
        // the table holds no invariants a panicking holder could break
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn lock(&self, key: RecordKey) -> KeyGuard<'_> {
        let mutex = {
            let mut table = self.table();
            let entry = table.entry(key).or_default();
            entry.users += 1;
            entry.mutex.clone()
        };

        // registered before waiting so a dropped wait still releases the entry
        let mut guard = KeyGuard {
            locks: self,
            key,
            guard: None,
        };
        guard.guard = Some(mutex.lock_owned().await);
        guard
    }

    /// Keys currently held or awaited
    pub fn active(&self) -> usize {
        self.table().len()
    }
}

pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: RecordKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut table = self.locks.table();
        if let Some(entry) = table.get_mut(&self.key) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                table.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                tokio::spawn(async move {
                    let _guard = locks.lock(RecordKey::new(1, 1)).await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.lock(RecordKey::new(1, 1)).await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock(RecordKey::new(1, 2)))
            .await
            .expect("distinct keys must not contend");
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = KeyLocks::new();
        {
            let _guard = locks.lock(RecordKey::new(3, 3)).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_wait_releases_entry() {
        let locks = KeyLocks::new();
        let held = locks.lock(RecordKey::new(4, 4)).await;

        let waited =
            tokio::time::timeout(Duration::from_millis(20), locks.lock(RecordKey::new(4, 4))).await;
        assert!(waited.is_err());
        assert_eq!(locks.active(), 1);

        drop(held);
        assert_eq!(locks.active(), 0);

        // the key is usable again
        let _again = locks.lock(RecordKey::new(4, 4)).await;
        assert_eq!(locks.active(), 1);
    }
}

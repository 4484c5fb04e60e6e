// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::metrics::METRIC_META_KEY_LOCK_WAIT;

type LockId = u64;

/// A waiter of a lock.
#[derive(Debug)]
struct Waiter {
    id: LockId,
    notify: oneshot::Sender<()>,
}

/// A lock entry.
#[derive(Debug)]
struct Lock {
    /// Current lock owner.
    owner: LockId,
    /// Waiters in acquisition order.
    waiters: VecDeque<Waiter>,
}

impl Lock {
    /// Returns a [Lock] with specific `owner`.
    fn from_owner(owner: LockId) -> Lock {
        Lock {
            owner,
            waiters: VecDeque::new(),
        }
    }

    /// Pops the oldest waiter, sets it as owner and wakes it up.
    ///
    /// Returns false if there is no waiter in the waiter list.
    fn switch_owner(&mut self) -> bool {
        if let Some(waiter) = self.waiters.pop_front() {
            self.owner = waiter.id;
            // The waiter may have gone, it then releases the lock on drop.
            let _ = waiter.notify.send(());
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    locks: Mutex<HashMap<String, Lock>>,
    next_id: AtomicU64,
}

impl Inner {
    /// Releases the lock of `key` if `id` owns it.
    fn release(&self, key: &str, id: LockId) {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get_mut(key) {
            if lock.owner != id {
                return;
            }
            if !lock.switch_owner() {
                // No body waits for this lock, we can remove the lock entry.
                let _ = locks.remove(key);
            }
        }
    }

    /// Gives up waiting for `key`, releases the lock if it has been granted.
    fn abandon(&self, key: &str, id: LockId) {
        let mut locks = self.locks.lock();
        let Some(lock) = locks.get_mut(key) else {
            return;
        };
        if lock.owner == id {
            if !lock.switch_owner() {
                let _ = locks.remove(key);
            }
        } else {
            lock.waiters.retain(|waiter| waiter.id != id);
        }
    }
}

/// Exclusive async locks keyed by string.
///
/// Waiters of the same key are granted the lock in FIFO order. Locks of
/// different keys are independent.
#[derive(Debug, Clone, Default)]
pub struct KeyLockMap {
    inner: Arc<Inner>,
}

impl KeyLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock of `key`, the lock is held until the returned guard
    /// is dropped.
    ///
    /// Dropping the returned future while it waits never leaks the lock.
    pub async fn acquire(&self, key: impl Into<String>) -> KeyLockGuard {
        let key = key.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let waiting = {
            let mut locks = self.inner.locks.lock();
            if let Some(lock) = locks.get_mut(&key) {
                let (tx, rx) = oneshot::channel();
                lock.waiters.push_back(Waiter { id, notify: tx });
                rx
            } else {
                let _ = locks.insert(key.clone(), Lock::from_owner(id));
                return KeyLockGuard {
                    inner: self.inner.clone(),
                    key,
                    id,
                };
            }
        };

        let _timer = METRIC_META_KEY_LOCK_WAIT.start_timer();
        let mut pending = PendingAcquire {
            inner: self.inner.clone(),
            key,
            id,
            armed: true,
        };
        // The sender is only dropped after the ownership is switched to us.
        let _ = waiting.await;
        pending.armed = false;

        KeyLockGuard {
            inner: self.inner.clone(),
            key: std::mem::take(&mut pending.key),
            id,
        }
    }

    /// Returns true if someone holds the lock of `key`.
    pub fn is_locked(&self, key: &str) -> bool {
        self.inner.locks.lock().contains_key(key)
    }

    /// Returns the number of waiters of `key`.
    pub fn waiters(&self, key: &str) -> usize {
        self.inner
            .locks
            .lock()
            .get(key)
            .map(|lock| lock.waiters.len())
            .unwrap_or(0)
    }
}

/// Cleans up the lock entry if an acquirer is dropped before it returns.
struct PendingAcquire {
    inner: Arc<Inner>,
    key: String,
    id: LockId,
    armed: bool,
}

impl Drop for PendingAcquire {
    fn drop(&mut self) {
        if self.armed {
            self.inner.abandon(&self.key, self.id);
        }
    }
}

/// Holds the lock of a key, releases it on drop.
#[must_use]
#[derive(Debug)]
pub struct KeyLockGuard {
    inner: Arc<Inner>,
    key: String,
    id: LockId,
}

impl KeyLockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyLockGuard {
    fn drop(&mut self) {
        self.inner.release(&self.key, self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_lock_no_waiter() {
        let mut lock = Lock::from_owner(1);

        assert!(!lock.switch_owner());
    }

    #[tokio::test]
    async fn test_lock_with_waiter() {
        let mut lock = Lock::from_owner(1);

        let (tx, rx) = oneshot::channel();
        lock.waiters.push_back(Waiter { id: 2, notify: tx });

        assert!(lock.switch_owner());
        assert!(lock.waiters.is_empty());

        rx.await.unwrap();
        assert_eq!(lock.owner, 2);
    }

    #[tokio::test]
    async fn test_lock_map() {
        let key = "hello";
        let lock_map = KeyLockMap::new();

        let guard = lock_map.acquire(key).await;
        assert!(lock_map.is_locked(key));
        assert_eq!(key, guard.key());

        let lock_map2 = lock_map.clone();
        let handle = tokio::spawn(async move {
            let _guard = lock_map2.acquire(key).await;
            assert!(lock_map2.is_locked(key));
        });

        while lock_map.waiters(key) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        drop(guard);

        handle.await.unwrap();
        assert!(!lock_map.is_locked(key));
    }

    #[tokio::test]
    async fn test_different_keys_are_independent() {
        let lock_map = KeyLockMap::new();

        let _a = lock_map.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_secs(1), lock_map.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let lock_map = KeyLockMap::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let guard = lock_map.acquire("k").await;
        let mut handles = Vec::new();
        for i in 0..5 {
            let task_lock_map = lock_map.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _guard = task_lock_map.acquire("k").await;
                order.lock().push(i);
            }));
            // Enqueue the waiters one by one.
            while lock_map.waiters("k") != i + 1 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        drop(guard);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(vec![0, 1, 2, 3, 4], *order.lock());
        assert!(!lock_map.is_locked("k"));
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak() {
        let lock_map = KeyLockMap::new();

        let guard = lock_map.acquire("k").await;
        let timeout = tokio::time::timeout(Duration::from_millis(10), lock_map.acquire("k")).await;
        assert!(timeout.is_err());
        assert_eq!(0, lock_map.waiters("k"));

        drop(guard);
        assert!(!lock_map.is_locked("k"));

        // Ownership granted to a waiter that is dropped before being polled.
        let guard = lock_map.acquire("k").await;
        let mut pending = Box::pin(lock_map.acquire("k"));
        assert!(futures::poll!(pending.as_mut()).is_pending());
        drop(guard);
        assert!(lock_map.is_locked("k"));
        drop(pending);
        assert!(!lock_map.is_locked("k"));
    }
}

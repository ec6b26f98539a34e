use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Per-user async locks serializing goal mutations.
///
/// An entry lives only while a guard holds it or a task waits on it.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    locks: Arc<LockMap>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and holds the lock of one user until the guard is dropped.
    pub async fn lock(&self, user_id: &str) -> UserLockGuard {
        let mutex = self
            .locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        UserLockGuard {
            user_id: user_id.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Holds one user's lock. Dropping it releases the lock and removes the map
/// entry when nobody else is waiting for it.
#[derive(Debug)]
pub struct UserLockGuard {
    user_id: String,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        // Release first so the map's clone is the only one left when idle.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.user_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let locks = UserLocks::new();
        let guard = locks.lock("u1").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.lock("u1").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.lock("u1").await;
        let _b = locks.lock("u2").await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_locks_are_evicted() {
        let locks = UserLocks::new();
        for i in 0..1000 {
            let _guard = locks.lock(&format!("user-{}", i)).await;
        }
        assert!(locks.is_empty());

        let held = locks.lock("u1").await;
        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.lock("u1").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        // the waiter keeps the entry alive until it is done
        waiting.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// 按流程实例 id 串行化状态迁移
#[derive(Default)]
pub struct InstanceLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl InstanceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other transition holds `instance_id`.
    pub async fn acquire(&self, instance_id: &str) -> InstanceGuard {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(
                locks
                    .entry(instance_id.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        InstanceGuard {
            instance_id: instance_id.to_string(),
            lock,
            locks: Arc::clone(&self.locks),
            _guard: Some(guard),
        }
    }

    /// Number of instance ids with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct InstanceGuard {
    instance_id: String,
    lock: Arc<AsyncMutex<()>>,
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
    _guard: Option<OwnedMutexGuard<()>>,
}

impl InstanceGuard {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        // 先释放异步锁，再清理无人等待的表项
        self._guard.take();
        let mut locks = self.locks.lock();
        // map entry + this guard's handle; anyone else is waiting on it
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.instance_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn entries_are_removed_after_release() {
        let locks = InstanceLocks::new();
        {
            let guard = locks.acquire("p-1").await;
            assert_eq!(guard.instance_id(), "p-1");
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_id_is_serialized() {
        let locks = Arc::new(InstanceLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("shared").await;
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(locks.is_empty());
    }
}

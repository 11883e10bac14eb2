//! Deferred Cleanup - 进度记录的延迟删除
//!
//! 提交请求返回后，延迟一段时间删除该 generation 的进度记录。
//! 每个 id 至多一个待执行的定时任务，可单独取消，也随服务关闭统一取消。

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::ProgressStorePort;
use crate::domain::generation::GenerationId;

/// 延迟清理调度器
pub struct DeferredCleanup {
    progress_store: Arc<dyn ProgressStorePort>,
    /// generation_id -> (调度序号, 取消令牌)
    pending: Arc<DashMap<GenerationId, (u64, CancellationToken)>>,
    next_seq: AtomicU64,
    shutdown: CancellationToken,
}

impl DeferredCleanup {
    pub fn new(progress_store: Arc<dyn ProgressStorePort>, shutdown: CancellationToken) -> Self {
        Self {
            progress_store,
            pending: Arc::new(DashMap::new()),
            next_seq: AtomicU64::new(0),
            shutdown,
        }
    }

    /// 在 delay 之后删除 id 的进度记录
    ///
    /// 同一个 id 重复调度时，之前的定时任务被取消
    pub fn schedule(&self, id: GenerationId, delay: Duration) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();

        if let Some((_, previous)) = self.pending.insert(id.clone(), (seq, token.clone())) {
            previous.cancel();
        }

        tracing::debug!(
            generation_id = %id,
            delay_ms = delay.as_millis() as u64,
            "Deferred cleanup scheduled"
        );

        let store = self.progress_store.clone();
        let pending = self.pending.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(generation_id = %id, "Deferred cleanup cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    if store.delete(&id) {
                        tracing::debug!(generation_id = %id, "Deferred cleanup removed progress record");
                    } else {
                        tracing::debug!(generation_id = %id, "Progress record already gone");
                    }
                }
            }

            // 只移除自己的登记，避免误删后来的调度
            pending.remove_if(&id, |_, (current, _)| *current == seq);
        });
    }

    /// 取消 id 的待执行清理，返回是否存在
    pub fn cancel(&self, id: &GenerationId) -> bool {
        match self.pending.remove(id) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// 取消所有待执行的清理
    pub fn shutdown(&self) {
        let count = self.pending.len();
        self.pending.retain(|_, (_, token)| {
            token.cancel();
            false
        });
        tracing::debug!(count, "Deferred cleanups cancelled");
    }

    /// 待执行的清理数量
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::ProgressRecord;
    use crate::infrastructure::memory::InMemoryProgressStore;

    fn setup() -> (Arc<InMemoryProgressStore>, DeferredCleanup, CancellationToken) {
        let store = Arc::new(InMemoryProgressStore::new());
        let shutdown = CancellationToken::new();
        let cleanup = DeferredCleanup::new(store.clone(), shutdown.clone());
        (store, cleanup, shutdown)
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_removed_after_delay() {
        let (store, cleanup, _shutdown) = setup();
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::starting());

        cleanup.schedule(id.clone(), Duration::from_secs(5));
        assert_eq!(cleanup.pending(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(store.get(&id).is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.get(&id).is_none());
        assert_eq!(cleanup.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_removed_record_is_harmless() {
        let (store, cleanup, _shutdown) = setup();
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::starting());

        cleanup.schedule(id.clone(), Duration::from_secs(5));
        store.delete(&id);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(store.get(&id).is_none());
        assert_eq!(cleanup.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_record() {
        let (store, cleanup, _shutdown) = setup();
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::starting());

        cleanup.schedule(id.clone(), Duration::from_secs(5));
        assert!(cleanup.cancel(&id));
        assert!(!cleanup.cancel(&id));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(store.get(&id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous_timer() {
        let (store, cleanup, _shutdown) = setup();
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::starting());

        cleanup.schedule(id.clone(), Duration::from_secs(5));
        cleanup.schedule(id.clone(), Duration::from_secs(20));
        assert_eq!(cleanup.pending(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(store.get(&id).is_some());
        assert_eq!(cleanup.pending(), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(store.get(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending() {
        let (store, cleanup, shutdown) = setup();
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::starting());

        cleanup.schedule(id.clone(), Duration::from_secs(5));
        shutdown.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(store.get(&id).is_some());
        assert_eq!(cleanup.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_shutdown_cancels_all() {
        let (store, cleanup, _shutdown) = setup();
        let first = GenerationId::new();
        let second = GenerationId::new();
        store.set(&first, ProgressRecord::starting());
        store.set(&second, ProgressRecord::starting());

        cleanup.schedule(first.clone(), Duration::from_secs(5));
        cleanup.schedule(second.clone(), Duration::from_secs(5));
        cleanup.shutdown();
        assert_eq!(cleanup.pending(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.len(), 2);
    }
}

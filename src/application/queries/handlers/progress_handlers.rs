//! Progress Query Handlers
//!
//! 进度推送：定时读取 ProgressStore 并把记录转发给订阅者，
//! 终态、订阅者断开、服务关闭或超过最大存活时间时结束。
//! 推送端从不删除记录，删除只由 DeferredCleanup 负责。

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::ports::ProgressStorePort;
use crate::application::queries::StreamProgress;
use crate::domain::generation::{GenerationId, ProgressRecord};

/// 推送通道容量
const STREAM_BUFFER: usize = 8;

/// 进度推送配置
#[derive(Debug, Clone)]
pub struct ProgressStreamConfig {
    /// 读取间隔
    pub interval: Duration,
    /// 单个推送的最大存活时间，None 表示不限制
    pub max_lifetime: Option<Duration>,
}

impl Default for ProgressStreamConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_lifetime: Some(Duration::from_secs(120)),
        }
    }
}

/// StreamProgress Handler
pub struct StreamProgressHandler {
    progress_store: Arc<dyn ProgressStorePort>,
    config: ProgressStreamConfig,
    shutdown: CancellationToken,
}

impl StreamProgressHandler {
    pub fn new(
        progress_store: Arc<dyn ProgressStorePort>,
        config: ProgressStreamConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            progress_store,
            config,
            shutdown,
        }
    }

    /// 打开推送，返回记录接收端
    ///
    /// 丢弃接收端即视为订阅者断开，后台任务随之退出
    pub fn handle(&self, query: StreamProgress) -> mpsc::Receiver<ProgressRecord> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let store = self.progress_store.clone();
        let config = self.config.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(forward_progress(
            query.generation_id,
            store,
            config,
            shutdown,
            tx,
        ));

        rx
    }
}

async fn forward_progress(
    id: GenerationId,
    store: Arc<dyn ProgressStorePort>,
    config: ProgressStreamConfig,
    shutdown: CancellationToken,
    tx: mpsc::Sender<ProgressRecord>,
) {
    tracing::debug!(generation_id = %id, "Progress stream opened");

    // 已有记录立即推送一次
    if let Some(record) = store.get(&id) {
        let terminal = record.is_terminal();
        if tx.send(record).await.is_err() || terminal {
            tracing::debug!(generation_id = %id, terminal, "Progress stream closed on open");
            return;
        }
    }

    let deadline = async {
        match config.max_lifetime {
            Some(lifetime) => tokio::time::sleep(lifetime).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tx.closed() => {
                tracing::debug!(generation_id = %id, "Progress subscriber disconnected");
                break;
            }
            _ = shutdown.cancelled() => {
                tracing::debug!(generation_id = %id, "Progress stream closed by shutdown");
                break;
            }
            _ = &mut deadline => {
                tracing::debug!(generation_id = %id, "Progress stream reached max lifetime");
                break;
            }
            _ = ticker.tick() => {
                let Some(record) = store.get(&id) else {
                    continue;
                };
                let terminal = record.is_terminal();
                // 不在发送上等待，订阅者停止读取时其余分支仍可结束推送
                match tx.try_send(record) {
                    Ok(()) if terminal => {
                        tracing::debug!(generation_id = %id, "Progress stream reached terminal state");
                        break;
                    }
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        // 下一次读取会拿到最新记录，终态也会重试
                        tracing::trace!(generation_id = %id, "Progress subscriber lagging, update dropped");
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(generation_id = %id, "Progress subscriber disconnected");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::GenerationStatus;
    use crate::infrastructure::memory::InMemoryProgressStore;

    fn handler(
        store: Arc<InMemoryProgressStore>,
        max_lifetime: Option<Duration>,
    ) -> (StreamProgressHandler, CancellationToken) {
        let shutdown = CancellationToken::new();
        let handler = StreamProgressHandler::new(
            store,
            ProgressStreamConfig {
                interval: Duration::from_secs(1),
                max_lifetime,
            },
            shutdown.clone(),
        );
        (handler, shutdown)
    }

    fn query(id: &GenerationId) -> StreamProgress {
        StreamProgress {
            generation_id: id.clone(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_record_pushed_once_then_closed() {
        let store = Arc::new(InMemoryProgressStore::new());
        let id = GenerationId::new();
        let done = ProgressRecord::new(GenerationStatus::Complete, 100, "Generation complete!");
        store.set(&id, done.clone());

        let (handler, _shutdown) = handler(store.clone(), None);
        let mut rx = handler.handle(query(&id));

        assert_eq!(rx.recv().await, Some(done));
        assert_eq!(rx.recv().await, None);
        // 推送端不删除记录
        assert!(store.get(&id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follows_updates_until_terminal() {
        let store = Arc::new(InMemoryProgressStore::new());
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::submitted());

        let (handler, _shutdown) = handler(store.clone(), None);
        let mut rx = handler.handle(query(&id));

        assert_eq!(rx.recv().await.unwrap().status, GenerationStatus::Generating);

        store.set(
            &id,
            ProgressRecord::new(GenerationStatus::Processing, 40, "Processing image..."),
        );
        let next = rx.recv().await.unwrap();
        assert_eq!(next.status, GenerationStatus::Processing);
        assert_eq!(next.progress, 40);

        store.set(&id, ProgressRecord::error(100, "Generation timed out"));
        let last = rx.recv().await.unwrap();
        assert_eq!(last.status, GenerationStatus::Error);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_created_after_open_is_picked_up() {
        let store = Arc::new(InMemoryProgressStore::new());
        let id = GenerationId::new();

        let (handler, _shutdown) = handler(store.clone(), None);
        let mut rx = handler.handle(query(&id));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        store.set(&id, ProgressRecord::starting());

        assert_eq!(rx.recv().await, Some(ProgressRecord::starting()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_id_pushes_nothing_until_max_lifetime() {
        let store = Arc::new(InMemoryProgressStore::new());
        let (handler, _shutdown) = handler(store, Some(Duration::from_secs(5)));
        let mut rx = handler.handle(query(&GenerationId::new()));

        let started = Instant::now();
        let result = tokio::time::timeout(Duration::from_secs(30), rx.recv()).await;

        assert_eq!(result, Ok(None));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_disconnect_stops_task() {
        let store = Arc::new(InMemoryProgressStore::new());
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::submitted());

        let (handler, _shutdown) = handler(store.clone(), None);
        let baseline = Arc::strong_count(&store);

        let mut rx = handler.handle(query(&id));
        rx.recv().await.unwrap();
        assert_eq!(Arc::strong_count(&store), baseline + 1);

        drop(rx);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(Arc::strong_count(&store), baseline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_stream() {
        let store = Arc::new(InMemoryProgressStore::new());
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::submitted());

        let (handler, shutdown) = handler(store, None);
        let mut rx = handler.handle(query(&id));
        rx.recv().await.unwrap();

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(30), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_reader_still_stops_on_shutdown() {
        let store = Arc::new(InMemoryProgressStore::new());
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::submitted());

        let (handler, shutdown) = handler(store.clone(), Some(Duration::from_secs(20)));
        let baseline = Arc::strong_count(&store);

        // 接收端保持打开但从不读取，通道在第 8 秒左右填满
        let _rx = handler.handle(query(&id));
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(Arc::strong_count(&store), baseline + 1);

        shutdown.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(Arc::strong_count(&store), baseline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_reader_still_stops_at_max_lifetime() {
        let store = Arc::new(InMemoryProgressStore::new());
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::submitted());

        let (handler, _shutdown) = handler(store.clone(), Some(Duration::from_secs(20)));
        let baseline = Arc::strong_count(&store);

        let _rx = handler.handle(query(&id));
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(Arc::strong_count(&store), baseline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lagging_reader_still_gets_terminal_record() {
        let store = Arc::new(InMemoryProgressStore::new());
        let id = GenerationId::new();
        store.set(&id, ProgressRecord::submitted());

        let (handler, _shutdown) = handler(store.clone(), None);
        let mut rx = handler.handle(query(&id));

        tokio::time::sleep(Duration::from_secs(12)).await;
        store.set(&id, ProgressRecord::error(100, "Generation timed out"));

        let mut received = Vec::new();
        while let Some(record) = rx.recv().await {
            received.push(record);
        }
        assert_eq!(received.len(), STREAM_BUFFER + 1);
        assert_eq!(received.last().unwrap().status, GenerationStatus::Error);
    }
}

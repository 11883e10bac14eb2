//! Prediction Waiter - 外部任务的有界轮询
//!
//! 固定间隔查询外部任务状态，每次结果经 `evaluate_poll` 映射为本地进度记录写入
//! ProgressStore，直到成功、失败或尝试次数耗尽。
//! 所有失败在返回前都已把 error 记录写入 store，打开的进度流因此能观察到终态。

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{PredictionHandle, PredictionServicePort, ProgressStorePort};
use crate::domain::generation::{
    attempt_progress, evaluate_poll, timed_out, GenerationError, GenerationId, PollOutcome,
    ProgressRecord,
};

/// 轮询配置
#[derive(Debug, Clone)]
pub struct WaiterConfig {
    /// 两次查询之间的间隔
    pub poll_interval: Duration,
    /// 最大查询次数
    pub max_attempts: u32,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

pub struct PredictionWaiter {
    prediction_service: Arc<dyn PredictionServicePort>,
    progress_store: Arc<dyn ProgressStorePort>,
    config: WaiterConfig,
    shutdown: CancellationToken,
}

impl PredictionWaiter {
    pub fn new(
        prediction_service: Arc<dyn PredictionServicePort>,
        progress_store: Arc<dyn ProgressStorePort>,
        config: WaiterConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            prediction_service,
            progress_store,
            config,
            shutdown,
        }
    }

    pub fn config(&self) -> &WaiterConfig {
        &self.config
    }

    /// 等待外部任务完成，返回通过校验的图片 URL 列表
    pub async fn wait(
        &self,
        id: &GenerationId,
        handle: &PredictionHandle,
    ) -> Result<Vec<String>, GenerationError> {
        let max_attempts = self.config.max_attempts;

        for attempt in 0..max_attempts {
            let polled = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(self.abort(id, attempt)),
                polled = self.prediction_service.get_status(handle) => polled,
            };

            let status = match polled {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!(
                        generation_id = %id,
                        prediction_id = %handle.id,
                        attempt = attempt + 1,
                        error = %e,
                        "Failed to poll prediction status"
                    );
                    let error = GenerationError::StatusCheck(e.to_string());
                    self.progress_store.set(
                        id,
                        ProgressRecord::error(
                            attempt_progress(attempt, max_attempts),
                            error.to_string(),
                        ),
                    );
                    return Err(error);
                }
            };

            tracing::debug!(
                generation_id = %id,
                prediction_id = %handle.id,
                attempt = attempt + 1,
                state = status.state.as_str(),
                "Prediction polled"
            );

            match evaluate_poll(&status, attempt, max_attempts) {
                PollOutcome::Pending(record) => self.progress_store.set(id, record),
                PollOutcome::Completed { record, images } => {
                    self.progress_store.set(id, record);
                    tracing::info!(
                        generation_id = %id,
                        attempts = attempt + 1,
                        images = images.len(),
                        "Generation completed"
                    );
                    return Ok(images);
                }
                PollOutcome::Failed { record, error } => {
                    self.progress_store.set(id, record);
                    tracing::warn!(
                        generation_id = %id,
                        attempts = attempt + 1,
                        error = %error,
                        "Generation failed"
                    );
                    return Err(error);
                }
            }

            // 最后一次查询之后不再等待
            if attempt + 1 < max_attempts {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => return Err(self.abort(id, attempt)),
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        let (record, error) = timed_out();
        self.progress_store.set(id, record);
        tracing::warn!(
            generation_id = %id,
            attempts = max_attempts,
            "Generation timed out"
        );
        Err(error)
    }

    fn abort(&self, id: &GenerationId, attempt: u32) -> GenerationError {
        let error = GenerationError::Aborted;
        self.progress_store.set(
            id,
            ProgressRecord::error(
                attempt_progress(attempt, self.config.max_attempts),
                error.to_string(),
            ),
        );
        tracing::warn!(generation_id = %id, "Generation aborted by shutdown");
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::PredictionRequest;
    use crate::domain::generation::{GenerationStatus, PredictionState, PredictionStatus};
    use crate::infrastructure::adapters::FakePredictionClient;
    use crate::infrastructure::memory::InMemoryProgressStore;
    use tokio::time::Instant;

    struct Harness {
        client: Arc<FakePredictionClient>,
        store: Arc<InMemoryProgressStore>,
        waiter: PredictionWaiter,
        shutdown: CancellationToken,
    }

    fn harness(script: Vec<PredictionStatus>) -> Harness {
        let client = Arc::new(FakePredictionClient::with_script(script));
        let store = Arc::new(InMemoryProgressStore::new());
        let shutdown = CancellationToken::new();
        let waiter = PredictionWaiter::new(
            client.clone(),
            store.clone(),
            WaiterConfig::default(),
            shutdown.clone(),
        );
        Harness {
            client,
            store,
            waiter,
            shutdown,
        }
    }

    async fn submit(client: &FakePredictionClient) -> PredictionHandle {
        client
            .submit(PredictionRequest {
                model: "acme/model".to_string(),
                input: serde_json::json!({}),
            })
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_five_processing_polls() {
        let mut script = vec![PredictionStatus::processing(); 5];
        script.push(PredictionStatus::succeeded(["http://x/1.png"]));
        let h = harness(script);
        let id = GenerationId::new();
        let handle = submit(&h.client).await;

        let images = h.waiter.wait(&id, &handle).await.unwrap();

        assert_eq!(images, vec!["http://x/1.png".to_string()]);
        assert_eq!(h.client.poll_count(), 6);
        let record = h.store.get(&id).unwrap();
        assert_eq!(record.status, GenerationStatus::Complete);
        assert_eq!(record.progress, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_exactly_at_max_attempts() {
        let h = harness(vec![PredictionStatus::processing()]);
        let id = GenerationId::new();
        let handle = submit(&h.client).await;

        let started = Instant::now();
        let err = h.waiter.wait(&id, &handle).await.unwrap_err();

        assert_eq!(err, GenerationError::TimedOut);
        assert_eq!(h.client.poll_count(), 30);
        // 29 个间隔，最后一次查询后不再等待
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(58));
        assert!(elapsed < Duration::from_secs(60));

        let record = h.store.get(&id).unwrap();
        assert_eq!(record.status, GenerationStatus::Error);
        assert_eq!(record.progress, 100);
        assert_eq!(record.message, "Generation timed out");
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeded_with_empty_output_fails() {
        let h = harness(vec![PredictionStatus::succeeded(Vec::<String>::new())]);
        let id = GenerationId::new();
        let handle = submit(&h.client).await;

        let err = h.waiter.wait(&id, &handle).await.unwrap_err();

        assert_eq!(err, GenerationError::InvalidResponse);
        assert_eq!(h.client.poll_count(), 1);
        assert_eq!(h.store.get(&id).unwrap().status, GenerationStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_urls_only_fails() {
        let h = harness(vec![PredictionStatus::succeeded(["", "not-a-url"])]);
        let id = GenerationId::new();
        let handle = submit(&h.client).await;

        let err = h.waiter.wait(&id, &handle).await.unwrap_err();
        assert_eq!(err, GenerationError::NoValidImages);
        assert_eq!(
            h.store.get(&id).unwrap().message,
            "No valid images were generated"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_failure_message_propagates() {
        let h = harness(vec![
            PredictionStatus::new(PredictionState::Starting),
            PredictionStatus::processing(),
            PredictionStatus::failed(Some("model crashed")),
        ]);
        let id = GenerationId::new();
        let handle = submit(&h.client).await;

        let err = h.waiter.wait(&id, &handle).await.unwrap_err();

        assert_eq!(err, GenerationError::Failed("model crashed".to_string()));
        assert_eq!(h.client.poll_count(), 3);
        let record = h.store.get(&id).unwrap();
        assert_eq!(record.status, GenerationStatus::Error);
        assert_eq!(record.progress, attempt_progress(2, 30));
        assert_eq!(record.message, "model crashed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_check_failure_is_terminal() {
        let h = harness(vec![PredictionStatus::processing()]);
        let id = GenerationId::new();

        let err = h
            .waiter
            .wait(&id, &PredictionHandle::new("missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::StatusCheck(_)));
        assert_eq!(h.store.get(&id).unwrap().status, GenerationStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_waiting() {
        let h = harness(vec![PredictionStatus::processing()]);
        let id = GenerationId::new();
        let handle = submit(&h.client).await;

        let shutdown = h.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            shutdown.cancel();
        });

        let err = h.waiter.wait(&id, &handle).await.unwrap_err();

        assert_eq!(err, GenerationError::Aborted);
        assert!(h.client.poll_count() < 30);
        let record = h.store.get(&id).unwrap();
        assert_eq!(record.status, GenerationStatus::Error);
        assert_eq!(record.message, "Generation aborted: server shutting down");
    }
}

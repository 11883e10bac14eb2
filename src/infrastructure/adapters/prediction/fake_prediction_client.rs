//! Fake Prediction Client - 用于本地开发和测试的预测服务
//!
//! 按脚本依次返回状态，脚本用完后重复最后一个，不实际调用外部服务。
//! 返回终态后即忘记该任务

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::application::ports::{
    PredictionError, PredictionHandle, PredictionRequest, PredictionServicePort,
};
use crate::domain::generation::{PredictionState, PredictionStatus};

/// Fake Prediction Client 配置
#[derive(Debug, Clone)]
pub struct FakePredictionClientConfig {
    /// 每次 get_status 依次返回的状态
    pub script: Vec<PredictionStatus>,
    /// 设置后 submit 始终失败
    pub submit_error: Option<String>,
    /// 模拟网络延迟
    pub latency: Duration,
}

impl Default for FakePredictionClientConfig {
    fn default() -> Self {
        Self {
            script: vec![
                PredictionStatus::new(PredictionState::Starting),
                PredictionStatus::processing(),
                PredictionStatus::processing(),
                PredictionStatus::succeeded([
                    "https://placehold.co/1024x1024.png?text=pixmorph+1",
                    "https://placehold.co/1024x1024.png?text=pixmorph+2",
                ]),
            ],
            submit_error: None,
            latency: Duration::from_millis(50),
        }
    }
}

/// Fake Prediction Client
pub struct FakePredictionClient {
    config: FakePredictionClientConfig,
    /// handle id -> 已轮询次数，只保留未结束的任务
    polls: DashMap<String, u32>,
    total_polls: AtomicU32,
    submissions: AtomicU32,
}

impl FakePredictionClient {
    pub fn new(config: FakePredictionClientConfig) -> Self {
        tracing::info!(
            script_len = config.script.len(),
            submit_fails = config.submit_error.is_some(),
            "FakePredictionClient initialized"
        );
        Self {
            config,
            polls: DashMap::new(),
            total_polls: AtomicU32::new(0),
            submissions: AtomicU32::new(0),
        }
    }

    /// 使用给定脚本、零延迟创建
    pub fn with_script(script: Vec<PredictionStatus>) -> Self {
        Self::new(FakePredictionClientConfig {
            script,
            submit_error: None,
            latency: Duration::ZERO,
        })
    }

    /// submit 总是失败
    pub fn failing_submit(message: impl Into<String>) -> Self {
        Self::new(FakePredictionClientConfig {
            script: Vec::new(),
            submit_error: Some(message.into()),
            latency: Duration::ZERO,
        })
    }

    /// 所有任务累计轮询次数
    pub fn poll_count(&self) -> u32 {
        self.total_polls.load(Ordering::SeqCst)
    }

    /// 尚未结束的任务数
    pub fn tracked(&self) -> usize {
        self.polls.len()
    }

    pub fn submit_count(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }
}

#[async_trait]
impl PredictionServicePort for FakePredictionClient {
    async fn submit(&self, request: PredictionRequest) -> Result<PredictionHandle, PredictionError> {
        self.simulate_latency().await;
        self.submissions.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.config.submit_error {
            return Err(PredictionError::ServiceError(message.clone()));
        }

        let handle = PredictionHandle::new(format!("fake-{}", uuid::Uuid::new_v4().simple()));
        self.polls.insert(handle.id.clone(), 0);

        tracing::debug!(
            prediction_id = %handle.id,
            model = %request.model,
            "FakePredictionClient: prediction accepted"
        );
        Ok(handle)
    }

    async fn get_status(&self, handle: &PredictionHandle) -> Result<PredictionStatus, PredictionError> {
        self.simulate_latency().await;

        let index = {
            let mut polls = self.polls.get_mut(&handle.id).ok_or_else(|| {
                PredictionError::ServiceError(format!("Prediction not found: {}", handle.id))
            })?;
            let index = *polls;
            *polls += 1;
            index as usize
        };
        self.total_polls.fetch_add(1, Ordering::SeqCst);

        let status = self
            .config
            .script
            .get(index)
            .or_else(|| self.config.script.last())
            .cloned()
            .unwrap_or_else(PredictionStatus::processing);

        if status.state.is_finished() {
            self.polls.remove(&handle.id);
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> PredictionRequest {
        PredictionRequest {
            model: "acme/model".to_string(),
            input: json!({}),
        }
    }

    #[tokio::test]
    async fn test_script_replays_and_repeats_last() {
        let client = FakePredictionClient::with_script(vec![
            PredictionStatus::new(PredictionState::Starting),
            PredictionStatus::processing(),
        ]);
        let handle = client.submit(request()).await.unwrap();

        let first = client.get_status(&handle).await.unwrap();
        assert_eq!(first.state, PredictionState::Starting);
        for _ in 0..3 {
            let next = client.get_status(&handle).await.unwrap();
            assert_eq!(next.state, PredictionState::Processing);
        }
        assert_eq!(client.poll_count(), 4);
        assert_eq!(client.submit_count(), 1);
        assert_eq!(client.tracked(), 1);
    }

    #[tokio::test]
    async fn test_finished_prediction_is_forgotten() {
        let client = FakePredictionClient::with_script(vec![
            PredictionStatus::processing(),
            PredictionStatus::succeeded(["http://x/1.png"]),
        ]);
        for _ in 0..3 {
            let handle = client.submit(request()).await.unwrap();
            client.get_status(&handle).await.unwrap();
            assert_eq!(client.tracked(), 1);

            let done = client.get_status(&handle).await.unwrap();
            assert_eq!(done.state, PredictionState::Succeeded);
            assert_eq!(client.tracked(), 0);
            assert!(client.get_status(&handle).await.is_err());
        }
        assert_eq!(client.poll_count(), 6);
    }

    #[tokio::test]
    async fn test_failing_submit() {
        let client = FakePredictionClient::failing_submit("quota exceeded");
        let err = client.submit(request()).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let client = FakePredictionClient::with_script(vec![]);
        let result = client.get_status(&PredictionHandle::new("nope")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_handles_are_scripted_independently() {
        let client = FakePredictionClient::with_script(vec![
            PredictionStatus::processing(),
            PredictionStatus::succeeded(["http://x/1.png"]),
        ]);
        let a = client.submit(request()).await.unwrap();
        let b = client.submit(request()).await.unwrap();

        client.get_status(&a).await.unwrap();
        let b_first = client.get_status(&b).await.unwrap();
        assert_eq!(b_first.state, PredictionState::Processing);
    }
}

//! Prediction Service Port - 外部图像生成服务抽象
//!
//! 协议：submit 提交任务 -> get_status 轮询 -> 终态结果或失败。
//! 具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::generation::PredictionStatus;

/// 预测服务错误
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid model reference: {0}")]
    InvalidModel(String),
}

/// 提交请求
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    /// 模型引用：`owner/name` 或 `owner/name:version`
    pub model: String,
    /// 模型输入
    pub input: Value,
}

/// 外部任务句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionHandle {
    pub id: String,
}

impl PredictionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Prediction Service Port
#[async_trait]
pub trait PredictionServicePort: Send + Sync {
    /// 提交一次生成任务
    async fn submit(&self, request: PredictionRequest) -> Result<PredictionHandle, PredictionError>;

    /// 查询任务当前状态
    async fn get_status(&self, handle: &PredictionHandle) -> Result<PredictionStatus, PredictionError>;
}

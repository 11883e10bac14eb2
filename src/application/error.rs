//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::domain::generation::{GenerationError, GenerationId};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 验证错误（不会创建任务）
    #[error("{0}")]
    ValidationError(String),

    /// 外部服务错误（提交阶段失败）
    #[error("{0}")]
    ExternalServiceError(String),

    /// 生成失败（轮询阶段的任何终态失败）
    #[error("{source}")]
    GenerationFailed {
        generation_id: GenerationId,
        source: GenerationError,
    },

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 关联的 generation id（如果任务已创建）
    pub fn generation_id(&self) -> Option<&GenerationId> {
        match self {
            Self::GenerationFailed { generation_id, .. } => Some(generation_id),
            _ => None,
        }
    }
}

//! Generation Context - Errors

use thiserror::Error;

/// 生成失败
///
/// Display 文本会原样返回给提交请求的客户端，同时写入进度记录
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Failed(String),

    #[error("{0}")]
    Canceled(String),

    #[error("Generation timed out")]
    TimedOut,

    #[error("Invalid response format")]
    InvalidResponse,

    #[error("No valid images were generated")]
    NoValidImages,

    #[error("Failed to check generation status: {0}")]
    StatusCheck(String),

    #[error("Generation aborted: server shutting down")]
    Aborted,
}

//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（ProgressStore、PredictionService）
//! - commands: CQRS 命令及处理器（提交生成）
//! - queries: CQRS 查询及处理器（进度推送、转换列表）
//! - services: 跨请求的后台逻辑（轮询等待、延迟清理）
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;

// Re-exports
pub use commands::{handlers::GenerateHandler, GenerateCommand, GenerateResponse};

pub use error::ApplicationError;

pub use ports::{
    // Prediction service
    PredictionError,
    PredictionHandle,
    PredictionRequest,
    PredictionServicePort,
    // Progress store
    ProgressStorePort,
};

pub use queries::{
    handlers::{
        ListTransformationsHandler, ProgressStreamConfig, StreamProgressHandler,
        TransformationSummary,
    },
    ListTransformations, StreamProgress,
};

pub use services::{DeferredCleanup, PredictionWaiter, WaiterConfig};

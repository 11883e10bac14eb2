//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod prediction_service;
mod progress_store;

pub use prediction_service::{
    PredictionError, PredictionHandle, PredictionRequest, PredictionServicePort,
};
pub use progress_store::ProgressStorePort;

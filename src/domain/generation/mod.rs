//! Generation Context - 生成任务限界上下文
//!
//! 职责:
//! - 生成任务标识与进度记录
//! - 外部预测服务状态到本地进度的映射（纯状态机）
//! - 生成失败分类

mod errors;
mod transition;
mod value_objects;

pub use errors::GenerationError;
pub use transition::{attempt_progress, evaluate_poll, filter_image_urls, timed_out, PollOutcome};
pub use value_objects::{
    GenerationId, GenerationStatus, PredictionState, PredictionStatus, ProgressRecord,
};

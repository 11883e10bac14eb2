//! 应用层 - 服务
//!
//! 生成流程中跨请求存活的后台逻辑：外部任务轮询与进度记录的延迟清理

mod deferred_cleanup;
mod prediction_waiter;

pub use deferred_cleanup::DeferredCleanup;
pub use prediction_waiter::{PredictionWaiter, WaiterConfig};

//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod progress_queries;
mod transformation_queries;

pub mod handlers;

pub use progress_queries::*;
pub use transformation_queries::*;

//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Generation Context: 生成任务的进度记录与外部状态映射
//! - Transformation Context: 风格转换目录

pub mod generation;
pub mod transformation;

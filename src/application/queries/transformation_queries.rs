//! Transformation Queries

/// 列出所有可用的风格转换
#[derive(Debug, Clone)]
pub struct ListTransformations;

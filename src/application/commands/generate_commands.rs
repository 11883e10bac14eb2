//! Generation Commands - 图像生成命令

use crate::domain::generation::GenerationId;

/// 提交图像生成命令
#[derive(Debug, Clone)]
pub struct GenerateCommand {
    /// data URL 或 https URL
    pub image: Option<String>,
    /// 转换标识
    pub transformation: Option<String>,
}

/// 生成成功响应
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub generation_id: GenerationId,
    pub images: Vec<String>,
}

//! Progress Queries - 生成进度查询

use crate::domain::generation::GenerationId;

/// 订阅某个 generation 的进度推送
#[derive(Debug, Clone)]
pub struct StreamProgress {
    pub generation_id: GenerationId,
}

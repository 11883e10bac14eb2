//! Progress Store Port - 生成进度登记表
//!
//! 定义进度记录存取的抽象接口，具体实现在 infrastructure/memory 层

use crate::domain::generation::{GenerationId, ProgressRecord};

/// Progress Store Port
///
/// generation_id -> 当前进度记录，进程内唯一，重启即丢失。
/// 每个 id 最多一条记录，写入为 last-write-wins。
pub trait ProgressStorePort: Send + Sync {
    /// 插入或覆盖记录
    fn set(&self, id: &GenerationId, record: ProgressRecord);

    /// 读取记录，不存在时返回 None（不是错误）
    fn get(&self, id: &GenerationId) -> Option<ProgressRecord>;

    /// 删除记录，返回是否真的删除了；不存在时为 no-op
    fn delete(&self, id: &GenerationId) -> bool;

    /// 当前记录数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

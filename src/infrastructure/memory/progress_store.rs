//! In-Memory Progress Store Implementation

use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::ProgressStorePort;
use crate::domain::generation::{GenerationId, ProgressRecord};

/// 内存进度存储
///
/// 进程启动时创建一次，随进程退出销毁
pub struct InMemoryProgressStore {
    /// generation_id -> ProgressRecord
    records: DashMap<GenerationId, ProgressRecord>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemoryProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStorePort for InMemoryProgressStore {
    fn set(&self, id: &GenerationId, record: ProgressRecord) {
        tracing::debug!(
            generation_id = %id,
            status = record.status.as_str(),
            progress = record.progress,
            "Progress updated"
        );
        self.records.insert(id.clone(), record);
    }

    fn get(&self, id: &GenerationId) -> Option<ProgressRecord> {
        self.records.get(id).map(|r| r.clone())
    }

    fn delete(&self, id: &GenerationId) -> bool {
        let removed = self.records.remove(id).is_some();
        if removed {
            tracing::debug!(generation_id = %id, "Progress record removed");
        }
        removed
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::GenerationStatus;

    #[test]
    fn test_record_lifecycle() {
        let store = InMemoryProgressStore::new();
        let id = GenerationId::new();

        store.set(&id, ProgressRecord::starting());
        assert_eq!(store.get(&id), Some(ProgressRecord::starting()));

        // 覆盖写
        let done = ProgressRecord::new(GenerationStatus::Complete, 100, "done");
        store.set(&id, done.clone());
        assert_eq!(store.get(&id), Some(done));
        assert_eq!(store.len(), 1);

        assert!(store.delete(&id));
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_unknown_is_absent() {
        let store = InMemoryProgressStore::new();
        assert!(store.get(&GenerationId::new()).is_none());
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let store = InMemoryProgressStore::new();
        let id = GenerationId::new();
        assert!(!store.delete(&id));
        assert!(!store.delete(&id));
    }

    #[test]
    fn test_ids_are_independent() {
        let store = InMemoryProgressStore::new();
        let a = GenerationId::new();
        let b = GenerationId::new();

        store.set(&a, ProgressRecord::starting());
        store.set(&b, ProgressRecord::submitted());
        store.delete(&a);

        assert!(store.get(&a).is_none());
        assert_eq!(store.get(&b), Some(ProgressRecord::submitted()));
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let store = Arc::new(InMemoryProgressStore::new());
        let mut handles = Vec::new();

        for i in 0..16u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = GenerationId::new();
                store.set(&id, ProgressRecord::new(GenerationStatus::Processing, i, "p"));
                id
            }));
        }

        for handle in handles {
            let id = handle.await.unwrap();
            assert!(store.get(&id).is_some());
        }
        assert_eq!(store.len(), 16);
    }
}

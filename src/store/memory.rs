/// 内存存储实现
///
/// 用于测试，以及缓存目录不可用时的降级存储（进程退出即丢失）
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{LocalStore, StoreError, StoredRecord};

/// 内存键值存储
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前所有键（排序后返回）
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|key, _| !key.starts_with(prefix));
        Ok(before - records.len())
    }
}

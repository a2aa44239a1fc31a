/// 持久化本地存储模块
///
/// 跨页面重载保留的异步键值存储，保存邮箱列表、邮件列表分页与邮件详情的缓存记录。
/// 同一 origin 下的所有标签页共享同一个存储，不加跨标签页锁，按键"最后写入者胜出"。
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("本地存储 IO 失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("本地存储序列化失败: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("本地存储不可用: {0}")]
    Unavailable(String),
}

/// 存储中的一条原始记录
///
/// `payload` 保持为未解释的 JSON，类型化由上层 [`crate::cache::CacheManager`] 负责
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// 资源键，例如 `email-detail:abc`
    pub key: String,

    /// 缓存内容
    pub payload: serde_json::Value,

    /// 拉取时间
    pub fetched_at: DateTime<Utc>,
}

impl StoredRecord {
    pub fn new(key: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            payload,
            fetched_at: Utc::now(),
        }
    }
}

/// 本地键值存储
///
/// 实现必须保证单键写入的原子性：读者要么看到旧记录，要么看到完整的新记录
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// 读取一条记录，不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// 整体覆盖写入（不做合并）
    async fn put(&self, record: StoredRecord) -> Result<(), StoreError>;

    /// 删除一条记录，不存在时视为成功
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// 删除所有以 `prefix` 开头的记录，返回删除数量
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError>;
}

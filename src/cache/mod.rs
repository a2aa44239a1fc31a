/// 缓存管理模块
///
/// 在 [`LocalStore`] 之上提供按资源类型区分的读 / 写 / 失效操作。
///
/// 约定：
/// - 未命中返回 `None`，永远不返回错误
/// - 写入整体覆盖，不做字段合并
/// - 存储层失败（不可用、配额不足、数据损坏）一律降级为未命中，只记录日志
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

use crate::mail::types::{EmailDetail, EmailListPage, EmailSummary, Mailbox};
use crate::store::{LocalStore, StoredRecord};

/// 邮件列表键前缀
const EMAIL_LIST_PREFIX: &str = "email-list:";

/// 第一页在键中的占位符
const FIRST_PAGE: &str = "first";

/// 缓存资源标识
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `mailbox-list`
    MailboxList,

    /// `email-list:{mailboxId}:{pageToken|first}`
    EmailList {
        mailbox_id: String,
        page_token: Option<String>,
    },

    /// `email-detail:{emailId}`
    EmailDetail(String),
}

impl CacheKey {
    pub fn email_list(mailbox_id: &str, page_token: Option<&str>) -> Self {
        Self::EmailList {
            mailbox_id: mailbox_id.to_string(),
            page_token: page_token.map(str::to_string),
        }
    }

    pub fn email_detail(id: &str) -> Self {
        Self::EmailDetail(id.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MailboxList => f.write_str("mailbox-list"),
            Self::EmailList {
                mailbox_id,
                page_token,
            } => write!(
                f,
                "{}{}:{}",
                EMAIL_LIST_PREFIX,
                mailbox_id,
                page_token.as_deref().unwrap_or(FIRST_PAGE)
            ),
            Self::EmailDetail(id) => write!(f, "email-detail:{}", id),
        }
    }
}

/// 类型化的缓存条目
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub fetched_at: DateTime<Utc>,
}

/// 缓存管理器
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn LocalStore>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// 读取并反序列化；任何失败都视为未命中
    async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let key = key.to_string();

        let record = match self.store.get(&key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("缓存未命中: {}", key);
                return None;
            }
            Err(e) => {
                tracing::warn!("⚠️ 读取本地缓存失败，按未命中处理 {}: {}", key, e);
                return None;
            }
        };

        if record.key != key {
            tracing::warn!("⚠️ 缓存记录键不一致（{} != {}），丢弃", record.key, key);
            self.remove(&key).await;
            return None;
        }

        match serde_json::from_value::<T>(record.payload) {
            Ok(payload) => {
                tracing::debug!("缓存命中: {} (拉取于 {})", key, record.fetched_at);
                Some(CacheEntry {
                    key,
                    payload,
                    fetched_at: record.fetched_at,
                })
            }
            Err(e) => {
                tracing::warn!("⚠️ 缓存内容格式错误，丢弃 {}: {}", key, e);
                self.remove(&key).await;
                None
            }
        }
    }

    /// 序列化并整体写入；失败只记录日志
    async fn write<T: Serialize + ?Sized>(&self, key: &CacheKey, payload: &T) {
        let key = key.to_string();

        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("⚠️ 序列化缓存内容失败 {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.put(StoredRecord::new(key.clone(), value)).await {
            tracing::warn!("⚠️ 写入本地缓存失败 {}: {}", key, e);
        } else {
            tracing::debug!("缓存已写入: {}", key);
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!("⚠️ 删除本地缓存失败 {}: {}", key, e);
        }
    }

    pub async fn get_mailboxes(&self) -> Option<CacheEntry<Vec<Mailbox>>> {
        self.read(&CacheKey::MailboxList).await
    }

    pub async fn put_mailboxes(&self, list: &[Mailbox]) {
        self.write(&CacheKey::MailboxList, list).await
    }

    pub async fn get_email_list(
        &self,
        mailbox_id: &str,
        page_token: Option<&str>,
    ) -> Option<CacheEntry<EmailListPage>> {
        self.read(&CacheKey::email_list(mailbox_id, page_token))
            .await
    }

    /// 写入一页邮件列表，`next_page_token` 作为分页元数据一并保存
    pub async fn put_email_list(
        &self,
        mailbox_id: &str,
        page_token: Option<&str>,
        items: &[EmailSummary],
        next_page_token: Option<&str>,
    ) {
        let page = EmailListPage {
            items: items.to_vec(),
            next_page_token: next_page_token.map(str::to_string),
        };
        self.write(&CacheKey::email_list(mailbox_id, page_token), &page)
            .await
    }

    pub async fn get_email_detail(&self, id: &str) -> Option<CacheEntry<EmailDetail>> {
        self.read(&CacheKey::email_detail(id)).await
    }

    pub async fn put_email_detail(&self, id: &str, detail: &EmailDetail) {
        self.write(&CacheKey::email_detail(id), detail).await
    }

    /// 失效单封邮件详情
    pub async fn invalidate_email(&self, id: &str) {
        let key = CacheKey::email_detail(id).to_string();
        self.remove(&key).await;
        tracing::debug!("已失效: {}", key);
    }

    /// 失效所有邮箱的所有邮件列表分页
    pub async fn invalidate_all_email_lists(&self) {
        match self.store.delete_prefix(EMAIL_LIST_PREFIX).await {
            Ok(count) => tracing::debug!("已失效 {} 个邮件列表分页", count),
            Err(e) => tracing::warn!("⚠️ 失效邮件列表缓存失败: {}", e),
        }
    }

    /// 失效邮箱列表（未读数随之过期）
    pub async fn invalidate_mailboxes(&self) {
        self.remove(&CacheKey::MailboxList.to_string()).await;
        tracing::debug!("已失效: mailbox-list");
    }
}

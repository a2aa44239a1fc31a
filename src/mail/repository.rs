/// 邮件数据仓库（先缓存、后台刷新）
///
/// 读取策略：
/// - 邮箱列表、邮件列表第一页、邮件详情：缓存命中立即返回，同时在后台拉取最新数据覆盖缓存；
///   未命中则同步拉取并写入缓存，失败直接返回错误
/// - 第二页及之后：总是实时拉取，失败时仅当该页有缓存才回退
///
/// 写操作总是先请求服务端，成功后按下表失效相关缓存（不在本地修改缓存内容）：
///
/// | 操作 | 失效 |
/// |---|---|
/// | 发送 | 所有邮件列表 |
/// | 回复 | 该邮件详情 + 所有邮件列表 |
/// | 转发 | 所有邮件列表 |
/// | 加星 / 已读 / 删除 | 该邮件详情 + 所有邮件列表 + 邮箱列表 |
use std::future::Future;
use std::sync::Arc;

use super::api::MailApi;
use super::types::{EmailDetail, EmailListPage, Mailbox, ModifyAction, OutgoingEmail, ReplyBody};
use crate::cache::CacheManager;
use crate::transport::ApiError;

#[derive(Clone)]
pub struct MailRepository {
    api: Arc<MailApi>,
    cache: CacheManager,
}

impl MailRepository {
    pub fn new(api: Arc<MailApi>, cache: CacheManager) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn api(&self) -> &Arc<MailApi> {
        &self.api
    }

    pub async fn get_mailboxes(&self) -> Result<Vec<Mailbox>, ApiError> {
        if let Some(entry) = self.cache.get_mailboxes().await {
            let (api, cache) = (self.api.clone(), self.cache.clone());
            revalidate("mailbox-list".to_string(), async move {
                let list = api.list_mailboxes().await?;
                cache.put_mailboxes(&list).await;
                Ok(())
            });
            return Ok(entry.payload);
        }

        let list = self.api.list_mailboxes().await?;
        self.cache.put_mailboxes(&list).await;
        Ok(list)
    }

    /// 获取邮件列表；`page_token` 为空表示第一页
    pub async fn get_email_list(
        &self,
        mailbox_id: &str,
        page_token: Option<&str>,
    ) -> Result<EmailListPage, ApiError> {
        match page_token {
            None => self.first_page(mailbox_id).await,
            Some(token) => self.later_page(mailbox_id, token).await,
        }
    }

    async fn first_page(&self, mailbox_id: &str) -> Result<EmailListPage, ApiError> {
        if let Some(entry) = self.cache.get_email_list(mailbox_id, None).await {
            let (api, cache) = (self.api.clone(), self.cache.clone());
            let mailbox = mailbox_id.to_string();
            revalidate(format!("email-list:{}", mailbox_id), async move {
                let page = api.list_emails(&mailbox, None).await?;
                store_page(&cache, &mailbox, None, &page).await;
                Ok(())
            });
            return Ok(entry.payload);
        }

        let page = self.api.list_emails(mailbox_id, None).await?;
        store_page(&self.cache, mailbox_id, None, &page).await;
        Ok(page)
    }

    async fn later_page(&self, mailbox_id: &str, token: &str) -> Result<EmailListPage, ApiError> {
        match self.api.list_emails(mailbox_id, Some(token)).await {
            Ok(page) => {
                store_page(&self.cache, mailbox_id, Some(token), &page).await;
                Ok(page)
            }
            Err(e) => match self.cache.get_email_list(mailbox_id, Some(token)).await {
                Some(entry) => {
                    tracing::warn!(
                        "⚠️ 拉取 {} 第 {} 页失败，使用缓存: {}",
                        mailbox_id,
                        token,
                        e
                    );
                    Ok(entry.payload)
                }
                None => Err(e),
            },
        }
    }

    pub async fn get_email_detail(&self, id: &str) -> Result<EmailDetail, ApiError> {
        if let Some(entry) = self.cache.get_email_detail(id).await {
            let (api, cache) = (self.api.clone(), self.cache.clone());
            let email_id = id.to_string();
            revalidate(format!("email-detail:{}", id), async move {
                let detail = api.get_email(&email_id).await?;
                cache.put_email_detail(&email_id, &detail).await;
                Ok(())
            });
            return Ok(entry.payload);
        }

        let detail = self.api.get_email(id).await?;
        self.cache.put_email_detail(id, &detail).await;
        Ok(detail)
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), ApiError> {
        self.api.send(email).await?;
        self.cache.invalidate_all_email_lists().await;
        Ok(())
    }

    pub async fn reply(&self, id: &str, reply: &ReplyBody) -> Result<(), ApiError> {
        self.api.reply(id, reply).await?;
        self.cache.invalidate_email(id).await;
        self.cache.invalidate_all_email_lists().await;
        Ok(())
    }

    pub async fn forward(&self, id: &str, forward: &ReplyBody) -> Result<(), ApiError> {
        self.api.forward(id, forward).await?;
        self.cache.invalidate_all_email_lists().await;
        Ok(())
    }

    pub async fn modify(&self, id: &str, action: ModifyAction) -> Result<(), ApiError> {
        self.api.modify(id, action).await?;
        self.cache.invalidate_email(id).await;
        self.cache.invalidate_all_email_lists().await;
        self.cache.invalidate_mailboxes().await;
        Ok(())
    }
}

async fn store_page(
    cache: &CacheManager,
    mailbox_id: &str,
    page_token: Option<&str>,
    page: &EmailListPage,
) {
    cache
        .put_email_list(
            mailbox_id,
            page_token,
            &page.items,
            page.next_page_token.as_deref(),
        )
        .await
}

/// 后台刷新任务：不可取消，调用方不等待；任何错误只记录日志
fn revalidate<F>(label: String, task: F)
where
    F: Future<Output = Result<(), ApiError>> + Send + 'static,
{
    tokio::spawn(async move {
        match task.await {
            Ok(()) => tracing::debug!("后台刷新完成: {}", label),
            Err(e) => tracing::warn!("⚠️ 后台刷新 {} 失败，保留旧缓存: {}", label, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{BrokenStore, detail, mailbox, summary};
    use crate::store::MemoryStore;
    use crate::transport::tests::{Fixture, fixture};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn repository(f: &Fixture) -> MailRepository {
        MailRepository::new(
            Arc::new(MailApi::new(f.transport.clone())),
            CacheManager::new(Arc::new(MemoryStore::new())),
        )
    }

    fn envelope(data: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": data}))
    }

    async fn wait_until<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("条件未在超时前满足");
    }

    #[tokio::test]
    async fn test_cached_mailboxes_returned_without_waiting_for_network() {
        let f = fixture().await;
        let repo = repository(&f);
        repo.cache().put_mailboxes(&[mailbox("cached")]).await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .respond_with(envelope(json!([{"id": "live"}])).set_delay(Duration::from_secs(3)))
            .mount(&f.server)
            .await;

        let list = tokio::time::timeout(Duration::from_millis(500), repo.get_mailboxes())
            .await
            .expect("缓存读取不应等待网络")
            .unwrap();
        assert_eq!(list[0].id, "cached");
    }

    #[tokio::test]
    async fn test_background_revalidation_overwrites_cache() {
        let f = fixture().await;
        let repo = repository(&f);
        repo.cache().put_mailboxes(&[mailbox("cached")]).await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .respond_with(envelope(json!([{"id": "live"}])))
            .mount(&f.server)
            .await;

        assert_eq!(repo.get_mailboxes().await.unwrap()[0].id, "cached");

        let cache = repo.cache().clone();
        wait_until(|| {
            let cache = cache.clone();
            async move { cache.get_mailboxes().await.unwrap().payload[0].id == "live" }
        })
        .await;

        assert_eq!(repo.get_mailboxes().await.unwrap()[0].id, "live");
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_stale_entry() {
        let f = fixture().await;
        let repo = repository(&f);
        repo.cache()
            .put_email_list("INBOX", None, &[summary("e1")], None)
            .await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes/INBOX/emails"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&f.server)
            .await;

        let page = repo.get_email_list("INBOX", None).await.unwrap();
        assert_eq!(page.items[0].id, "e1");

        tokio::time::sleep(Duration::from_millis(200)).await;
        let cached = repo.cache().get_email_list("INBOX", None).await.unwrap();
        assert_eq!(cached.payload.items[0].id, "e1");
    }

    #[tokio::test]
    async fn test_miss_fetches_live_and_populates_cache() {
        let f = fixture().await;
        let repo = repository(&f);

        Mock::given(method("GET"))
            .and(path("/mail/emails/e1"))
            .respond_with(envelope(json!({"id": "e1", "body": "hello"})))
            .expect(1)
            .mount(&f.server)
            .await;

        assert_eq!(repo.get_email_detail("e1").await.unwrap(), detail("e1"));
        assert_eq!(
            repo.cache().get_email_detail("e1").await.unwrap().payload,
            detail("e1")
        );
    }

    #[tokio::test]
    async fn test_miss_with_failed_fetch_propagates() {
        let f = fixture().await;
        let repo = repository(&f);

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&f.server)
            .await;

        assert!(matches!(
            repo.get_mailboxes().await,
            Err(ApiError::Status { .. })
        ));
    }

    #[tokio::test]
    async fn test_later_pages_fall_back_only_to_exact_token() {
        let f = fixture().await;
        let repo = repository(&f);
        repo.cache()
            .put_email_list("INBOX", Some("p2"), &[summary("old")], Some("p3"))
            .await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes/INBOX/emails"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&f.server)
            .await;

        let page = repo.get_email_list("INBOX", Some("p2")).await.unwrap();
        assert_eq!(page.items[0].id, "old");
        assert_eq!(page.next_page_token.as_deref(), Some("p3"));

        assert!(repo.get_email_list("INBOX", Some("p9")).await.is_err());
    }

    #[tokio::test]
    async fn test_later_pages_prefer_live_data() {
        let f = fixture().await;
        let repo = repository(&f);
        repo.cache()
            .put_email_list("INBOX", Some("p2"), &[summary("old")], None)
            .await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes/INBOX/emails"))
            .and(query_param("pageToken", "p2"))
            .respond_with(envelope(json!({"items": [{"id": "new"}]})))
            .expect(1)
            .mount(&f.server)
            .await;

        let page = repo.get_email_list("INBOX", Some("p2")).await.unwrap();
        assert_eq!(page.items[0].id, "new");
        assert_eq!(
            repo.cache()
                .get_email_list("INBOX", Some("p2"))
                .await
                .unwrap()
                .payload
                .items[0]
                .id,
            "new"
        );
    }

    async fn seed(repo: &MailRepository) {
        let cache = repo.cache();
        cache.put_mailboxes(&[mailbox("INBOX")]).await;
        cache
            .put_email_list("INBOX", None, &[summary("e1")], Some("p2"))
            .await;
        cache
            .put_email_list("SENT", Some("p2"), &[summary("e2")], None)
            .await;
        cache.put_email_detail("e1", &detail("e1")).await;
        cache.put_email_detail("e2", &detail("e2")).await;
    }

    async fn lists_empty(repo: &MailRepository) -> bool {
        repo.cache().get_email_list("INBOX", None).await.is_none()
            && repo.cache().get_email_list("SENT", Some("p2")).await.is_none()
    }

    #[tokio::test]
    async fn test_mutation_invalidation_rules() {
        let f = fixture().await;
        let repo = repository(&f);

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .mount(&f.server)
            .await;

        let reply = ReplyBody {
            to: Vec::new(),
            body: "thanks".into(),
        };

        // 发送：只失效邮件列表
        seed(&repo).await;
        let email = OutgoingEmail {
            to: vec!["a@example.com".into()],
            cc: Vec::new(),
            subject: "s".into(),
            body: "b".into(),
        };
        repo.send(&email).await.unwrap();
        assert!(lists_empty(&repo).await);
        assert!(repo.cache().get_mailboxes().await.is_some());
        assert!(repo.cache().get_email_detail("e1").await.is_some());

        // 回复：该邮件详情 + 邮件列表
        seed(&repo).await;
        repo.reply("e1", &reply).await.unwrap();
        assert!(lists_empty(&repo).await);
        assert!(repo.cache().get_email_detail("e1").await.is_none());
        assert!(repo.cache().get_email_detail("e2").await.is_some());
        assert!(repo.cache().get_mailboxes().await.is_some());

        // 转发：只失效邮件列表
        seed(&repo).await;
        repo.forward("e1", &reply).await.unwrap();
        assert!(lists_empty(&repo).await);
        assert!(repo.cache().get_email_detail("e1").await.is_some());

        // 加星：详情 + 列表 + 邮箱列表
        seed(&repo).await;
        repo.modify("e1", ModifyAction::Star(true)).await.unwrap();
        assert!(lists_empty(&repo).await);
        assert!(repo.cache().get_email_detail("e1").await.is_none());
        assert!(repo.cache().get_mailboxes().await.is_none());
        assert!(repo.cache().get_email_detail("e2").await.is_some());
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cache_untouched() {
        let f = fixture().await;
        let repo = repository(&f);
        seed(&repo).await;

        Mock::given(method("DELETE"))
            .and(path("/mail/emails/e1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&f.server)
            .await;

        assert!(repo.modify("e1", ModifyAction::Delete).await.is_err());
        assert!(repo.cache().get_email_detail("e1").await.is_some());
        assert!(repo.cache().get_mailboxes().await.is_some());
    }

    #[tokio::test]
    async fn test_broken_store_still_serves_live_data() {
        let f = fixture().await;
        let repo = MailRepository::new(
            Arc::new(MailApi::new(f.transport.clone())),
            CacheManager::new(Arc::new(BrokenStore)),
        );

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .respond_with(envelope(json!([{"id": "INBOX"}])))
            .expect(2)
            .mount(&f.server)
            .await;

        assert_eq!(repo.get_mailboxes().await.unwrap()[0].id, "INBOX");
        assert_eq!(repo.get_mailboxes().await.unwrap()[0].id, "INBOX");
    }
}

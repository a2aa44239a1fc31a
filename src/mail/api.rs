/// 邮件 API 调用模块
///
/// 远端邮箱 / 邮件端点的薄封装，所有请求都经过带刷新拦截的 [`Transport`]。
/// 这里不做任何缓存，缓存策略见 [`MailRepository`](super::repository::MailRepository)。
use serde_json::json;
use std::sync::Arc;

use super::types::{EmailDetail, EmailListPage, Mailbox, ModifyAction, OutgoingEmail, ReplyBody};
use crate::transport::{ApiError, ApiRequest, Transport};

/// 路径参数编码（邮件 ID 可能含 `/`、`+` 等字符）
fn segment(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes()).collect()
}

pub struct MailApi {
    transport: Arc<Transport>,
}

impl MailApi {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub async fn list_mailboxes(&self) -> Result<Vec<Mailbox>, ApiError> {
        self.transport
            .execute_envelope(&ApiRequest::get("/mail/mailboxes"))
            .await
    }

    /// 获取邮件列表的一页；`page_token` 为空表示第一页
    pub async fn list_emails(
        &self,
        mailbox_id: &str,
        page_token: Option<&str>,
    ) -> Result<EmailListPage, ApiError> {
        let mut request = ApiRequest::get(format!("/mail/mailboxes/{}/emails", segment(mailbox_id)));
        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }

        self.transport.execute_envelope(&request).await
    }

    pub async fn get_email(&self, id: &str) -> Result<EmailDetail, ApiError> {
        self.transport
            .execute_envelope(&ApiRequest::get(format!("/mail/emails/{}", segment(id))))
            .await
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), ApiError> {
        let body = serde_json::to_value(email).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.transport
            .execute(&ApiRequest::post("/mail/send").json(body))
            .await?
            .ack()
    }

    pub async fn reply(&self, id: &str, reply: &ReplyBody) -> Result<(), ApiError> {
        self.post_body(format!("/mail/emails/{}/reply", segment(id)), reply)
            .await
    }

    pub async fn forward(&self, id: &str, forward: &ReplyBody) -> Result<(), ApiError> {
        self.post_body(format!("/mail/emails/{}/forward", segment(id)), forward)
            .await
    }

    /// 加星 / 已读 / 删除
    pub async fn modify(&self, id: &str, action: ModifyAction) -> Result<(), ApiError> {
        let request = match action {
            ModifyAction::Star(star) => {
                ApiRequest::post(format!("/mail/emails/{}/modify", segment(id)))
                    .json(json!({ "star": star }))
            }
            ModifyAction::MarkRead(read) => {
                ApiRequest::post(format!("/mail/emails/{}/modify", segment(id)))
                    .json(json!({ "read": read }))
            }
            ModifyAction::Delete => ApiRequest::delete(format!("/mail/emails/{}", segment(id))),
        };

        self.transport.execute(&request).await?.ack()
    }

    /// 开启服务端推送（每个会话调用一次）
    pub async fn start_watch(&self) -> Result<(), ApiError> {
        self.transport
            .execute(&ApiRequest::post("/mail/watch").json(json!({})))
            .await?
            .ack()
    }

    async fn post_body(&self, path: String, body: &ReplyBody) -> Result<(), ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.transport
            .execute(&ApiRequest::post(path).json(body))
            .await?
            .ack()
    }
}

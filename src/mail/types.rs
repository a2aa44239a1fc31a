/// 邮箱与邮件数据结构
///
/// 核心只解释用于缓存键与失效的标识字段（邮箱 ID、邮件 ID），
/// 其余字段通过 `extra` 原样透传给 UI。
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 邮箱（文件夹/标签）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 未读数（由服务端计算）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 邮件列表中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 邮件列表的一页
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailListPage {
    pub items: Vec<EmailSummary>,

    /// 下一页令牌，为空表示最后一页
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// 邮件详情（含正文）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDetail {
    pub id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 服务端统一响应信封 `{status, data}`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,

    #[serde(default)]
    pub message: Option<String>,

    pub data: Option<T>,
}

/// 发送新邮件
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingEmail {
    pub to: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,

    pub subject: String,
    pub body: String,
}

/// 回复 / 转发共用的正文
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyBody {
    /// 转发时的收件人；回复时为空（由服务端根据原邮件推导）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,

    pub body: String,
}

/// 邮件修改操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyAction {
    Star(bool),
    MarkRead(bool),
    Delete,
}

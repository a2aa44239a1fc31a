/// 认证相关数据结构
use serde::{Deserialize, Serialize};

/// 持久化的登录用户
///
/// 存在 StoredUser 只表示"曾经登录过"，不代表当前已授权；
/// 刷新完成前两者可能不一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: String,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// 登录方式（google 等）
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

/// 跨标签页认证消息（只存在于总线上，从不落盘）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthBroadcastMessage {
    Logout,

    Login {
        user: StoredUser,

        /// 存储事件降级通道无法携带 Token，此时为空，
        /// 接收方在下一次请求的 401 处理中自行刷新
        #[serde(
            rename = "accessToken",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        access_token: Option<String>,
    },
}

/// `POST /auth/google/login` 响应
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: StoredUser,
}

/// `POST /auth/refresh` 响应
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

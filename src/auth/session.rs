/// 认证会话
///
/// 负责登录（授权码换 Token）、登出、启动时恢复以及跨标签页同步。
/// 本地状态的变更统一落在 [`AuthState`]，网络调用统一经过 [`Transport`]。
use serde_json::json;
use std::sync::{Arc, Mutex};

use super::broadcast::{AuthChannel, Subscription};
use super::state::AuthState;
use super::token::AccessToken;
use super::types::{AuthBroadcastMessage, LoginResponse, StoredUser};
use crate::transport::{ApiError, ApiRequest, GOOGLE_LOGIN_PATH, LOGOUT_PATH, Transport};

pub struct AuthSession {
    transport: Arc<Transport>,
    channel: Arc<dyn AuthChannel>,
    subscription: Mutex<Option<Subscription>>,
}

impl AuthSession {
    pub fn new(transport: Arc<Transport>, channel: Arc<dyn AuthChannel>) -> Self {
        Self {
            transport,
            channel,
            subscription: Mutex::new(None),
        }
    }

    fn state(&self) -> &Arc<AuthState> {
        self.transport.state()
    }

    pub fn current_user(&self) -> Option<StoredUser> {
        self.state().current_user()
    }

    /// 内存中是否持有 Access Token
    pub fn is_authorized(&self) -> bool {
        self.state().tokens().get().is_some()
    }

    /// 用 OAuth 授权码登录
    ///
    /// 刷新凭据由服务端通过 Set-Cookie 写入共享 Cookie 罐
    pub async fn login_with_code(&self, code: &str) -> Result<StoredUser, ApiError> {
        tracing::info!("🔐 使用授权码登录...");

        let request = ApiRequest::post(GOOGLE_LOGIN_PATH).json(json!({ "code": code }));
        let response: LoginResponse = self.transport.execute_json(&request).await?;

        self.state().adopt(
            &response.user,
            Some(AccessToken::new(response.access_token.clone())),
        );

        self.channel.broadcast(&AuthBroadcastMessage::Login {
            user: response.user.clone(),
            access_token: Some(response.access_token),
        });

        tracing::info!("✅ 登录成功: {}", response.user.email);
        Ok(response.user)
    }

    /// 登出：通知服务端（失败忽略），清除本地状态，广播一次
    pub async fn logout(&self) {
        if let Some(user) = self.current_user() {
            let request = ApiRequest::post(LOGOUT_PATH).json(json!({ "userId": user.id }));
            if let Err(e) = self.transport.execute(&request).await {
                tracing::warn!("⚠️ 服务端登出失败（忽略）: {}", e);
            }
        }

        self.state().clear_local();
        self.channel.broadcast(&AuthBroadcastMessage::Logout);

        tracing::info!("👋 已登出");
    }

    /// 仅清除本标签页的认证状态，不通知其他标签页
    pub fn clear_local(&self) {
        self.state().clear_local();
    }

    /// 启动时恢复：有登录记录则通过 Cookie 换取新的 Access Token
    ///
    /// 返回恢复后是否处于已授权状态。刷新失败时传输层已清除本地状态。
    pub async fn restore(&self) -> bool {
        let Some(user) = self.current_user() else {
            tracing::debug!("没有登录记录，跳过恢复");
            return false;
        };

        if self.is_authorized() {
            return true;
        }

        tracing::info!("🔄 恢复登录状态: {}", user.email);

        match self.transport.refresh_token().await {
            Ok(_) => {
                tracing::info!("✅ 登录状态已恢复");
                true
            }
            Err(e) => {
                tracing::warn!("⚠️ 恢复登录状态失败: {}", e);
                false
            }
        }
    }

    /// 处理其他标签页的认证消息（登出后跳转登录页，但不再广播）
    pub fn apply_remote(&self, message: AuthBroadcastMessage) {
        handle_remote(self.state(), message);
    }

    /// 开始监听其他标签页；重复调用无副作用
    pub fn start_cross_tab_sync(&self) {
        let mut slot = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return;
        }

        let state = self.state().clone();
        *slot = Some(
            self.channel
                .listen(Box::new(move |message| handle_remote(&state, message))),
        );

        tracing::debug!("跨标签页同步已启动");
    }

    pub fn stop_cross_tab_sync(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            tracing::debug!("跨标签页同步已停止");
        }
    }
}

fn handle_remote(state: &AuthState, message: AuthBroadcastMessage) {
    let logged_out = matches!(message, AuthBroadcastMessage::Logout);
    state.apply_remote(message);

    if logged_out {
        state.redirect_to_login();
    }
}

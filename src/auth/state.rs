/// 标签页本地认证状态
///
/// 汇集内存中的 Access Token、持久化的 StoredUser 与登录页导航，
/// 传输层（刷新失败）和会话层（登录 / 登出 / 跨标签页消息）共用同一份状态。
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::token::{AccessToken, AccessTokenHolder};
use super::types::{AuthBroadcastMessage, StoredUser};
use crate::config::storage::UserStore;

/// 登录页导航（由 UI 层实现）
pub trait Navigator: Send + Sync {
    /// 当前所在路径
    fn current_path(&self) -> String;

    /// 跳转到指定路径
    fn redirect(&self, path: &str);
}

/// 无界面环境下的导航实现，只在内存中记录路径
#[derive(Debug)]
pub struct HeadlessNavigator {
    path: Mutex<String>,
    redirects: AtomicUsize,
}

impl HeadlessNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            path: Mutex::new(initial.into()),
            redirects: AtomicUsize::new(0),
        }
    }

    /// 累计跳转次数
    pub fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Default for HeadlessNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for HeadlessNavigator {
    fn current_path(&self) -> String {
        self.path.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn redirect(&self, path: &str) {
        *self.path.lock().unwrap_or_else(|e| e.into_inner()) = path.to_string();
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct AuthState {
    tokens: AccessTokenHolder,
    users: UserStore,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl AuthState {
    pub fn new(
        users: UserStore,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            tokens: AccessTokenHolder::new(),
            users,
            navigator,
            login_path: login_path.into(),
        }
    }

    pub fn tokens(&self) -> &AccessTokenHolder {
        &self.tokens
    }

    /// 读取持久化的登录用户；文件损坏时按未登录处理
    pub fn current_user(&self) -> Option<StoredUser> {
        match self.users.load() {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("⚠️ 读取登录用户失败: {:#}", e);
                None
            }
        }
    }

    /// 采纳用户与 Token；`token` 为空时保留当前 Token
    pub fn adopt(&self, user: &StoredUser, token: Option<AccessToken>) {
        if let Err(e) = self.users.save(user) {
            tracing::warn!("⚠️ 保存登录用户失败: {:#}", e);
        }

        if let Some(token) = token {
            self.tokens.set(Some(token));
        }
    }

    /// 仅清除本标签页的认证状态，不广播
    pub fn clear_local(&self) {
        self.tokens.clear();

        if let Err(e) = self.users.clear() {
            tracing::warn!("⚠️ 删除登录用户失败: {:#}", e);
        }

        tracing::info!("🔒 已清除本地认证状态");
    }

    /// 跳转登录页（已在登录页时不跳转）
    pub fn redirect_to_login(&self) {
        if self.navigator.current_path() == self.login_path {
            tracing::debug!("已在登录页，跳过跳转");
            return;
        }

        tracing::info!("跳转到登录页: {}", self.login_path);
        self.navigator.redirect(&self.login_path);
    }

    /// 处理来自其他标签页的认证消息
    ///
    /// - `logout`：只做本地清除，绝不再次广播，避免标签页之间来回触发
    /// - `login`：直接采纳用户与 Token，无需自行发起网络请求
    pub fn apply_remote(&self, message: AuthBroadcastMessage) {
        match message {
            AuthBroadcastMessage::Logout => {
                tracing::info!("📨 收到其他标签页的登出消息");
                self.clear_local();
            }
            AuthBroadcastMessage::Login { user, access_token } => {
                tracing::info!("📨 收到其他标签页的登录消息: {}", user.email);
                self.adopt(&user, access_token.map(AccessToken::new));
            }
        }
    }
}

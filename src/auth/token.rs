/// Access Token 持有模块
///
/// 当前标签页的短期 Bearer 凭据只保存在进程内存中，从不落盘；
/// 页面重载后通过服务端 Cookie 刷新恢复。
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// 短期访问令牌
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,

    /// 从 JWT `exp` 声明解出的过期时间；无法解析时为空
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let expires_at = decode_expiry(&value);
        Self { value, expires_at }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// 是否已过期（无过期声明时视为未过期）
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp <= Utc::now())
    }

    /// 日志用的脱敏表示：前后各 5 个字符
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.value.chars().collect();
        if chars.len() <= 10 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..5].iter().collect();
        let tail: String = chars[chars.len() - 5..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &self.masked())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 尽力解析 JWT 载荷中的 `exp`，任何格式问题都返回 `None`
fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

    let exp = claims.get("exp")?;
    let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;

    DateTime::from_timestamp(secs, 0)
}

struct HolderInner {
    token: Option<AccessToken>,
    watcher: Option<JoinHandle<()>>,
}

/// 标签页内的 Token 持有者
///
/// 替换 Token 会重新安排过期观察任务。观察任务只在过期时记录日志，
/// 真正的恢复由传输层的 401 处理完成。
pub struct AccessTokenHolder {
    inner: Mutex<HolderInner>,
}

impl AccessTokenHolder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HolderInner {
                token: None,
                watcher: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HolderInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self) -> Option<AccessToken> {
        self.lock().token.clone()
    }

    /// 替换当前 Token（`None` 等同于 [`clear`](Self::clear)）
    pub fn set(&self, token: Option<AccessToken>) {
        let mut inner = self.lock();

        if let Some(old) = inner.watcher.take() {
            old.abort();
        }

        inner.watcher = token.as_ref().and_then(spawn_expiry_watcher);

        match &token {
            Some(t) => tracing::debug!("Access Token 已更新: {}", t.masked()),
            None => tracing::debug!("Access Token 已清除"),
        }

        inner.token = token;
    }

    pub fn clear(&self) {
        self.set(None);
    }

    /// 过期观察任务是否仍在等待
    pub fn watcher_pending(&self) -> bool {
        self.lock()
            .watcher
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for AccessTokenHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AccessTokenHolder {
    fn drop(&mut self) {
        if let Some(handle) = self.lock().watcher.take() {
            handle.abort();
        }
    }
}

/// 为带过期声明的 Token 安排观察任务；没有声明或不在 tokio 运行时中则跳过
fn spawn_expiry_watcher(token: &AccessToken) -> Option<JoinHandle<()>> {
    let expires_at = token.expires_at()?;
    let runtime = tokio::runtime::Handle::try_current().ok()?;

    let delay = (expires_at - Utc::now()).to_std().unwrap_or_default();
    let masked = token.masked();

    Some(runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        tracing::info!(
            "⏰ Access Token {} 已过期（{}），下一次请求将触发刷新",
            masked,
            expires_at
        );
    }))
}

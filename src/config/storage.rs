/// 登录用户文件存储模块
///
/// 负责将 StoredUser 持久化到 TOML 文件，供 UI 在网络返回前渲染身份信息。
/// 同一 origin 下所有标签页共享这一个文件，存储事件降级通道也通过它感知登录 / 登出。
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::auth::types::StoredUser;

/// 会话文件版本号
const STORAGE_VERSION: &str = "1.0";

/// 会话存储容器
#[derive(Debug, Serialize, Deserialize)]
struct SessionStorage {
    /// 文件格式版本
    version: String,

    /// 当前登录用户（登出后文件被删除）
    user: StoredUser,
}

/// 临时文件序号（同进程内所有标签页共用，保证并发保存互不覆盖）
static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

/// 获取默认会话文件路径
///
/// 返回：`<配置目录>/NanoMail/session.toml`
pub fn session_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("无法获取配置目录"))?
        .join("NanoMail");

    Ok(config_dir.join("session.toml"))
}

/// StoredUser 的持久化存储
#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载登录用户
    ///
    /// # Returns
    /// 文件不存在时返回 `None`
    ///
    /// # Errors
    /// - 文件读取失败
    /// - 文件格式错误（例如另一个标签页正在写入）
    pub fn load(&self) -> Result<Option<StoredUser>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("读取会话文件失败: {}", self.path.display()))?;

        let storage: SessionStorage =
            toml::from_str(&content).context("解析会话文件失败（文件可能损坏）")?;

        if storage.version != STORAGE_VERSION {
            tracing::warn!(
                "会话文件版本不匹配（期望: {}, 实际: {}），尝试兼容加载",
                STORAGE_VERSION,
                storage.version
            );
        }

        Ok(Some(storage.user))
    }

    /// 覆盖式保存登录用户
    ///
    /// 先写临时文件再 rename，其他标签页不会读到写了一半的内容
    pub fn save(&self, user: &StoredUser) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("创建配置目录失败")?;
        }

        let storage = SessionStorage {
            version: STORAGE_VERSION.to_string(),
            user: user.clone(),
        };

        let content = toml::to_string_pretty(&storage).context("序列化会话数据失败")?;

        let tmp = self.temp_path();
        let written = std::fs::write(&tmp, content)
            .with_context(|| format!("写入会话文件失败: {}", tmp.display()))
            .and_then(|()| {
                std::fs::rename(&tmp, &self.path)
                    .with_context(|| format!("替换会话文件失败: {}", self.path.display()))
            });

        if written.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        written?;

        tracing::debug!("成功保存登录用户 {} 到: {}", user.email, self.path.display());

        Ok(())
    }

    /// 每次保存独占的临时文件：`.session.toml.<pid>.<seq>.tmp`
    fn temp_path(&self) -> PathBuf {
        let seq = SAVE_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session.toml".to_string());

        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
    }

    /// 删除登录用户（幂等）
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("已删除会话文件: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("删除会话文件失败: {}", self.path.display()))
            }
        }
    }
}

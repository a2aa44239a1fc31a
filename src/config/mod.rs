use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod storage;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
}

/// 远程 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API 根地址，例如 `http://localhost:3000/api`
    pub base_url: String,

    /// 整体请求超时（秒）
    pub timeout_secs: u64,

    /// 连接建立超时（秒）
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// 跨标签页通道选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossTabMode {
    /// 总线可用时使用总线
    Auto,

    /// 同进程发布 / 订阅总线
    Bus,

    /// 轮询会话文件（标签页分布在多个进程时使用）
    Storage,
}

/// 认证与跨标签页同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// 登录页路径
    pub login_path: String,

    /// 跨标签页总线名称
    pub channel_name: String,

    pub cross_tab_mode: CrossTabMode,

    /// 存储事件降级通道的轮询间隔（毫秒）
    pub storage_poll_ms: u64,

    /// 会话文件路径，默认 `<配置目录>/NanoMail/session.toml`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            channel_name: "nanomail-auth".to_string(),
            cross_tab_mode: CrossTabMode::Auto,
            storage_poll_ms: 1000,
            session_file: None,
        }
    }
}

/// 本地缓存配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 缓存目录，默认 `<缓存目录>/NanoMail/cache`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl CacheConfig {
    /// 实际使用的缓存目录
    pub fn resolve_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }

        Ok(dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("无法获取缓存目录"))?
            .join("NanoMail")
            .join("cache"))
    }
}

impl AuthConfig {
    /// 实际使用的会话文件路径
    pub fn resolve_session_file(&self) -> Result<PathBuf> {
        match &self.session_file {
            Some(path) => Ok(path.clone()),
            None => storage::session_path(),
        }
    }
}

impl Config {
    /// 环境变量覆盖
    ///
    /// - `NANOMAIL_API_BASE_URL`
    /// - `NANOMAIL_CACHE_DIR`
    /// - `NANOMAIL_SESSION_FILE`
    pub fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var("NANOMAIL_API_BASE_URL") {
            tracing::info!("✅ 从环境变量加载 API 地址: {}", base_url);
            self.api.base_url = base_url;
        }

        if let Ok(dir) = std::env::var("NANOMAIL_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(dir));
        }

        if let Ok(path) = std::env::var("NANOMAIL_SESSION_FILE") {
            self.auth.session_file = Some(PathBuf::from(path));
        }
    }
}

/// 获取配置文件路径
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("无法获取配置目录"))?
        .join("NanoMail");

    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.toml"))
}

/// 加载配置
///
/// 优先级（从高到低）：环境变量 > 配置文件 > 默认值。
/// 配置文件不存在时写入一份默认配置。
pub fn load() -> Result<Config> {
    let mut config = load_from(&config_path()?)?;
    config.apply_env();
    Ok(config)
}

/// 从指定路径加载配置（不应用环境变量）
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        save_to(path, &config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
    let config: Config = toml::from_str(&content).context("解析配置文件失败")?;
    Ok(config)
}

/// 保存配置
pub fn save(config: &Config) -> Result<()> {
    save_to(&config_path()?, config)
}

pub fn save_to(path: &Path, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
    Ok(())
}

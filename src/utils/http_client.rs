/// 每个 origin 共享的 HTTP 客户端
///
/// 目的：
/// 1. 复用 TCP 连接和连接池
/// 2. 同一 origin 下所有标签页共享 Cookie 罐，刷新凭据（HTTP-only Cookie）
///    由服务端写入、由 reqwest 自动携带，核心代码从不读取它
///
/// reqwest 官方推荐：共享单个 Client 实例而不是为每个请求创建新实例
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::config::ApiConfig;

/// 用户代理
const USER_AGENT: &str = concat!("NanoMail/", env!("CARGO_PKG_VERSION"), " (Rust) Gecko");

/// 按配置构建 HTTP 客户端
pub fn build_client(config: &ApiConfig) -> Result<Client> {
    Client::builder()
        // Cookie 罐（保存刷新凭据）
        .cookie_store(true)
        // 连接池配置
        .pool_max_idle_per_host(10) // 每个主机最多保留 10 个空闲连接
        .pool_idle_timeout(Duration::from_secs(300)) // 连接空闲 5 分钟后关闭
        // 超时配置
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        // 重定向配置
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(USER_AGENT)
        .build()
        .context("构建 HTTP 客户端失败")
}

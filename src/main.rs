use anyhow::Result;
use std::sync::Arc;

use nanomail_core::Origin;
use nanomail_core::auth::HeadlessNavigator;
use nanomail_core::config;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 初始化日志
    init_logger()?;

    // 2. 加载配置（环境变量优先）
    let cfg = config::load()?;
    tracing::info!("API 地址: {}", cfg.api.base_url);

    // 3. 打开 origin 与标签页
    let origin = Origin::new(cfg).await?;
    let tab = origin.open_tab(Arc::new(HeadlessNavigator::new("/")));

    // 4. 登录：有授权码则换取 Token，否则尝试恢复上次会话
    let authorized = match std::env::var("NANOMAIL_AUTH_CODE") {
        Ok(code) => match tab.session().login_with_code(&code).await {
            Ok(user) => {
                tracing::info!("👤 当前用户: {}", user.email);
                true
            }
            Err(e) => {
                tracing::error!("❌ 登录失败: {}", e);
                false
            }
        },
        Err(_) => tab.session().restore().await,
    };

    if !authorized {
        tracing::warn!("未登录，请设置 NANOMAIL_AUTH_CODE 后重试");
        return Ok(());
    }

    // 5. 读取邮箱列表（缓存优先）
    let mailboxes = tab.repository().get_mailboxes().await?;
    for mailbox in &mailboxes {
        println!(
            "{}\t{}\t{}",
            mailbox.id,
            mailbox.name.as_deref().unwrap_or("-"),
            mailbox.unread_count.unwrap_or(0)
        );
    }

    tracing::info!("✅ 共 {} 个邮箱", mailboxes.len());
    Ok(())
}

/// 初始化日志系统
fn init_logger() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nanomail_core=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

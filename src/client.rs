/// 组装根
///
/// - [`Origin`]：同一 origin 下所有标签页共享的资源（HTTP 客户端与 Cookie 罐、本地缓存存储、会话文件、总线名称）
/// - [`Tab`]：每个标签页独有的资源（Access Token、刷新状态、认证会话、数据仓库、推送监听）
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::broadcast::{self, next_tab_id};
use crate::auth::{AuthSession, AuthState, Navigator};
use crate::cache::CacheManager;
use crate::config::Config;
use crate::config::storage::UserStore;
use crate::mail::{MailApi, MailRepository};
use crate::store::{FileStore, LocalStore};
use crate::sync::{BroadcastRefetch, PushListener, PushSync};
use crate::transport::Transport;
use crate::utils::http_client;

pub struct Origin {
    config: Config,
    client: reqwest::Client,
    store: Arc<dyn LocalStore>,
    users: UserStore,
}

impl Origin {
    /// 按配置打开：缓存目录与会话文件取配置值或平台默认路径
    pub async fn new(config: Config) -> Result<Self> {
        let cache_dir = config.cache.resolve_dir()?;
        let store = FileStore::open(cache_dir.clone())
            .await
            .with_context(|| format!("打开缓存目录失败: {}", cache_dir.display()))?;
        let session_file = config.auth.resolve_session_file()?;

        tracing::info!("📁 缓存目录: {}", cache_dir.display());
        tracing::debug!("会话文件: {}", session_file.display());

        Self::with_store(config, Arc::new(store), session_file)
    }

    /// 使用指定的存储与会话文件
    pub fn with_store(
        config: Config,
        store: Arc<dyn LocalStore>,
        session_file: impl Into<PathBuf>,
    ) -> Result<Self> {
        let client = http_client::build_client(&config.api)?;

        Ok(Self {
            config,
            client,
            store,
            users: UserStore::new(session_file),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 打开一个标签页，并开始监听其他标签页的认证消息
    pub fn open_tab(&self, navigator: Arc<dyn Navigator>) -> Tab {
        let id = next_tab_id();
        let state = Arc::new(AuthState::new(
            self.users.clone(),
            navigator,
            self.config.auth.login_path.clone(),
        ));

        let channel = broadcast::connect(&self.config.auth, id, &self.users);
        let transport = Arc::new(
            Transport::new(
                self.client.clone(),
                self.config.api.base_url.clone(),
                state,
            )
            .with_channel(channel.clone()),
        );

        let session = AuthSession::new(transport.clone(), channel);
        session.start_cross_tab_sync();

        let api = Arc::new(MailApi::new(transport.clone()));
        let cache = CacheManager::new(self.store.clone());
        let refetch = Arc::new(BroadcastRefetch::new());
        let push = PushSync::new(PushListener::new(cache.clone(), refetch.clone()), api.clone());

        tracing::debug!("标签页 {} 已打开", id);

        Tab {
            id,
            transport,
            session,
            repository: MailRepository::new(api, cache),
            push,
            refetch,
        }
    }
}

pub struct Tab {
    id: u64,
    transport: Arc<Transport>,
    session: AuthSession,
    repository: MailRepository,
    push: PushSync,
    refetch: Arc<BroadcastRefetch>,
}

impl Tab {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn repository(&self) -> &MailRepository {
        &self.repository
    }

    pub fn push(&self) -> &PushSync {
        &self.push
    }

    /// 上层查询订阅推送触发的重新拉取
    pub fn refetch(&self) -> &Arc<BroadcastRefetch> {
        &self.refetch
    }

    /// 登出并结束本次推送会话
    pub async fn logout(&self) {
        self.session.logout().await;
        self.push.reset_session().await;
    }
}

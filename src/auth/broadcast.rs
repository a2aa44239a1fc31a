/// 跨标签页认证同步模块
///
/// 同一 origin 下的多个标签页通过命名总线传播登录 / 登出与 Token 更新。
/// 总线不可用时（标签页分布在多个进程）退化为轮询会话文件，
/// 这种方式只能感知登录 / 登出，无法传递 Token。
///
/// 消息按发送顺序送达每个监听者；卸载的标签页收不到消息，也不会补发。
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use super::types::{AuthBroadcastMessage, StoredUser};
use crate::config::storage::UserStore;
use crate::config::{AuthConfig, CrossTabMode};

/// 总线缓冲的消息条数，慢速接收者超出后会丢弃最旧的消息
const BUS_CAPACITY: usize = 64;

/// 进程内的命名总线注册表（相当于浏览器按 origin + 名称划分的 BroadcastChannel）
static BUS_REGISTRY: Lazy<Mutex<HashMap<String, broadcast::Sender<Envelope>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// 标签页 ID 分配器
static NEXT_TAB_ID: AtomicU64 = AtomicU64::new(1);

/// 分配一个进程内唯一的标签页 ID
pub fn next_tab_id() -> u64 {
    NEXT_TAB_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
struct Envelope {
    sender: u64,
    message: AuthBroadcastMessage,
}

/// 消息回调
pub type MessageHandler = Box<dyn Fn(AuthBroadcastMessage) + Send + Sync + 'static>;

/// 跨标签页通道
pub trait AuthChannel: Send + Sync {
    /// 发送给其他标签页（不会回送给自己）
    fn broadcast(&self, message: &AuthBroadcastMessage);

    /// 开始监听，返回的 [`Subscription`] 被 drop 时停止
    fn listen(&self, handler: MessageHandler) -> Subscription;
}

/// 监听句柄
pub struct Subscription {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    fn spawn<F>(task: impl FnOnce(oneshot::Receiver<()>) -> F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(task(shutdown_rx));
        Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// 取消监听
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    /// 监听任务是否仍在运行
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.task.take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 同进程命名总线
pub struct BusChannel {
    name: String,
    tab_id: u64,
    sender: broadcast::Sender<Envelope>,
}

impl BusChannel {
    /// 打开（必要时创建）命名总线
    pub fn open(name: &str, tab_id: u64) -> Self {
        let mut registry = BUS_REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
        let sender = registry
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(BUS_CAPACITY).0)
            .clone();

        Self {
            name: name.to_string(),
            tab_id,
            sender,
        }
    }
}

impl AuthChannel for BusChannel {
    fn broadcast(&self, message: &AuthBroadcastMessage) {
        let envelope = Envelope {
            sender: self.tab_id,
            message: message.clone(),
        };

        // 没有任何监听者时 send 返回错误，属于正常情况
        match self.sender.send(envelope) {
            Ok(receivers) => tracing::debug!(
                "📡 [{}] 标签页 {} 广播认证消息（{} 个接收者）",
                self.name,
                self.tab_id,
                receivers
            ),
            Err(_) => tracing::debug!("📡 [{}] 无其他标签页监听", self.name),
        }
    }

    fn listen(&self, handler: MessageHandler) -> Subscription {
        let mut rx = self.sender.subscribe();
        let tab_id = self.tab_id;
        let name = self.name.clone();

        Subscription::spawn(move |mut shutdown_rx| async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    received = rx.recv() => match received {
                        Ok(envelope) if envelope.sender == tab_id => {}
                        Ok(envelope) => handler(envelope.message),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                "⚠️ [{}] 标签页 {} 丢失 {} 条认证消息",
                                name,
                                tab_id,
                                skipped
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("[{}] 标签页 {} 停止监听", name, tab_id);
        })
    }
}

/// 存储事件降级通道：轮询会话文件的变化
pub struct StorageWatcher {
    users: UserStore,
    interval: Duration,
}

impl StorageWatcher {
    pub fn new(users: UserStore, interval: Duration) -> Self {
        Self { users, interval }
    }
}

/// 根据前后两次观察到的用户推导消息
fn diff_users(
    previous: Option<&StoredUser>,
    current: Option<&StoredUser>,
) -> Option<AuthBroadcastMessage> {
    match (previous, current) {
        (Some(_), None) => Some(AuthBroadcastMessage::Logout),
        (None, Some(user)) => Some(AuthBroadcastMessage::Login {
            user: user.clone(),
            access_token: None,
        }),
        (Some(old), Some(new)) if old.id != new.id => Some(AuthBroadcastMessage::Login {
            user: new.clone(),
            access_token: None,
        }),
        _ => None,
    }
}

impl AuthChannel for StorageWatcher {
    fn broadcast(&self, _message: &AuthBroadcastMessage) {
        // 会话文件本身的写入 / 删除就是信号
        tracing::debug!("📡 存储事件通道：消息通过会话文件传播");
    }

    fn listen(&self, handler: MessageHandler) -> Subscription {
        let users = self.users.clone();
        let period = self.interval;
        let mut last = users.load().ok().flatten();

        Subscription::spawn(move |mut shutdown_rx| async move {
            let mut timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = timer.tick() => {
                        // 读取失败（可能是其他标签页正在写入）时等待下一轮
                        let current = match users.load() {
                            Ok(current) => current,
                            Err(e) => {
                                tracing::debug!("会话文件暂不可读: {:#}", e);
                                continue;
                            }
                        };

                        if let Some(message) = diff_users(last.as_ref(), current.as_ref()) {
                            handler(message);
                        }
                        last = current;
                    }
                }
            }
        })
    }
}

/// 按配置选择通道
pub fn connect(config: &AuthConfig, tab_id: u64, users: &UserStore) -> Arc<dyn AuthChannel> {
    match config.cross_tab_mode {
        CrossTabMode::Auto | CrossTabMode::Bus => {
            tracing::debug!("跨标签页同步使用总线: {}", config.channel_name);
            Arc::new(BusChannel::open(&config.channel_name, tab_id))
        }
        CrossTabMode::Storage => {
            tracing::info!("跨标签页同步降级为会话文件轮询（{} ms）", config.storage_poll_ms);
            Arc::new(StorageWatcher::new(
                users.clone(),
                Duration::from_millis(config.storage_poll_ms),
            ))
        }
    }
}

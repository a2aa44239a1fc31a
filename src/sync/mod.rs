/// 推送驱动的缓存失效
///
/// 服务端推送只表示"邮箱有变化"，不保证具体是哪一项，因此每条通知都会：
/// 1. 失效邮箱列表
/// 2. 失效所有邮件列表分页
/// 3. 最后才通知上层查询重新拉取
///
/// 顺序不能颠倒：先重新拉取会把可能已经过期的数据再次写回缓存。
/// 推送连接本身（重连、分帧）由外部负责，这里只消费通知流。
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::cache::CacheManager;
use crate::mail::MailApi;

/// 一条推送通知，内容不做解释
#[derive(Debug, Clone, PartialEq)]
pub struct PushNotification(pub serde_json::Value);

/// 上层查询的重新拉取信号
#[async_trait]
pub trait RefetchSignal: Send + Sync {
    async fn refetch(&self);
}

/// 通过 broadcast 通道分发重新拉取信号
pub struct BroadcastRefetch {
    tx: broadcast::Sender<()>,
}

impl BroadcastRefetch {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastRefetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefetchSignal for BroadcastRefetch {
    async fn refetch(&self) {
        // 没有订阅者时忽略
        let _ = self.tx.send(());
    }
}

/// 推送监听器
pub struct PushListener {
    cache: CacheManager,
    signal: Arc<dyn RefetchSignal>,
}

impl PushListener {
    pub fn new(cache: CacheManager, signal: Arc<dyn RefetchSignal>) -> Self {
        Self { cache, signal }
    }

    /// 处理一条通知（与内容无关）
    pub async fn handle(&self, notification: &PushNotification) {
        tracing::info!("📬 收到推送通知: {}", notification.0);

        self.cache.invalidate_mailboxes().await;
        self.cache.invalidate_all_email_lists().await;

        self.signal.refetch().await;
    }
}

/// 本标签页的推送会话
pub struct PushSync {
    listener: Arc<PushListener>,
    api: Arc<MailApi>,

    /// 推送是否已开启；调用 `/mail/watch` 期间一直持有
    watch_started: Mutex<bool>,
}

impl PushSync {
    pub fn new(listener: PushListener, api: Arc<MailApi>) -> Self {
        Self {
            listener: Arc::new(listener),
            api,
            watch_started: Mutex::new(false),
        }
    }

    pub fn listener(&self) -> &Arc<PushListener> {
        &self.listener
    }

    /// 每个会话只调用一次 `/mail/watch`；失败后允许下次重试
    ///
    /// 并发调用者等待正在进行的调用，拿到的是它的真实结果
    pub async fn ensure_watch(&self) -> bool {
        let mut started = self.watch_started.lock().await;
        if *started {
            return true;
        }

        match self.api.start_watch().await {
            Ok(()) => {
                *started = true;
                tracing::info!("✅ 已开启服务端推送");
                true
            }
            Err(e) => {
                tracing::warn!("⚠️ 开启服务端推送失败: {}", e);
                false
            }
        }
    }

    /// 新会话（重新登录）需要重新开启推送
    pub async fn reset_session(&self) {
        *self.watch_started.lock().await = false;
    }

    /// 开启推送并在后台消费通知流，返回的句柄被 drop 时停止
    pub async fn start<S>(&self, stream: S) -> PushHandle
    where
        S: Stream<Item = PushNotification> + Send + Unpin + 'static,
    {
        self.ensure_watch().await;

        let listener = self.listener.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let mut stream = stream;

        let task = tokio::spawn(async move {
            tracing::debug!("推送监听已启动");
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        tracing::debug!("推送监听收到停止信号");
                        break;
                    }
                    next = stream.next() => match next {
                        Some(notification) => listener.handle(&notification).await,
                        None => {
                            tracing::info!("推送通道已关闭");
                            break;
                        }
                    }
                }
            }
        });

        PushHandle {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// 推送监听任务句柄
pub struct PushHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PushHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// 停止并等待任务退出
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

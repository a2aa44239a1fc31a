/// HTTP 传输层（带 Token 刷新拦截）
///
/// 每个请求的状态机：
/// 1. 发送：携带当前 Bearer Token（刷新端点除外）
/// 2. 成功：原样返回
/// 3. 401 且不是认证端点：进入刷新流程，拿到新 Token 后重发一次
///    - 已有刷新在进行：排队等待其结果
///    - 没有刷新在进行：由本请求负责调用刷新端点，完成后按入队顺序通知所有等待者
/// 4. 认证端点自身的 401，或重发后仍然 401：原样向上传递，避免无限刷新
///
/// 同一个 [`Transport`] 实例内同时最多只有一次刷新调用。
/// 刷新状态归实例所有（不是全局变量），测试中的多个实例互不干扰。
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use url::Url;

pub mod error;

pub use error::ApiError;

use crate::auth::broadcast::AuthChannel;
use crate::auth::state::AuthState;
use crate::auth::token::AccessToken;
use crate::auth::types::{AuthBroadcastMessage, RefreshResponse};
use crate::mail::types::ApiEnvelope;

/// Token 刷新端点
pub const REFRESH_PATH: &str = "/auth/refresh";

/// 登出端点
pub const LOGOUT_PATH: &str = "/auth/logout";

/// OAuth 登录端点
pub const GOOGLE_LOGIN_PATH: &str = "/auth/google/login";

/// 不参与 401 重试的认证端点
const AUTH_ENDPOINTS: [&str; 3] = [REFRESH_PATH, LOGOUT_PATH, GOOGLE_LOGIN_PATH];

/// 出站请求描述（可重复发送）
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// 是否属于不参与 401 重试的认证端点
    pub fn is_auth_endpoint(&self) -> bool {
        AUTH_ENDPOINTS.contains(&self.path.as_str())
    }
}

/// 响应（状态码 + 原始响应体）
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    fn error_for_status(self) -> Result<Self, ApiError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// 解析 `{status, data}` 信封
    pub fn envelope<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let envelope: ApiEnvelope<T> = self.json()?;

        if envelope.status != "success" {
            return Err(ApiError::Envelope(
                envelope.message.unwrap_or(envelope.status),
            ));
        }

        envelope
            .data
            .ok_or_else(|| ApiError::Decode("响应信封缺少 data 字段".to_string()))
    }

    /// 只校验信封状态，忽略 data（写操作的响应）
    pub fn ack(&self) -> Result<(), ApiError> {
        if self.body.trim().is_empty() {
            return Ok(());
        }

        let envelope: ApiEnvelope<serde_json::Value> = self.json()?;
        if envelope.status != "success" {
            return Err(ApiError::Envelope(
                envelope.message.unwrap_or(envelope.status),
            ));
        }
        Ok(())
    }
}

/// 刷新等待者收到的结果（错误以文本传递，便于扇出给多个等待者）
type RefreshOutcome = Result<AccessToken, String>;

/// 进行中的刷新：排队等待新 Token 的请求
#[derive(Default)]
struct PendingRefresh {
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// 刷新负责人离开时（包括 future 被取消）清除进行中标记。
/// 未被通知的等待者随 `PendingRefresh` 一起被 drop，收到 `RefreshAbandoned`。
struct RefreshGuard<'a> {
    slot: &'a Mutex<Option<PendingRefresh>>,
    armed: bool,
}

impl RefreshGuard<'_> {
    /// 正常结束：取出等待队列并解除守卫
    fn finish(mut self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        self.armed = false;
        lock(self.slot)
            .take()
            .map(|pending| pending.waiters)
            .unwrap_or_default()
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("⚠️ Token 刷新被中断，释放等待队列");
            lock(self.slot).take();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// 带刷新拦截的 HTTP 传输
pub struct Transport {
    client: Client,
    base_url: String,
    state: Arc<AuthState>,
    refresh: Mutex<Option<PendingRefresh>>,

    /// 刷新成功后把新 Token 同步给其他标签页
    channel: Option<Arc<dyn AuthChannel>>,
}

impl Transport {
    pub fn new(client: Client, base_url: impl Into<String>, state: Arc<AuthState>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state,
            refresh: Mutex::new(None),
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: Arc<dyn AuthChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn state(&self) -> &Arc<AuthState> {
        &self.state
    }

    /// 当前是否有刷新在进行
    pub fn is_refreshing(&self) -> bool {
        lock(&self.refresh).is_some()
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    /// 发送一次请求，不做任何重试
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url_for(&request.path)?);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_reqwest)?;

        tracing::debug!("{} {} -> {}", request.method, request.path, status);

        Ok(ApiResponse { status, body })
    }

    /// 执行请求，401 时走单飞刷新并重发一次
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        // 刷新端点只依赖 Cookie，绝不携带 Bearer
        let token = if request.path == REFRESH_PATH {
            None
        } else {
            self.state.tokens().get()
        };

        let response = self.send(request, token.as_ref()).await?;

        if response.status != StatusCode::UNAUTHORIZED {
            return response.error_for_status();
        }

        if request.is_auth_endpoint() {
            tracing::debug!("认证端点 {} 返回 401，不触发刷新", request.path);
            return Err(ApiError::Unauthorized {
                path: request.path.clone(),
            });
        }

        // 发出请求后 Token 已被其他请求刷新：直接用新 Token 重发
        let fresh = match self.state.tokens().get() {
            Some(current) if token.as_ref() != Some(&current) => {
                tracing::debug!("Token 已在请求期间更新，直接重发 {}", request.path);
                current
            }
            _ => self.refresh_token().await?,
        };

        let retried = self.send(request, Some(&fresh)).await?;

        if retried.status == StatusCode::UNAUTHORIZED {
            tracing::warn!("⚠️ 刷新后重发 {} 仍然 401", request.path);
            return Err(ApiError::Unauthorized {
                path: request.path.clone(),
            });
        }

        retried.error_for_status()
    }

    /// 执行并解析普通 JSON 响应
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ApiError> {
        self.execute(request).await?.json()
    }

    /// 执行并解析 `{status, data}` 信封
    pub async fn execute_envelope<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ApiError> {
        self.execute(request).await?.envelope()
    }

    /// 获取新 Token：已有刷新在进行则排队，否则由自己负责刷新
    pub async fn refresh_token(&self) -> Result<AccessToken, ApiError> {
        let waiter = {
            let mut slot = lock(&self.refresh);
            match slot.as_mut() {
                Some(pending) => {
                    let (tx, rx) = oneshot::channel();
                    pending.waiters.push(tx);
                    tracing::debug!("刷新进行中，加入等待队列（第 {} 位）", pending.waiters.len());
                    Some(rx)
                }
                None => {
                    *slot = Some(PendingRefresh::default());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            return match rx.await {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(reason)) => Err(ApiError::RefreshFailed(reason)),
                Err(_) => Err(ApiError::RefreshAbandoned),
            };
        }

        let guard = RefreshGuard {
            slot: &self.refresh,
            armed: true,
        };

        tracing::info!("🔄 Access Token 失效，开始刷新");

        match self.call_refresh_endpoint().await {
            Ok(token) => {
                self.state.tokens().set(Some(token.clone()));
                let waiters = guard.finish();

                tracing::info!(
                    "✅ Access Token 刷新成功（{}），通知 {} 个等待请求",
                    token.masked(),
                    waiters.len()
                );

                for waiter in waiters {
                    let _ = waiter.send(Ok(token.clone()));
                }

                self.announce(&token);
                Ok(token)
            }
            Err(e) => {
                tracing::error!("❌ Token 刷新失败，清除本地认证状态: {}", e);

                self.state.clear_local();
                self.state.redirect_to_login();

                let reason = e.to_string();
                for waiter in guard.finish() {
                    let _ = waiter.send(Err(reason.clone()));
                }

                Err(ApiError::RefreshFailed(reason))
            }
        }
    }

    /// 其他标签页直接采纳新 Token，无需各自刷新
    fn announce(&self, token: &AccessToken) {
        let Some(channel) = &self.channel else {
            return;
        };

        match self.state.current_user() {
            Some(user) => channel.broadcast(&AuthBroadcastMessage::Login {
                user,
                access_token: Some(token.as_str().to_string()),
            }),
            None => tracing::debug!("没有登录记录，跳过 Token 同步"),
        }
    }

    /// 等待刷新结果的请求数
    #[cfg(test)]
    fn queued_waiters(&self) -> usize {
        lock(&self.refresh)
            .as_ref()
            .map_or(0, |pending| pending.waiters.len())
    }

    /// 调用刷新端点（凭据由 Cookie 携带，请求体为空对象）
    async fn call_refresh_endpoint(&self) -> Result<AccessToken, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).json(serde_json::json!({}));
        let response = self.send(&request, None).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized {
                path: REFRESH_PATH.to_string(),
            });
        }

        let refreshed: RefreshResponse = response.error_for_status()?.json()?;
        Ok(AccessToken::new(refreshed.access_token))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::state::{HeadlessNavigator, Navigator};
    use crate::auth::state::tests::test_user;
    use crate::config::storage::UserStore;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) struct Fixture {
        pub server: MockServer,
        pub transport: Arc<Transport>,
        pub navigator: Arc<HeadlessNavigator>,
        pub _dir: tempfile::TempDir,
    }

    pub(crate) async fn fixture() -> Fixture {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let navigator = Arc::new(HeadlessNavigator::new("/inbox"));
        let state = Arc::new(AuthState::new(
            UserStore::new(dir.path().join("session.toml")),
            navigator.clone(),
            "/login",
        ));
        let client = reqwest::Client::builder().cookie_store(true).build().unwrap();
        let transport = Arc::new(Transport::new(client, server.uri(), state));

        Fixture {
            server,
            transport,
            navigator,
            _dir: dir,
        }
    }

    fn mailboxes_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [{"id": "INBOX"}]
        }))
    }

    #[test]
    fn test_auth_endpoint_detection() {
        assert!(ApiRequest::post(REFRESH_PATH).is_auth_endpoint());
        assert!(ApiRequest::post(LOGOUT_PATH).is_auth_endpoint());
        assert!(ApiRequest::post(GOOGLE_LOGIN_PATH).is_auth_endpoint());
        assert!(!ApiRequest::get("/mail/mailboxes").is_auth_endpoint());
    }

    #[test]
    fn test_envelope_parsing() {
        let ok = ApiResponse {
            status: StatusCode::OK,
            body: r#"{"status":"success","data":[1,2]}"#.into(),
        };
        assert_eq!(ok.envelope::<Vec<u32>>().unwrap(), vec![1, 2]);

        let failed = ApiResponse {
            status: StatusCode::OK,
            body: r#"{"status":"error","message":"mailbox gone"}"#.into(),
        };
        assert!(matches!(
            failed.envelope::<Vec<u32>>(),
            Err(ApiError::Envelope(msg)) if msg == "mailbox gone"
        ));

        let garbage = ApiResponse {
            status: StatusCode::OK,
            body: "<html>".into(),
        };
        assert!(matches!(garbage.envelope::<Vec<u32>>(), Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let f = fixture().await;
        f.transport.state().tokens().set(Some(AccessToken::new("tok-1")));

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(mailboxes_ok())
            .expect(1)
            .mount(&f.server)
            .await;

        let data: Vec<serde_json::Value> = f
            .transport
            .execute_envelope(&ApiRequest::get("/mail/mailboxes"))
            .await
            .unwrap();
        assert_eq!(data[0]["id"], "INBOX");
    }

    #[tokio::test]
    async fn test_single_flight_refresh_for_concurrent_401s() {
        let f = fixture().await;
        f.transport.state().tokens().set(Some(AccessToken::new("old-token")));

        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"accessToken": "new-token"}))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&f.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .and(header("Authorization", "Bearer old-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(5)
            .mount(&f.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .and(header("Authorization", "Bearer new-token"))
            .respond_with(mailboxes_ok())
            .expect(5)
            .mount(&f.server)
            .await;

        let request = ApiRequest::get("/mail/mailboxes");
        let results = futures::future::join_all(
            (0..5).map(|_| f.transport.execute_envelope::<Vec<serde_json::Value>>(&request)),
        )
        .await;

        for result in results {
            assert_eq!(result.unwrap()[0]["id"], "INBOX");
        }
        assert_eq!(
            f.transport.state().tokens().get().unwrap().as_str(),
            "new-token"
        );
        assert!(!f.transport.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_request_never_carries_bearer() {
        let f = fixture().await;
        f.transport.state().tokens().set(Some(AccessToken::new("old-token")));

        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "new-token"})))
            .mount(&f.server)
            .await;

        f.transport.refresh_token().await.unwrap();

        let requests = f.server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_refresh_endpoint_401_does_not_nest() {
        let f = fixture().await;
        f.transport.state().tokens().set(Some(AccessToken::new("old-token")));

        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&f.server)
            .await;

        let result = f.transport.execute(&ApiRequest::post(REFRESH_PATH)).await;
        assert!(matches!(result, Err(ApiError::Unauthorized { .. })));

        // 认证端点的 401 不触发刷新，也不清除本地状态
        assert_eq!(
            f.transport.state().tokens().get().unwrap().as_str(),
            "old-token"
        );
    }

    #[tokio::test]
    async fn test_retry_happens_only_once() {
        let f = fixture().await;
        f.transport.state().tokens().set(Some(AccessToken::new("old-token")));

        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "new-token"})))
            .expect(1)
            .mount(&f.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&f.server)
            .await;

        let result = f.transport.execute(&ApiRequest::get("/mail/mailboxes")).await;
        assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_refresh_failure_logs_out_and_rejects_queued_requests() {
        let f = fixture().await;
        f.transport.state().adopt(&test_user(), Some(AccessToken::new("old-token")));

        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&f.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .respond_with(ResponseTemplate::new(401))
            .expect(3)
            .mount(&f.server)
            .await;

        let request = ApiRequest::get("/mail/mailboxes");
        let results = tokio::time::timeout(
            Duration::from_secs(5),
            futures::future::join_all((0..3).map(|_| f.transport.execute(&request))),
        )
        .await
        .expect("排队的请求不应悬挂");

        for result in results {
            assert!(matches!(result, Err(ApiError::RefreshFailed(_))));
        }

        assert!(f.transport.state().tokens().get().is_none());
        assert!(f.transport.state().current_user().is_none());
        assert_eq!(f.navigator.current_path(), "/login");
        assert_eq!(f.navigator.redirect_count(), 1);
        assert!(!f.transport.is_refreshing());
    }

    #[tokio::test]
    async fn test_queued_waiters_are_notified_in_enqueue_order() {
        let f = fixture().await;

        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"accessToken": "new-token"}))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&f.server)
            .await;

        let refresher = {
            let transport = f.transport.clone();
            tokio::spawn(async move { transport.refresh_token().await })
        };
        while !f.transport.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut waiters = Vec::new();
        for i in 0..4 {
            let transport = f.transport.clone();
            let order = order.clone();
            waiters.push(tokio::spawn(async move {
                let token = transport.refresh_token().await;
                order.lock().unwrap().push(i);
                token
            }));

            // 等这个请求真正入队后再启动下一个
            while f.transport.queued_waiters() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        refresher.await.unwrap().unwrap();
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap().unwrap().as_str(), "new-token");
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_refreshed_token_is_announced_to_other_tabs() {
        use crate::auth::broadcast::{BusChannel, next_tab_id};

        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AuthState::new(
            UserStore::new(dir.path().join("session.toml")),
            Arc::new(HeadlessNavigator::new("/inbox")),
            "/login",
        ));
        state.adopt(&test_user(), None);

        let transport = Transport::new(reqwest::Client::new(), server.uri(), state).with_channel(
            Arc::new(BusChannel::open("transport-announce", next_tab_id())),
        );

        let other = BusChannel::open("transport-announce", next_tab_id());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _sub = other.listen(Box::new(move |m| {
            let _ = tx.send(m);
        }));

        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "rotated"})))
            .mount(&server)
            .await;

        transport.refresh_token().await.unwrap();

        let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            message,
            AuthBroadcastMessage::Login {
                user: test_user(),
                access_token: Some("rotated".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_cancelled_refresher_releases_waiters() {
        let f = fixture().await;

        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"accessToken": "late"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&f.server)
            .await;

        let transport = f.transport.clone();
        let refresher = tokio::spawn(async move { transport.refresh_token().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(f.transport.is_refreshing());

        let waiter = {
            let transport = f.transport.clone();
            tokio::spawn(async move { transport.refresh_token().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        refresher.abort();

        let outcome = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, Err(ApiError::RefreshAbandoned)));
        assert!(!f.transport.is_refreshing());
    }

    #[tokio::test]
    async fn test_non_401_errors_pass_through() {
        let f = fixture().await;

        Mock::given(method("GET"))
            .and(path("/mail/mailboxes"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&f.server)
            .await;

        let result = f.transport.execute(&ApiRequest::get("/mail/mailboxes")).await;
        assert!(matches!(
            result,
            Err(ApiError::Status { status, body }) if status == StatusCode::INTERNAL_SERVER_ERROR && body == "boom"
        ));
    }
}

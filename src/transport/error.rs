/// 传输层错误类型
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("网络请求失败: {0}")]
    Network(#[source] reqwest::Error),

    #[error("请求超时")]
    Timeout,

    /// 401，且不再尝试刷新（认证端点本身，或已经重试过一次）
    #[error("未授权 (401): {path}")]
    Unauthorized { path: String },

    #[error("服务端返回错误 {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("响应解析失败: {0}")]
    Decode(String),

    /// `{status, data}` 信封中的失败状态
    #[error("服务端返回失败状态: {0}")]
    Envelope(String),

    #[error("Token 刷新失败: {0}")]
    RefreshFailed(String),

    /// 负责刷新的请求在完成前被取消
    #[error("Token 刷新被中断")]
    RefreshAbandoned,

    #[error("无效的请求地址: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::RefreshFailed(_) | Self::RefreshAbandoned
        )
    }

    /// 网络层失败（连接失败 / 超时）
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }
}

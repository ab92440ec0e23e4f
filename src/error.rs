//! Error types shared by the transport, API modules and stores.

use thiserror::Error;

/// Generic user-facing fallback when the server gives no detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "请求失败，请稍后重试";
pub const TIMEOUT_MESSAGE: &str = "请求超时，请检查网络连接";
pub const NETWORK_MESSAGE: &str = "网络连接失败，请检查网络设置";
pub const DECODE_MESSAGE: &str = "响应数据格式错误";

/// Coarse classification of a non-2xx HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Server,
    Other,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => StatusClass::BadRequest,
            401 => StatusClass::Unauthorized,
            403 => StatusClass::Forbidden,
            404 => StatusClass::NotFound,
            500 => StatusClass::Server,
            _ => StatusClass::Other,
        }
    }

    /// Static notification title for the class.
    pub fn label(self) -> &'static str {
        match self {
            StatusClass::BadRequest => "请求参数错误",
            StatusClass::Unauthorized => "未授权，请重新登录",
            StatusClass::Forbidden => "拒绝访问",
            StatusClass::NotFound => "请求的资源不存在",
            StatusClass::Server => "服务器内部错误",
            StatusClass::Other => "请求失败",
        }
    }
}

/// Every failure an API call can end in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{}", .message.as_deref().unwrap_or(.class.label()))]
    Http {
        status: u16,
        class: StatusClass,
        /// `message` (or `error`) field of the response body, if any.
        message: Option<String>,
    },

    /// No response before the configured timeout.
    #[error("{0}")]
    Timeout(String),

    /// No response at all (offline, DNS, CORS, ...).
    #[error("{0}")]
    Network(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl ApiError {
    pub fn http(status: u16, message: Option<String>) -> Self {
        ApiError::Http {
            status,
            class: StatusClass::from_status(status),
            message,
        }
    }

    /// Classify a transport failure by inspecting its text.
    pub fn from_transport_text(text: &str) -> Self {
        if text.to_ascii_lowercase().contains("timeout") {
            ApiError::Timeout(text.to_string())
        } else {
            ApiError::Network(text.to_string())
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::Http {
                class: StatusClass::Unauthorized,
                ..
            }
        )
    }

    /// Text suitable for a notification body or a store's `error` field.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message
                .clone()
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            ApiError::Timeout(_) => TIMEOUT_MESSAGE.to_string(),
            ApiError::Network(_) => NETWORK_MESSAGE.to_string(),
            ApiError::Decode(_) | ApiError::Encode(_) => DECODE_MESSAGE.to_string(),
        }
    }

    /// Like [`user_message`](Self::user_message) but prefers the caller's
    /// fallback when the server said nothing specific.
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            ApiError::Http { message: None, .. } => fallback.to_string(),
            other => other.user_message(),
        }
    }
}

/// Failures of the persisted key-value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,

    #[error("storage write failed for key '{0}'")]
    Write(String),

    #[error("invalid JSON stored under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

//! 错误类型
//!
//! 分三层：
//! - `ApiError`：单次远程调用失败（可按 `FailureClass` 分类，决定是否重试）
//! - `BatchError`：整批失败（准备阶段失败、空输入等契约错误）
//! - `AppError`：工具层 / 应用层的顶层包装

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 失败分类
///
/// 重试策略只看分类，不看具体消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// 409 冲突（通常是同一父资源上的并发写入）
    Conflict,
    /// 429 请求频率限制
    RateLimited,
    /// 5xx 服务端错误
    ServerError,
    /// 其他 4xx（not found、鉴权失败等）
    Client,
    /// 响应为 `success: false`（校验失败）
    Validation,
    /// 没有拿到 HTTP 状态码（连接失败、超时）
    Network,
    /// 响应体无法解析
    Decode,
}

impl FailureClass {
    /// 从 HTTP 状态码推断分类
    pub fn from_status(status: u16) -> Self {
        match status {
            409 => FailureClass::Conflict,
            429 => FailureClass::RateLimited,
            500..=599 => FailureClass::ServerError,
            _ => FailureClass::Client,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureClass::Conflict => "conflict",
            FailureClass::RateLimited => "rate_limited",
            FailureClass::ServerError => "server_error",
            FailureClass::Client => "client",
            FailureClass::Validation => "validation",
            FailureClass::Network => "network",
            FailureClass::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// 单次远程调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 服务端返回非 2xx 状态码
    #[error("{endpoint} 返回 HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
        /// `Retry-After` 头（秒）
        retry_after: Option<u64>,
    },
    /// 服务端返回 `success: false`
    #[error("{endpoint} 拒绝请求: {}", .messages.join("; "))]
    Rejected {
        endpoint: String,
        messages: Vec<String>,
    },
    /// 网络请求失败（没有状态码）
    #[error("API请求失败 ({endpoint}): {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// 创建状态码错误
    pub fn status(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// 创建 `success: false` 错误
    pub fn rejected(endpoint: impl Into<String>, messages: Vec<String>) -> Self {
        ApiError::Rejected {
            endpoint: endpoint.into(),
            messages,
        }
    }

    /// 失败分类
    pub fn class(&self) -> FailureClass {
        match self {
            ApiError::Status { status, .. } => FailureClass::from_status(*status),
            ApiError::Rejected { .. } => FailureClass::Validation,
            ApiError::Transport { .. } => FailureClass::Network,
            ApiError::Decode { .. } => FailureClass::Decode,
        }
    }

    /// 服务端建议的等待时间（秒）
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ApiError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// 出错的接口
    pub fn endpoint(&self) -> &str {
        match self {
            ApiError::Status { endpoint, .. }
            | ApiError::Rejected { endpoint, .. }
            | ApiError::Transport { endpoint, .. }
            | ApiError::Decode { endpoint, .. } => endpoint,
        }
    }
}

/// 批次级错误
///
/// 只有这些错误会让整批直接失败，单项失败只进报告
#[derive(Debug, Error)]
pub enum BatchError {
    /// 输入为空
    #[error("{operation} 至少需要一项输入")]
    EmptyInput { operation: String },
    /// 批次准备阶段失败（列出章节、预先解析名称等）
    #[error("批次准备失败 ({step}): {source}")]
    Setup {
        step: String,
        #[source]
        source: ApiError,
    },
    /// 工具参数无法解析
    #[error("工具 {tool} 参数无效: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
    /// 未知工具
    #[error("未知工具: {name}")]
    UnknownTool { name: String },
}

impl BatchError {
    pub fn empty_input(operation: impl Into<String>) -> Self {
        BatchError::EmptyInput {
            operation: operation.into(),
        }
    }

    pub fn setup(step: impl Into<String>, source: ApiError) -> Self {
        BatchError::Setup {
            step: step.into(),
            source,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置 {var_name} 的值 '{value}' 不合法: 需要 {expected}")]
    InvalidValue {
        var_name: String,
        value: String,
        expected: String,
    },
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    #[error("批次错误: {0}")]
    Batch(#[from] BatchError),
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    #[error("报告序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

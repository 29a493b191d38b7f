//! HTTP 远程调用 - 基础设施层
//!
//! 持有唯一的 `reqwest::Client`，只暴露"调用远程 API"的能力：
//! - 不认识批次 / 重试
//! - 把非 2xx 响应和 `success: false` 统一转换成 `ApiError`

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::infrastructure::remote_api::{CardApi, ContainerApi};
use crate::models::{Card, CardMove, CardPatch, Container, NewCard};

/// 远程 API 响应包装
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    message: String,
}

fn default_success() -> bool {
    true
}

/// HTTP 远程调用客户端
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpRemote {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    /// 使用自定义地址创建（默认超时）
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// 发起一次调用
    ///
    /// # 参数
    /// - `method`: HTTP 方法
    /// - `path`: 以 `/` 开头的路径
    /// - `body`: JSON 请求体（可选）
    ///
    /// # 返回
    /// 响应包装中的 `data` 字段
    pub async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let endpoint = format!("{} {}", method, path);
        let url = format!("{}{}", self.base_url, path);

        debug!("调用 {}", endpoint);

        let mut request = self
            .client
            .request(method, &url)
            .header("Accept", "application/json");
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| ApiError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let text = response.text().await.map_err(|source| ApiError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        if !status.is_success() {
            let message = first_error_message(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string()
            });
            debug!("{} 返回 HTTP {}: {}", endpoint, status.as_u16(), message);
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let envelope: Envelope = serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            endpoint: endpoint.clone(),
            source,
        })?;

        if !envelope.success {
            let mut messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            if messages.is_empty() {
                messages.push("未知错误".to_string());
            }
            return Err(ApiError::Rejected { endpoint, messages });
        }

        Ok(envelope.data)
    }

    /// 调用并把 `data` 反序列化为指定类型
    async fn call_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let endpoint = format!("{} {}", method, path);
        let data = self.call(method, path, body).await?;
        serde_json::from_value(data).map_err(|source| ApiError::Decode { endpoint, source })
    }
}

/// 从错误响应体中取第一条错误信息
fn first_error_message(text: &str) -> Option<String> {
    let body: Value = serde_json::from_str(text).ok()?;
    body.get("errors")
        .and_then(|v| v.as_array())
        .and_then(|errors| errors.first())
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .or_else(|| body.get("message").and_then(|m| m.as_str()))
        .map(str::to_string)
}

/// 路径中的一段，`/` 等字符会被转义
fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

fn to_body<T: serde::Serialize>(endpoint: &str, value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[async_trait]
impl ContainerApi for HttpRemote {
    async fn list_containers(&self, parent_id: &str) -> Result<Vec<Container>, ApiError> {
        let path = format!("/decks/{}/chapters", segment(parent_id));
        self.call_as(Method::GET, &path, None).await
    }

    async fn create_container(&self, parent_id: &str, name: &str) -> Result<Container, ApiError> {
        let path = format!("/decks/{}/chapters", segment(parent_id));
        let body = json!({ "name": name });
        self.call_as(Method::POST, &path, Some(&body)).await
    }
}

#[async_trait]
impl CardApi for HttpRemote {
    async fn create_card(&self, card: &NewCard) -> Result<Card, ApiError> {
        let body = to_body("POST /cards", card)?;
        self.call_as(Method::POST, "/cards", Some(&body)).await
    }

    async fn get_card(&self, card_id: &str) -> Result<Card, ApiError> {
        let path = format!("/cards/{}", segment(card_id));
        self.call_as(Method::GET, &path, None).await
    }

    async fn update_card(&self, card_id: &str, patch: &CardPatch) -> Result<Card, ApiError> {
        let path = format!("/cards/{}", segment(card_id));
        let body = to_body(&path, patch)?;
        self.call_as(Method::PATCH, &path, Some(&body)).await
    }

    async fn move_card(&self, card_id: &str, target: &CardMove) -> Result<Card, ApiError> {
        let path = format!("/cards/{}/move", segment(card_id));
        let body = to_body(&path, target)?;
        self.call_as(Method::POST, &path, Some(&body)).await
    }

    async fn delete_card(&self, card_id: &str) -> Result<(), ApiError> {
        let path = format!("/cards/{}", segment(card_id));
        self.call(Method::DELETE, &path, None).await?;
        Ok(())
    }
}

//! 重试执行器 - 业务能力层
//!
//! 只负责"把一次远程调用包上有限次重试"这一能力：
//! - 只对可重试的失败分类（冲突、限流、服务端错误）重试
//! - 指数退避，`tokio::time::sleep` 只挂起当前任务
//! - 重试耗尽或不可重试时，原样返回最后一次的错误

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::{ApiError, FailureClass};

/// 可被重试策略分类的错误
pub trait Retryable {
    /// 失败分类
    fn failure_class(&self) -> FailureClass;

    /// 服务端建议的等待时间
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for ApiError {
    fn failure_class(&self) -> FailureClass {
        self.class()
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after_secs().map(Duration::from_secs)
    }
}

/// 重试策略
///
/// 整个批次共享同一份，创建后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 最大尝试次数（包含第一次）
    pub max_attempts: u32,
    /// 第一次重试前的等待时间
    pub base_delay: Duration,
    /// 退避倍数
    pub backoff_multiplier: f64,
    /// 单次等待上限
    pub max_delay: Duration,
    /// 会触发重试的失败分类
    pub retryable: Vec<FailureClass>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            retryable: vec![
                FailureClass::Conflict,
                FailureClass::RateLimited,
                FailureClass::ServerError,
            ],
        }
    }
}

impl RetryPolicy {
    /// 只尝试一次的策略
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// 该分类是否可重试
    pub fn is_retryable(&self, class: FailureClass) -> bool {
        self.retryable.contains(&class)
    }

    /// 第 `attempt_index` 次失败（从 0 开始）之后的等待时间
    ///
    /// `base_delay * backoff_multiplier ^ attempt_index`，不超过 `max_delay`
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// 重试执行器
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// 创建新的重试执行器
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 执行一次远程调用（带重试逻辑）
    ///
    /// # 参数
    /// - `label`: 操作名称（仅用于日志）
    /// - `op`: 每次尝试都会重新调用，生成新的 future
    ///
    /// # 返回
    /// 成功值，或最后一次失败的原始错误
    pub async fn execute<F, Fut, T, E>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} 第 {} 次尝试成功", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let class = err.failure_class();

                    if !self.policy.is_retryable(class) {
                        debug!("{} 失败 ({})，不重试: {}", label, class, err);
                        return Err(err);
                    }

                    if attempt >= max_attempts {
                        error!("{} 已重试 {} 次仍失败: {}", label, attempt, err);
                        return Err(err);
                    }

                    let delay = self.delay_after(&err, attempt - 1);
                    warn!(
                        "{} 失败 ({}) (尝试 {}/{}), 等待 {}ms 后重试: {}",
                        label,
                        class,
                        attempt,
                        max_attempts,
                        delay.as_millis(),
                        err
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// 退避时间，服务端给了 `Retry-After` 时取两者较大值
    fn delay_after<E: Retryable>(&self, err: &E, attempt_index: u32) -> Duration {
        let backoff = self.policy.delay_for(attempt_index);
        match err.retry_after() {
            Some(hint) => backoff.max(hint).min(self.policy.max_delay),
            None => backoff,
        }
    }
}

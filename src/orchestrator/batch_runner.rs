//! 批次执行器 - 编排层
//!
//! ## 职责
//!
//! 把一批互相独立的输入项逐个（或并发）交给重试执行器，
//! 每一项都走到终态（成功 / 失败），最后汇总成 `BatchReport`。
//!
//! ## 单项状态
//!
//! ```text
//! Pending → Resolving(可选) → Attempting(1..max_attempts) → Succeeded | Failed
//! ```
//!
//! ## 调度模式
//!
//! - `Serial`：上一项到达终态后才开始下一项。用于带顺序的写入，
//!   或在同一父资源上突发写入会产生冲突 / 锁的操作。
//! - `Concurrent`：所有项在当前任务上交错执行（`join_all`），
//!   同时进行的数量受 `Semaphore` 限制。一项失败不会取消其他项。
//!
//! 只有批次准备阶段（列出章节、并发模式下预先解析名称）失败才会让整批失败。

use std::future::Future;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{ApiError, BatchError};
use crate::infrastructure::ContainerApi;
use crate::orchestrator::report::{BatchReport, OperationOutcome};
use crate::services::{ResourceResolver, RetryExecutor};
use crate::utils::logging;

/// 调度模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    #[default]
    Serial,
    Concurrent,
}

impl SchedulingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SchedulingMode::Serial => "serial",
            SchedulingMode::Concurrent => "concurrent",
        }
    }
}

/// 批次中的一项输入
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem<I> {
    /// 报告中用来标识这一项（卡片 ID、章节名、输入序号等）
    pub key: String,
    pub input: I,
}

impl<I> WorkItem<I> {
    pub fn new(key: impl Into<String>, input: I) -> Self {
        Self {
            key: key.into(),
            input,
        }
    }

    /// 按输入序号生成 key：`#1`, `#2`, ...
    pub fn indexed(inputs: impl IntoIterator<Item = I>) -> Vec<Self> {
        inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| Self::new(format!("#{}", i + 1), input))
            .collect()
    }
}

/// 批次执行器
pub struct BatchRunner {
    executor: RetryExecutor,
    limiter: Semaphore,
    label: String,
}

impl BatchRunner {
    /// 创建新的批次执行器
    ///
    /// # 参数
    /// - `executor`: 每一项共用的重试执行器
    /// - `max_concurrent`: 并发模式下同时进行的项数上限（至少为 1）
    pub fn new(executor: RetryExecutor, max_concurrent: usize) -> Self {
        Self {
            executor,
            limiter: Semaphore::new(max_concurrent.max(1)),
            label: "batch".to_string(),
        }
    }

    /// 设置批次名称（用于日志和错误信息）
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// 执行一批操作
    ///
    /// # 参数
    /// - `items`: 输入项，不能为空
    /// - `mode`: 调度模式
    /// - `op`: 单项操作；每次尝试都会用输入的克隆重新调用
    ///
    /// # 返回
    /// 与输入等长、同序的报告
    pub async fn run_batch<I, T, F, Fut>(
        &self,
        items: Vec<WorkItem<I>>,
        mode: SchedulingMode,
        op: F,
    ) -> Result<BatchReport<T>, BatchError>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if items.is_empty() {
            return Err(BatchError::empty_input(&self.label));
        }

        let total = items.len();
        logging::log_batch_start(&self.label, total, mode.as_str());

        let op = &op;
        let outcomes = match mode {
            SchedulingMode::Serial => {
                let mut outcomes = Vec::with_capacity(total);
                for item in items {
                    outcomes.push(self.attempt(item, op).await);
                }
                outcomes
            }
            SchedulingMode::Concurrent => {
                join_all(items.into_iter().map(|item| async move {
                    let _permit = self.limiter.acquire().await.ok();
                    self.attempt(item, op).await
                }))
                .await
            }
        };

        Ok(self.finish(outcomes))
    }

    /// 执行一批需要先把名称解析成容器 ID 的操作
    ///
    /// # 参数
    /// - `resolver`: 本批次的资源解析器
    /// - `name_of`: 取出该项引用的容器名称，没有则返回 `None`
    /// - `op`: 单项操作，第二个参数是解析得到的容器 ID
    ///
    /// 串行模式下逐项解析，解析失败只让该项失败；
    /// 并发模式下先串行解析所有不同的名称，任何一个失败都让整批失败。
    pub async fn run_resolved_batch<A, I, T, N, F, Fut>(
        &self,
        items: Vec<WorkItem<I>>,
        mode: SchedulingMode,
        resolver: &ResourceResolver<'_, A>,
        name_of: N,
        op: F,
    ) -> Result<BatchReport<T>, BatchError>
    where
        A: ContainerApi + ?Sized,
        I: Clone,
        N: Fn(&I) -> Option<String>,
        F: Fn(I, Option<String>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if items.is_empty() {
            return Err(BatchError::empty_input(&self.label));
        }

        let total = items.len();
        logging::log_batch_start(&self.label, total, mode.as_str());

        let op = &op;
        let name_of = &name_of;
        let outcomes = match mode {
            SchedulingMode::Serial => {
                let mut outcomes = Vec::with_capacity(total);
                for item in items {
                    outcomes.push(self.resolve_then_attempt(item, resolver, name_of, op).await);
                }
                outcomes
            }
            SchedulingMode::Concurrent => {
                let names: Vec<String> = items.iter().filter_map(|i| name_of(&i.input)).collect();
                resolver
                    .resolve_all(names.iter().map(String::as_str))
                    .await
                    .map_err(|e| BatchError::setup(format!("[{}] 预先解析章节", self.label), e))?;

                join_all(items.into_iter().map(|item| async move {
                    let _permit = self.limiter.acquire().await.ok();
                    self.resolve_then_attempt(item, resolver, name_of, op).await
                }))
                .await
            }
        };

        Ok(self.finish(outcomes))
    }

    /// Resolving → Attempting
    async fn resolve_then_attempt<A, I, T, N, F, Fut>(
        &self,
        item: WorkItem<I>,
        resolver: &ResourceResolver<'_, A>,
        name_of: &N,
        op: &F,
    ) -> OperationOutcome<T>
    where
        A: ContainerApi + ?Sized,
        I: Clone,
        N: Fn(&I) -> Option<String>,
        F: Fn(I, Option<String>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let resolved = match name_of(&item.input) {
            Some(name) => {
                debug!("[{}] {} 解析章节 {}", self.label, item.key, name);
                match resolver.resolve(&name).await {
                    Ok(id) => Some(id),
                    Err(err) => {
                        warn!("[{}] ❌ {} 解析章节 {} 失败: {}", self.label, item.key, name, err);
                        return OperationOutcome::failed(item.key, &err);
                    }
                }
            }
            None => None,
        };

        self.attempt(item, &|input: I| op(input, resolved.clone())).await
    }

    /// Attempting → Succeeded | Failed
    async fn attempt<I, T, F, Fut>(&self, item: WorkItem<I>, op: &F) -> OperationOutcome<T>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let WorkItem { key, input } = item;
        let label = format!("[{}] {}", self.label, key);

        match self.executor.execute(&label, || op(input.clone())).await {
            Ok(value) => {
                debug!("{} ✓ 成功", label);
                OperationOutcome::succeeded(key, value)
            }
            Err(err) => {
                warn!("{} ❌ 失败: {}", label, err);
                OperationOutcome::failed(key, &err)
            }
        }
    }

    fn finish<T>(&self, outcomes: Vec<OperationOutcome<T>>) -> BatchReport<T> {
        let report = BatchReport::build(outcomes);
        logging::log_batch_complete(&self.label, report.succeeded, report.total());
        report
    }
}

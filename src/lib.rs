//! # Deck Batch
//!
//! 面向远程卡片 API 的批量执行核心
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 HTTP 客户端，只暴露远程调用能力
//! - `HttpRemote` - `ContainerApi` / `CardApi` 的 HTTP 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 只处理一次调用 / 一个名称
//! - `RetryExecutor` - 按失败分类做指数退避重试
//! - `ResourceResolver` - 章节名称 → ID，缺失时创建
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_runner` - 串行 / 并发执行一批独立操作
//! - `orchestrator/report` - 汇总成按输入顺序排列的 `BatchReport`
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 一个工具调用 = 一批同类输入
//! - `DeckTools` - create_cards / move_cards / update_cards / ...
//!
//! ### ⑤ 应用层
//! - `app` - 扫描任务目录，依次执行任务并写日志文件

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
mod testing;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{ApiError, AppError, AppResult, BatchError, FailureClass};
pub use infrastructure::{CardApi, ContainerApi, DeckApi, HttpRemote};
pub use orchestrator::{BatchReport, BatchRunner, OperationOutcome, SchedulingMode, WorkItem};
pub use services::{ResourceResolver, RetryExecutor, RetryPolicy, Retryable};
pub use workflow::{DeckTools, ToolCall};

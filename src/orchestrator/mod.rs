//! 编排层（Orchestration）
//!
//! ## 模块划分
//!
//! ### `batch_runner` - 批次执行器
//! - 串行 / 并发调度一批互相独立的操作
//! - 每一项都经过重试执行器（需要时先经过资源解析器）
//! - 一项失败不影响其他项
//!
//! ### `report` - 批次报告
//! - 按输入顺序汇总每一项的结果
//! - 给出成功 / 失败数量、汇总文本和失败标记
//!
//! ## 层次关系
//!
//! ```text
//! workflow::deck_tools (一个工具 = 一批输入)
//!     ↓
//! orchestrator::batch_runner (处理 Vec<WorkItem>)
//!     ↓
//! services (能力层：retry_executor / resource_resolver)
//!     ↓
//! infrastructure (基础设施：HttpRemote)
//! ```

pub mod batch_runner;
pub mod report;

pub use batch_runner::{BatchRunner, SchedulingMode, WorkItem};
pub use report::{BatchReport, OperationOutcome};

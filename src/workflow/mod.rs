//! 流程层（Workflow）
//!
//! 定义"一个工具调用"的完整处理流程：
//!
//! ```text
//! ToolCall { tool, arguments }
//!     → 解析参数（tool_args）
//!     → 选择调度模式 / 建立资源解析器
//!     → BatchRunner 执行
//!     → BatchReport 转成 JSON
//! ```

pub mod deck_tools;
pub mod tool_args;

pub use deck_tools::{ChapterResult, DeckTools, ToolCall, TOOL_NAMES};
pub use tool_args::{
    CardIdsArgs, CardSpec, CardUpdate, CreateCardsArgs, CreateChaptersArgs, ListChaptersArgs,
    MoveCardsArgs, MoveRequest, UpdateCardsArgs,
};

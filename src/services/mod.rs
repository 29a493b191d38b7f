//! 业务能力层（Services）
//!
//! 只处理"一次调用 / 一个名称"，不出现批次

pub mod resource_resolver;
pub mod retry_executor;

pub use resource_resolver::ResourceResolver;
pub use retry_executor::{RetryExecutor, RetryPolicy, Retryable};

//! 基础设施层（Infrastructure）
//!
//! 持有 HTTP 客户端，只暴露远程调用能力

pub mod http_remote;
pub mod remote_api;

pub use http_remote::HttpRemote;
pub use remote_api::{CardApi, ContainerApi, DeckApi};

//! 远程 API 能力接口
//!
//! 核心层只依赖这些 trait，不依赖具体的 HTTP 实现

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{Card, CardMove, CardPatch, Container, NewCard};

/// 容器（章节）相关调用
#[async_trait]
pub trait ContainerApi: Send + Sync {
    /// 列出父资源下已有的容器
    async fn list_containers(&self, parent_id: &str) -> Result<Vec<Container>, ApiError>;

    /// 在父资源下创建容器
    async fn create_container(&self, parent_id: &str, name: &str) -> Result<Container, ApiError>;
}

/// 卡片相关调用
#[async_trait]
pub trait CardApi: Send + Sync {
    async fn create_card(&self, card: &NewCard) -> Result<Card, ApiError>;

    async fn get_card(&self, card_id: &str) -> Result<Card, ApiError>;

    async fn update_card(&self, card_id: &str, patch: &CardPatch) -> Result<Card, ApiError>;

    async fn move_card(&self, card_id: &str, target: &CardMove) -> Result<Card, ApiError>;

    async fn delete_card(&self, card_id: &str) -> Result<(), ApiError>;
}

/// 完整的牌组 API
pub trait DeckApi: ContainerApi + CardApi {}

impl<T: ContainerApi + CardApi> DeckApi for T {}

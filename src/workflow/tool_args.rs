//! 工具参数
//!
//! 每个工具接收一个 JSON 对象；`mode` 省略时使用该工具的默认调度模式

use serde::Deserialize;

use crate::models::CardPatch;
use crate::orchestrator::SchedulingMode;

/// 要创建的一张卡片
#[derive(Debug, Clone, Deserialize)]
pub struct CardSpec {
    pub content: String,
    /// 章节名称，不存在时自动创建
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCardsArgs {
    pub deck_id: String,
    pub cards: Vec<CardSpec>,
    #[serde(default)]
    pub mode: Option<SchedulingMode>,
}

/// 把一张卡片移动到目标牌组（及章节）
#[derive(Debug, Clone, Deserialize)]
pub struct MoveRequest {
    pub card_id: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveCardsArgs {
    /// 目标牌组
    pub deck_id: String,
    pub moves: Vec<MoveRequest>,
    #[serde(default)]
    pub mode: Option<SchedulingMode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardUpdate {
    pub card_id: String,
    #[serde(flatten)]
    pub patch: CardPatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCardsArgs {
    pub updates: Vec<CardUpdate>,
    #[serde(default)]
    pub mode: Option<SchedulingMode>,
}

/// `delete_cards` / `get_cards` 共用
#[derive(Debug, Clone, Deserialize)]
pub struct CardIdsArgs {
    pub card_ids: Vec<String>,
    #[serde(default)]
    pub mode: Option<SchedulingMode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChaptersArgs {
    pub deck_id: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListChaptersArgs {
    pub deck_id: String,
}

//! 牌组工具 - 流程层
//!
//! 每个工具对应"一批同类输入"，负责：
//! - 选择调度模式（调用方可用 `mode` 覆盖）
//! - 需要时建立本批次的资源解析器
//! - 把单项输入转换成一次远程调用，交给 `BatchRunner`
//!
//! 默认调度模式：
//! - 创建 / 移动 / 更新：串行（位置依赖调用顺序，突发写入同一牌组容易冲突）
//! - 删除 / 读取：并发

use std::collections::HashSet;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::{ApiError, AppResult, BatchError};
use crate::infrastructure::DeckApi;
use crate::models::{CardMove, Container, NewCard};
use crate::orchestrator::{BatchReport, BatchRunner, SchedulingMode, WorkItem};
use crate::services::{ResourceResolver, RetryExecutor};
use crate::utils::truncate_text;
use crate::workflow::tool_args::{
    CardIdsArgs, CardSpec, CardUpdate, CreateCardsArgs, CreateChaptersArgs, ListChaptersArgs,
    MoveCardsArgs, MoveRequest, UpdateCardsArgs,
};

/// 支持的工具名称
pub const TOOL_NAMES: &[&str] = &[
    "create_cards",
    "move_cards",
    "update_cards",
    "delete_cards",
    "get_cards",
    "create_chapters",
    "list_chapters",
];

/// 一次工具调用
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }
}

/// `create_chapters` 中每一项的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterResult {
    pub id: String,
    pub name: String,
    /// 本次调用新建的（而不是已存在的）
    pub created: bool,
}

/// 牌组工具集
///
/// 不持有批次状态，每次调用都从新的解析器缓存开始
pub struct DeckTools<'a, A: DeckApi + ?Sized> {
    api: &'a A,
    executor: RetryExecutor,
    max_concurrent: usize,
}

impl<'a, A: DeckApi + ?Sized> DeckTools<'a, A> {
    pub fn new(api: &'a A, executor: RetryExecutor, max_concurrent: usize) -> Self {
        Self {
            api,
            executor,
            max_concurrent,
        }
    }

    /// 按配置创建
    pub fn from_config(api: &'a A, config: &Config) -> Self {
        Self::new(
            api,
            RetryExecutor::new(config.retry_policy()),
            config.max_concurrent_operations,
        )
    }

    /// 按名称分发工具调用
    ///
    /// # 返回
    /// 批量工具返回 `BatchReport` 的 JSON；`list_chapters` 返回章节数组
    pub async fn invoke(&self, call: ToolCall) -> AppResult<Value> {
        let ToolCall { tool, arguments } = call;
        match tool.as_str() {
            "create_cards" => self.create_cards(parse_args(&tool, arguments)?).await,
            "move_cards" => self.move_cards(parse_args(&tool, arguments)?).await,
            "update_cards" => self.update_cards(parse_args(&tool, arguments)?).await,
            "delete_cards" => self.delete_cards(parse_args(&tool, arguments)?).await,
            "get_cards" => self.get_cards(parse_args(&tool, arguments)?).await,
            "create_chapters" => self.create_chapters(parse_args(&tool, arguments)?).await,
            "list_chapters" => self.list_chapters(parse_args(&tool, arguments)?).await,
            _ => Err(BatchError::UnknownTool { name: tool }.into()),
        }
    }

    /// 批量创建卡片，`chapter` 按名称解析（不存在则创建）
    pub async fn create_cards(&self, args: CreateCardsArgs) -> AppResult<Value> {
        let runner = self.runner("create_cards");
        let mode = args.mode.unwrap_or(SchedulingMode::Serial);
        let items = WorkItem::indexed(args.cards);
        if items.is_empty() {
            return Err(BatchError::empty_input("create_cards").into());
        }

        let api = self.api;
        let deck_id = args.deck_id.as_str();
        let create = |spec: CardSpec, chapter_id: Option<String>| async move {
            info!("📤 创建卡片: {}", truncate_text(&spec.content, 40));
            let card = NewCard {
                content: spec.content,
                deck_id: deck_id.to_string(),
                chapter_id,
                pos: spec.pos,
                tags: spec.tags,
            };
            api.create_card(&card).await
        };

        let report = if items.iter().any(|i| i.input.chapter.is_some()) {
            let resolver = ResourceResolver::load(api, runner.executor(), deck_id).await?;
            runner
                .run_resolved_batch(
                    items,
                    mode,
                    &resolver,
                    |spec: &CardSpec| spec.chapter.clone(),
                    create,
                )
                .await?
        } else {
            runner
                .run_batch(items, mode, |spec: CardSpec| create(spec, None))
                .await?
        };

        Ok(report.to_json()?)
    }

    /// 批量移动卡片到目标牌组（可指定章节和位置）
    pub async fn move_cards(&self, args: MoveCardsArgs) -> AppResult<Value> {
        let runner = self.runner("move_cards");
        let mode = args.mode.unwrap_or(SchedulingMode::Serial);
        let items: Vec<_> = args
            .moves
            .into_iter()
            .map(|m| WorkItem::new(m.card_id.clone(), m))
            .collect();
        if items.is_empty() {
            return Err(BatchError::empty_input("move_cards").into());
        }

        let api = self.api;
        let deck_id = args.deck_id.as_str();
        let relocate = |request: MoveRequest, chapter_id: Option<String>| async move {
            let target = CardMove {
                deck_id: deck_id.to_string(),
                chapter_id,
                pos: request.pos,
            };
            api.move_card(&request.card_id, &target).await
        };

        let report = if items.iter().any(|i| i.input.chapter.is_some()) {
            let resolver = ResourceResolver::load(api, runner.executor(), deck_id).await?;
            runner
                .run_resolved_batch(
                    items,
                    mode,
                    &resolver,
                    |request: &MoveRequest| request.chapter.clone(),
                    relocate,
                )
                .await?
        } else {
            runner
                .run_batch(items, mode, |request: MoveRequest| relocate(request, None))
                .await?
        };

        Ok(report.to_json()?)
    }

    /// 批量更新卡片
    ///
    /// 没有任何字段的更新不发请求，直接记为校验失败
    pub async fn update_cards(&self, args: UpdateCardsArgs) -> AppResult<Value> {
        let runner = self.runner("update_cards");
        let mode = args.mode.unwrap_or(SchedulingMode::Serial);
        let items: Vec<_> = args
            .updates
            .into_iter()
            .map(|u| WorkItem::new(u.card_id.clone(), u))
            .collect();

        let api = self.api;
        let report = runner
            .run_batch(items, mode, |update: CardUpdate| async move {
                if update.patch.is_empty() {
                    return Err(ApiError::rejected(
                        format!("PATCH /cards/{}", update.card_id),
                        vec!["没有需要修改的字段".to_string()],
                    ));
                }
                api.update_card(&update.card_id, &update.patch).await
            })
            .await?;

        Ok(report.to_json()?)
    }

    /// 批量删除卡片
    pub async fn delete_cards(&self, args: CardIdsArgs) -> AppResult<Value> {
        let runner = self.runner("delete_cards");
        let mode = args.mode.unwrap_or(SchedulingMode::Concurrent);
        let items = keyed_by_id(args.card_ids);

        let api = self.api;
        let report = runner
            .run_batch(items, mode, |card_id: String| async move {
                api.delete_card(&card_id).await
            })
            .await?;

        Ok(report.to_json()?)
    }

    /// 批量读取卡片
    pub async fn get_cards(&self, args: CardIdsArgs) -> AppResult<Value> {
        let runner = self.runner("get_cards");
        let mode = args.mode.unwrap_or(SchedulingMode::Concurrent);
        let items = keyed_by_id(args.card_ids);

        let api = self.api;
        let report = runner
            .run_batch(items, mode, |card_id: String| async move {
                api.get_card(&card_id).await
            })
            .await?;

        Ok(report.to_json()?)
    }

    /// 批量创建章节：已存在的直接复用，同名只创建一次
    pub async fn create_chapters(&self, args: CreateChaptersArgs) -> AppResult<Value> {
        let report = self.ensure_chapters(args).await?;
        Ok(report.to_json()?)
    }

    async fn ensure_chapters(
        &self,
        args: CreateChaptersArgs,
    ) -> Result<BatchReport<ChapterResult>, BatchError> {
        let runner = self.runner("create_chapters");
        let items: Vec<_> = args
            .names
            .into_iter()
            .map(|name| WorkItem::new(name.clone(), name))
            .collect();
        if items.is_empty() {
            return Err(BatchError::empty_input("create_chapters"));
        }

        let resolver = ResourceResolver::load(self.api, runner.executor(), &args.deck_id).await?;
        let known = Mutex::new(
            items
                .iter()
                .filter(|i| resolver.cached_id(&i.input).is_some())
                .map(|i| i.input.clone())
                .collect::<HashSet<_>>(),
        );

        // 串行解析，保证同名只创建一次
        runner
            .run_resolved_batch(
                items,
                SchedulingMode::Serial,
                &resolver,
                |name: &String| Some(name.clone()),
                |name: String, id: Option<String>| {
                    let created = known
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(name.clone());
                    async move {
                        Ok::<_, ApiError>(ChapterResult {
                            id: id.unwrap_or_default(),
                            name,
                            created,
                        })
                    }
                },
            )
            .await
    }

    /// 列出牌组下的章节
    pub async fn list_chapters(&self, args: ListChaptersArgs) -> AppResult<Value> {
        let api = self.api;
        let deck_id = args.deck_id.as_str();
        let label = format!("列出 {} 的章节", deck_id);

        let chapters: Vec<Container> = self
            .executor
            .execute(&label, || api.list_containers(deck_id))
            .await?;

        info!("✓ {} 下共有 {} 个章节", deck_id, chapters.len());
        Ok(serde_json::to_value(chapters)?)
    }

    /// 每次调用新建一个执行器，并发许可只属于这一批
    fn runner(&self, label: &str) -> BatchRunner {
        BatchRunner::new(self.executor.clone(), self.max_concurrent).with_label(label)
    }
}

fn keyed_by_id(card_ids: Vec<String>) -> Vec<WorkItem<String>> {
    card_ids
        .into_iter()
        .map(|id| WorkItem::new(id.clone(), id))
        .collect()
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, BatchError> {
    serde_json::from_value(arguments).map_err(|source| BatchError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

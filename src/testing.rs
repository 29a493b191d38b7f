//! 测试用的内存版远程 API
//!
//! 记录每次调用，可按调用键预设失败次数

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::infrastructure::{CardApi, ContainerApi};
use crate::models::{Card, CardMove, CardPatch, Container, NewCard};

type MakeError = Box<dyn Fn() -> ApiError + Send + Sync>;

struct ScriptedFailure {
    remaining: u32,
    make: MakeError,
}

#[derive(Default)]
struct FakeState {
    containers: HashMap<String, Vec<Container>>,
    cards: HashMap<String, Card>,
    next_id: u32,
    calls: Vec<String>,
    failures: HashMap<String, ScriptedFailure>,
    in_flight: usize,
    max_in_flight: usize,
}

/// 内存版牌组 API
#[derive(Default)]
pub(crate) struct FakeDeck {
    state: Mutex<FakeState>,
    latency: Duration,
}

impl FakeDeck {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 每次调用都会先 sleep 一段时间，用于观察并发
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn with_containers(self, parent_id: &str, containers: &[(&str, &str)]) -> Self {
        self.state.lock().unwrap().containers.insert(
            parent_id.to_string(),
            containers
                .iter()
                .map(|(id, name)| Container::new(*id, *name))
                .collect(),
        );
        self
    }

    pub(crate) fn with_card(self, id: &str, deck_id: &str, content: &str) -> Self {
        self.state.lock().unwrap().cards.insert(
            id.to_string(),
            Card {
                id: id.to_string(),
                content: content.to_string(),
                deck_id: deck_id.to_string(),
                chapter_id: None,
                pos: None,
                archived: false,
                tags: Vec::new(),
            },
        );
        self
    }

    /// 预设失败：调用键 `key` 的前 `times` 次调用返回 `make()`
    pub(crate) fn fail(
        self,
        key: &str,
        times: u32,
        make: impl Fn() -> ApiError + Send + Sync + 'static,
    ) -> Self {
        self.state.lock().unwrap().failures.insert(
            key.to_string(),
            ScriptedFailure {
                remaining: times,
                make: Box::new(make),
            },
        );
        self
    }

    /// 预设永久失败
    pub(crate) fn fail_always(
        self,
        key: &str,
        make: impl Fn() -> ApiError + Send + Sync + 'static,
    ) -> Self {
        self.fail(key, u32::MAX, make)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// 调用键等于 `key` 的次数
    pub(crate) fn count(&self, key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == key)
            .count()
    }

    /// 调用键以 `prefix` 开头的次数
    pub(crate) fn count_prefix(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub(crate) fn card(&self, id: &str) -> Option<Card> {
        self.state.lock().unwrap().cards.get(id).cloned()
    }

    pub(crate) fn containers(&self, parent_id: &str) -> Vec<Container> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(parent_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn enter(&self, key: String) -> Result<(), ApiError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(key.clone());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        if let Some(failure) = state.failures.get_mut(&key) {
            if failure.remaining > 0 {
                failure.remaining -= 1;
                return Err((failure.make)());
            }
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        format!("{}{}", prefix, state.next_id)
    }

    fn not_found(endpoint: String) -> ApiError {
        ApiError::status(endpoint, 404, "Not Found")
    }
}

#[async_trait]
impl ContainerApi for FakeDeck {
    async fn list_containers(&self, parent_id: &str) -> Result<Vec<Container>, ApiError> {
        self.enter(format!("list_containers:{}", parent_id)).await?;
        Ok(self.containers(parent_id))
    }

    async fn create_container(&self, parent_id: &str, name: &str) -> Result<Container, ApiError> {
        self.enter(format!("create_container:{}", name)).await?;
        let container = Container::new(self.next_id("ch"), name);
        self.state
            .lock()
            .unwrap()
            .containers
            .entry(parent_id.to_string())
            .or_default()
            .push(container.clone());
        Ok(container)
    }
}

#[async_trait]
impl CardApi for FakeDeck {
    async fn create_card(&self, card: &NewCard) -> Result<Card, ApiError> {
        self.enter(format!("create_card:{}", card.content)).await?;
        let created = Card {
            id: self.next_id("card"),
            content: card.content.clone(),
            deck_id: card.deck_id.clone(),
            chapter_id: card.chapter_id.clone(),
            pos: card.pos.clone(),
            archived: false,
            tags: card.tags.clone(),
        };
        self.state
            .lock()
            .unwrap()
            .cards
            .insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_card(&self, card_id: &str) -> Result<Card, ApiError> {
        self.enter(format!("get_card:{}", card_id)).await?;
        self.card(card_id)
            .ok_or_else(|| Self::not_found(format!("GET /cards/{}", card_id)))
    }

    async fn update_card(&self, card_id: &str, patch: &CardPatch) -> Result<Card, ApiError> {
        self.enter(format!("update_card:{}", card_id)).await?;
        let mut state = self.state.lock().unwrap();
        let card = state
            .cards
            .get_mut(card_id)
            .ok_or_else(|| Self::not_found(format!("PATCH /cards/{}", card_id)))?;
        if let Some(content) = &patch.content {
            card.content = content.clone();
        }
        if let Some(archived) = patch.archived {
            card.archived = archived;
        }
        if let Some(tags) = &patch.tags {
            card.tags = tags.clone();
        }
        Ok(card.clone())
    }

    async fn move_card(&self, card_id: &str, target: &CardMove) -> Result<Card, ApiError> {
        self.enter(format!("move_card:{}", card_id)).await?;
        let mut state = self.state.lock().unwrap();
        let card = state
            .cards
            .get_mut(card_id)
            .ok_or_else(|| Self::not_found(format!("POST /cards/{}/move", card_id)))?;
        card.deck_id = target.deck_id.clone();
        card.chapter_id = target.chapter_id.clone();
        card.pos = target.pos.clone();
        Ok(card.clone())
    }

    async fn delete_card(&self, card_id: &str) -> Result<(), ApiError> {
        self.enter(format!("delete_card:{}", card_id)).await?;
        self.state
            .lock()
            .unwrap()
            .cards
            .remove(card_id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(format!("DELETE /cards/{}", card_id)))
    }
}

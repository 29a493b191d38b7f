//! 资源解析器 - 业务能力层
//!
//! 把名称解析成远程容器 ID：
//! - 批次开始时列出一次已有容器，建立 name → id 缓存（同名时后出现的覆盖前面的）
//! - 缓存命中直接返回，不发请求
//! - 未命中则通过重试执行器创建容器并写入缓存
//! - 缓存只属于一次批处理，批次结束即丢弃
//!
//! 不同名称可以并发解析。同一个尚未缓存的名称被并发解析时，
//! 两次创建可能同时发出，得到两个同名容器；需要严格幂等时，
//! 先用 `resolve_all` 串行解析所有名称再并发执行后续操作。

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::error::{ApiError, BatchError};
use crate::infrastructure::ContainerApi;
use crate::models::Container;
use crate::services::RetryExecutor;

/// 批次范围内的资源解析器
pub struct ResourceResolver<'a, A: ContainerApi + ?Sized> {
    api: &'a A,
    executor: &'a RetryExecutor,
    parent_id: String,
    cache: Mutex<HashMap<String, String>>,
}

impl<A: ContainerApi + ?Sized> fmt::Debug for ResourceResolver<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("parent_id", &self.parent_id)
            .field("cache", &*self.lock_cache())
            .finish()
    }
}

impl<'a, A: ContainerApi + ?Sized> ResourceResolver<'a, A> {
    /// 列出父资源下的已有容器并建立缓存
    ///
    /// 列出失败属于批次准备失败
    pub async fn load(
        api: &'a A,
        executor: &'a RetryExecutor,
        parent_id: impl Into<String>,
    ) -> Result<Self, BatchError> {
        let parent_id = parent_id.into();
        let label = format!("列出 {} 的章节", parent_id);

        let existing = executor
            .execute(&label, || api.list_containers(&parent_id))
            .await
            .map_err(|e| BatchError::setup(label.clone(), e))?;

        debug!("{} 下已有 {} 个章节", parent_id, existing.len());

        Ok(Self::from_containers(api, executor, parent_id, existing))
    }

    /// 用已知的容器列表建立缓存
    pub fn from_containers(
        api: &'a A,
        executor: &'a RetryExecutor,
        parent_id: impl Into<String>,
        existing: impl IntoIterator<Item = Container>,
    ) -> Self {
        let cache = existing
            .into_iter()
            .map(|c| (c.name, c.id))
            .collect::<HashMap<_, _>>();

        Self {
            api,
            executor,
            parent_id: parent_id.into(),
            cache: Mutex::new(cache),
        }
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// 已缓存的 ID
    pub fn cached_id(&self, name: &str) -> Option<String> {
        self.lock_cache().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 解析名称
    ///
    /// # 参数
    /// - `name`: 容器名称（区分大小写，不做 trim）
    ///
    /// # 返回
    /// 容器 ID；创建失败时返回创建请求的原始错误，名称保持未解析
    pub async fn resolve(&self, name: &str) -> Result<String, ApiError> {
        if let Some(id) = self.cached_id(name) {
            debug!("章节 {} 命中缓存: {}", name, id);
            return Ok(id);
        }

        let label = format!("创建章节 {}", name);
        let created = self
            .executor
            .execute(&label, || self.api.create_container(&self.parent_id, name))
            .await?;

        info!("✓ 已创建章节 {} ({})", name, created.id);

        let mut cache = self.lock_cache();
        let id = cache
            .entry(name.to_string())
            .or_insert_with(|| created.id.clone())
            .clone();
        if id != created.id {
            warn!(
                "⚠️ 章节 {} 被并发创建了两次，保留 {}，忽略 {}",
                name, id, created.id
            );
        }
        Ok(id)
    }

    /// 按首次出现顺序串行解析所有不同的名称
    ///
    /// 遇到第一个失败即停止
    pub async fn resolve_all<'n, I>(&self, names: I) -> Result<Vec<Container>, ApiError>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for name in names {
            if !seen.insert(name) {
                continue;
            }
            let id = self.resolve(name).await?;
            resolved.push(Container::new(id, name));
        }

        Ok(resolved)
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

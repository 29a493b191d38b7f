use serde::{Deserialize, Serialize};

/// 具名容器（例如牌组下的章节）
///
/// 只在一次批处理内有效，不跨调用缓存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
}

impl Container {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

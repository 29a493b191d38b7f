//! 批次报告
//!
//! 把每一项的结果汇总成一份报告：保持输入顺序，区分成功 / 失败，
//! 同时给出人类可读的文本和机器可读的 JSON。

use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, FailureClass};

/// 单项操作的最终结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome<T> {
    Succeeded {
        key: String,
        value: T,
    },
    Failed {
        key: String,
        /// 远程返回的原始错误信息
        error: String,
        class: FailureClass,
    },
}

impl<T> OperationOutcome<T> {
    pub fn succeeded(key: impl Into<String>, value: T) -> Self {
        OperationOutcome::Succeeded {
            key: key.into(),
            value,
        }
    }

    pub fn failed(key: impl Into<String>, err: &ApiError) -> Self {
        OperationOutcome::Failed {
            key: key.into(),
            error: err.to_string(),
            class: err.class(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            OperationOutcome::Succeeded { key, .. } | OperationOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Succeeded { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            OperationOutcome::Succeeded { value, .. } => Some(value),
            OperationOutcome::Failed { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationOutcome<U> {
        match self {
            OperationOutcome::Succeeded { key, value } => OperationOutcome::Succeeded {
                key,
                value: f(value),
            },
            OperationOutcome::Failed { key, error, class } => {
                OperationOutcome::Failed { key, error, class }
            }
        }
    }
}

/// 批次报告
///
/// `outcomes[i]` 对应第 `i` 个输入项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport<T> {
    pub summary: String,
    pub succeeded: usize,
    pub failed: usize,
    /// 部分或全部失败
    pub has_failures: bool,
    pub outcomes: Vec<OperationOutcome<T>>,
}

impl<T> BatchReport<T> {
    /// 汇总结果
    pub fn build(outcomes: Vec<OperationOutcome<T>>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;

        Self {
            summary: format!("{} succeeded, {} failed", succeeded, failed),
            succeeded,
            failed,
            has_failures: failed > 0,
            outcomes,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// 失败项的 key，按输入顺序
    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures().map(|o| o.key()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome<T>> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// 成功项的 (key, value)，按输入顺序
    pub fn succeeded_values(&self) -> impl Iterator<Item = (&str, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.value().map(|v| (o.key(), v)))
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> BatchReport<U> {
        BatchReport {
            summary: self.summary,
            succeeded: self.succeeded,
            failed: self.failed,
            has_failures: self.has_failures,
            outcomes: self.outcomes.into_iter().map(|o| o.map(&mut f)).collect(),
        }
    }

    /// 人类可读的报告：一行汇总，每个失败项一行
    pub fn render(&self) -> String {
        let mut text = self.summary.clone();
        for outcome in self.failures() {
            if let OperationOutcome::Failed { key, error, class } = outcome {
                text.push_str(&format!("\n  ✗ {} [{}]: {}", key, class, error));
            }
        }
        text
    }
}

impl<T: Serialize> BatchReport<T> {
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 一个待执行的批处理任务
///
/// TOML 格式：
///
/// ```toml
/// tool = "create_cards"
///
/// [arguments]
/// deck_id = "deck-1"
///
/// [[arguments.cards]]
/// content = "1644 年 明朝灭亡"
/// chapter = "History"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub tool: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
    #[serde(skip)]
    pub file_path: Option<String>,
}

impl Job {
    /// 用于日志显示的名称
    pub fn display_name(&self) -> String {
        self.file_path
            .as_deref()
            .and_then(|p| Path::new(p).file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.tool.clone())
    }
}

fn empty_arguments() -> Value {
    Value::Object(Default::default())
}

/// 从 TOML 文件加载任务
pub async fn load_job(job_file_path: &Path) -> Result<Job> {
    let content = fs::read_to_string(job_file_path)
        .await
        .with_context(|| format!("无法读取任务文件: {}", job_file_path.display()))?;

    let mut job: Job = toml::from_str(&content)
        .with_context(|| format!("无法解析任务文件: {}", job_file_path.display()))?;

    job.file_path = Some(job_file_path.to_string_lossy().to_string());

    Ok(job)
}

/// 从文件夹中加载所有 TOML 任务，按文件名排序
///
/// 无法解析的文件只记录警告并跳过
pub async fn load_all_jobs(folder_path: &str) -> Result<Vec<Job>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut job_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            job_files.push(path);
        }
    }
    job_files.sort();

    let mut jobs = Vec::with_capacity(job_files.len());
    for path in job_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_job(&path).await {
            Ok(job) => jobs.push(job),
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "deck_batch_{}_{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_load_all_jobs_sorted_and_skips_broken() {
        let dir = temp_dir("jobs");
        std::fs::write(
            dir.join("b_delete.toml"),
            "tool = \"delete_cards\"\n[arguments]\ncard_ids = [\"c1\", \"c2\"]\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("a_create.toml"),
            "tool = \"create_cards\"\n[arguments]\ndeck_id = \"d1\"\n[[arguments.cards]]\ncontent = \"Q\"\nchapter = \"History\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("c_broken.toml"), "tool = [").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let jobs = load_all_jobs(dir.to_str().unwrap()).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].tool, "create_cards");
        assert_eq!(jobs[0].arguments["cards"][0]["chapter"], "History");
        assert_eq!(jobs[0].display_name(), "a_create.toml");
        assert_eq!(jobs[1].tool, "delete_cards");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let result = load_all_jobs("/definitely/not/here/deck_batch").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_job_without_arguments_gets_empty_object() {
        let job: Job = toml::from_str("tool = \"list_chapters\"").unwrap();
        assert!(job.arguments.as_object().unwrap().is_empty());
        assert_eq!(job.display_name(), "list_chapters");
    }
}

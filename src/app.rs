//! 应用层
//!
//! 扫描任务目录，按文件名顺序依次执行每个任务（一个任务 = 一次工具调用），
//! 把每个任务的报告追加到日志文件，最后输出统计。

use crate::config::Config;
use crate::infrastructure::HttpRemote;
use crate::models::{load_all_jobs, Job};
use crate::utils::logging;
use crate::workflow::{DeckTools, ToolCall};
use anyhow::Result;
use serde_json::Value;
use tracing::{error, info, warn};

/// 单个任务的执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// 所有项都成功
    Clean(Value),
    /// 批次跑完，但有失败项
    Partial(Value),
    /// 整批失败（参数错误、准备阶段失败等）
    Errored(String),
}

impl JobOutcome {
    fn from_result(result: crate::error::AppResult<Value>) -> Self {
        match result {
            Ok(value) if value["has_failures"] == Value::Bool(true) => JobOutcome::Partial(value),
            Ok(value) => JobOutcome::Clean(value),
            Err(e) => JobOutcome::Errored(e.to_string()),
        }
    }
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    pub clean: usize,
    pub partial: usize,
    pub errored: usize,
}

impl ProcessingStats {
    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Clean(_) => self.clean += 1,
            JobOutcome::Partial(_) => self.partial += 1,
            JobOutcome::Errored(_) => self.errored += 1,
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    remote: HttpRemote,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;

        logging::log_startup(
            &config.api_base_url,
            config.max_concurrent_operations,
            config.retry_max_attempts,
        );

        let remote = HttpRemote::new(&config)?;

        Ok(Self { config, remote })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        info!("\n📁 正在扫描待处理的任务...");
        let jobs = load_all_jobs(&self.config.jobs_folder).await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        logging::log_jobs_loaded(jobs.len());

        let mut stats = ProcessingStats::default();
        for (idx, job) in jobs.iter().enumerate() {
            info!("\n[任务 {}/{}] {} ({})", idx + 1, jobs.len(), job.display_name(), job.tool);

            let outcome = self.run_job(job).await;
            stats.record(&outcome);

            logging::append_log(&self.config.output_log_file, &log_section(job, &outcome))?;
        }

        logging::print_final_stats(
            stats.clean,
            stats.partial,
            stats.errored,
            &self.config.output_log_file,
        );

        Ok(stats)
    }

    /// 执行单个任务
    pub async fn run_job(&self, job: &Job) -> JobOutcome {
        let tools = DeckTools::from_config(&self.remote, &self.config);
        let result = tools
            .invoke(ToolCall::new(job.tool.clone(), job.arguments.clone()))
            .await;

        let outcome = JobOutcome::from_result(result);
        if let JobOutcome::Errored(message) = &outcome {
            error!("[{}] ❌ 任务失败: {}", job.display_name(), message);
        }
        outcome
    }
}

/// 日志文件中的一段
fn log_section(job: &Job, outcome: &JobOutcome) -> String {
    let header = format!("[{}] {}", job.display_name(), job.tool);
    match outcome {
        JobOutcome::Clean(value) | JobOutcome::Partial(value) => {
            let summary = value["summary"].as_str().unwrap_or("完成");
            let mut section = format!("{}\n{}", header, summary);
            for failure in failed_outcomes(value) {
                section.push_str(&format!(
                    "\n  ✗ {} [{}]: {}",
                    failure["key"].as_str().unwrap_or("?"),
                    failure["class"].as_str().unwrap_or("?"),
                    failure["error"].as_str().unwrap_or("")
                ));
            }
            section
        }
        JobOutcome::Errored(message) => format!("{}\n❌ {}", header, message),
    }
}

fn failed_outcomes(value: &Value) -> impl Iterator<Item = &Value> {
    value["outcomes"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|o| o["status"] == "failed")
}

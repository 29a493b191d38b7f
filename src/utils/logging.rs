//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 追加一段内容到日志文件
pub fn append_log(log_file_path: &str, section: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(file, "{}\n", section)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(base_url: &str, max_concurrent: usize, max_attempts: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批处理模式");
    info!("🌐 API 地址: {}", base_url);
    info!("📊 最大并发数: {} | 最大尝试次数: {}", max_concurrent, max_attempts);
    info!("{}", "=".repeat(60));
}

/// 记录任务加载信息
pub fn log_jobs_loaded(total: usize) {
    info!("✓ 找到 {} 个待处理的任务", total);
    info!("💡 任务按文件名顺序依次执行\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `label`: 批次名称
/// - `total`: 输入项数量
/// - `mode`: 调度模式
pub fn log_batch_start(label: &str, total: usize, mode: &str) {
    info!("{}", "─".repeat(60));
    info!("📦 [{}] 开始处理 {} 项 (模式: {})", label, total, mode);
}

/// 记录批次完成信息
pub fn log_batch_complete(label: &str, succeeded: usize, total: usize) {
    if succeeded == total {
        info!("✓ [{}] 批次完成: 成功 {}/{}", label, succeeded, total);
    } else {
        info!(
            "⚠️ [{}] 批次完成: 成功 {}/{}，失败 {}",
            label,
            succeeded,
            total,
            total - succeeded
        );
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `clean`: 全部成功的任务数
/// - `partial`: 有失败项的任务数
/// - `errored`: 整体失败的任务数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(clean: usize, partial: usize, errored: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 全部成功: {}/{}", clean, clean + partial + errored);
    info!("⚠️ 部分失败: {}", partial);
    info!("❌ 整体失败: {}", errored);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("一二三四五", 3), "一二三...");
    }

    #[test]
    fn test_log_file_header_and_append() {
        let path = std::env::temp_dir().join(format!("deck_batch_log_{}.txt", std::process::id()));
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        append_log(path, "2 succeeded, 0 failed").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("批处理日志"));
        assert!(content.ends_with("2 succeeded, 0 failed\n\n"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_init_twice_is_fine() {
        init(false);
        init(true);
    }
}

use crate::error::ConfigError;
use crate::services::RetryPolicy;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 远程 API 配置 ---
    pub api_base_url: String,
    pub api_token: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 重试配置 ---
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_backoff_multiplier: f64,
    pub retry_max_delay_ms: u64,
    // --- 批处理配置 ---
    /// 并发模式下同时进行的操作数量
    pub max_concurrent_operations: usize,
    /// 待处理任务文件存放目录
    pub jobs_folder: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://app.mochi.cards/api".to_string(),
            api_token: String::new(),
            request_timeout_secs: 30,
            retry_max_attempts: 3,
            retry_base_delay_ms: 1000,
            retry_backoff_multiplier: 2.0,
            retry_max_delay_ms: 30_000,
            max_concurrent_operations: 8,
            jobs_folder: "jobs".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(default.api_base_url),
            api_token: std::env::var("API_TOKEN").unwrap_or(default.api_token),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(default.request_timeout_secs),
            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS").unwrap_or(default.retry_max_attempts),
            retry_base_delay_ms: env_parse("RETRY_BASE_DELAY_MS").unwrap_or(default.retry_base_delay_ms),
            retry_backoff_multiplier: env_parse("RETRY_BACKOFF_MULTIPLIER").unwrap_or(default.retry_backoff_multiplier),
            retry_max_delay_ms: env_parse("RETRY_MAX_DELAY_MS").unwrap_or(default.retry_max_delay_ms),
            max_concurrent_operations: env_parse("MAX_CONCURRENT_OPERATIONS").unwrap_or(default.max_concurrent_operations),
            jobs_folder: std::env::var("JOBS_FOLDER").unwrap_or(default.jobs_folder),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_max_attempts == 0 {
            return Err(invalid("RETRY_MAX_ATTEMPTS", self.retry_max_attempts, "至少为 1"));
        }
        if !(self.retry_backoff_multiplier >= 1.0) {
            return Err(invalid(
                "RETRY_BACKOFF_MULTIPLIER",
                self.retry_backoff_multiplier,
                "不小于 1.0 的数字",
            ));
        }
        if self.max_concurrent_operations == 0 {
            return Err(invalid(
                "MAX_CONCURRENT_OPERATIONS",
                self.max_concurrent_operations,
                "至少为 1",
            ));
        }
        Ok(())
    }

    /// 构建重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            backoff_multiplier: self.retry_backoff_multiplier,
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            ..RetryPolicy::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    std::env::var(var_name).ok().and_then(|v| v.parse().ok())
}

fn invalid(var_name: &str, value: impl ToString, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var_name: var_name.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

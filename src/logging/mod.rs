//! 日志初始化模块.
//!
//! 双输出:
//! - console: 彩色, 带源码位置, 输出到 stderr
//! - file: 无色, 按天滚动, 输出到 `{directory}/{prefix}.{date}.log`
//!
//! 级别优先级: `OGV_LOG` 环境变量 > 命令行 `-v` > 配置文件 `level`.
//! - `-v`:   debug
//! - `-vv`:  trace (仅 ogv 项目 crate, 第三方依赖保持 info)
//! - `-vvv`: trace (全局)
//!
//! 库 crate 通过 `log` 门面输出, 由 tracing-subscriber 统一接收.

mod format;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use self::format::{ConsoleFormatter, FileFormatter};

/// 覆盖日志级别的环境变量
pub const LOG_ENV: &str = "OGV_LOG";

/// 本项目所有 crate 的 target 前缀 (用于 -vv 级别的定向 trace)
const OGV_CRATE_TARGETS: &[&str] = &["ogv", "ogv_core", "ogv_format", "ogv_play"];

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 默认级别 (EnvFilter 语法)
    #[serde(default = "default_level")]
    pub level: String,
    /// 日志目录
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// 日志文件前缀
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// 保留的日志文件数量
    #[serde(default = "default_retention_files")]
    pub retention_files: usize,
    /// 是否输出到控制台
    #[serde(default = "default_true")]
    pub console: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_prefix() -> String {
    "ogv-play".to_string()
}

fn default_retention_files() -> usize {
    30
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            retention_files: default_retention_files(),
            console: true,
        }
    }
}

/// 构建 -vv 级别的过滤指令: ogv crate trace, 其余 info
fn ogv_trace_directives() -> String {
    let mut directives = OGV_CRATE_TARGETS
        .iter()
        .map(|t| format!("{t}=trace"))
        .collect::<Vec<_>>();
    directives.push("info".to_string());
    directives.join(",")
}

/// 根据 verbosity 与配置级别得到过滤指令
///
/// - 0: 配置中的 `level`
/// - 1: debug
/// - 2: trace (仅 ogv crate)
/// - 3+: trace (全局)
pub(crate) fn filter_directives(verbosity: u8, configured: &str) -> String {
    match verbosity {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        2 => ogv_trace_directives(),
        _ => "trace".to_string(),
    }
}

fn build_filter(verbosity: u8, configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbosity, configured)))
}

/// 初始化日志系统
///
/// 全局订阅器只能安装一次, 重复调用返回错误.
pub fn init(config: &LoggingConfig, verbosity: u8) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("创建日志目录失败, path={}", config.directory.display())
    })?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .max_log_files(config.retention_files.max(1))
        .build(&config.directory)
        .context("创建日志文件失败")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = config.console.then(|| {
        fmt::Layer::default()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .event_format(ConsoleFormatter)
            .with_filter(build_filter(verbosity, &config.level))
    });

    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(build_filter(verbosity, &config.level));

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("安装全局日志订阅器失败")?;

    LOG_GUARD.set(guard).ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_by_verbosity() {
        assert_eq!(filter_directives(0, "warn"), "warn");
        assert_eq!(filter_directives(1, "warn"), "debug");
        assert_eq!(
            filter_directives(2, "warn"),
            "ogv=trace,ogv_core=trace,ogv_format=trace,ogv_play=trace,info"
        );
        assert_eq!(filter_directives(5, "warn"), "trace");
    }

    #[test]
    fn test_logging_config_defaults_from_empty_json() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoggingConfig::default());
        assert_eq!(config.directory, PathBuf::from("logs"));
    }
}

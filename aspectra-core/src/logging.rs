//! 日志初始化
//!
//! 订阅者由 tracing-subscriber 构建。配置可以来自 `Environment` 的 `logging.*` 键，
//! 也可以直接读取进程环境变量。

use crate::config::Environment;
use crate::error::{ApplicationError, ApplicationResult};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

pub const LOGGING_LEVEL: &str = "logging.level";
pub const LOGGING_FORMAT: &str = "logging.format";
pub const LOGGING_FILTER: &str = "logging.filter";
pub const LOGGING_SHOW_TARGET: &str = "logging.show-target";
pub const LOGGING_SHOW_THREAD_NAMES: &str = "logging.show-thread-names";

/// 在名称表中查找，大小写不敏感
fn lookup<T: Copy>(table: &[(&str, T)], key: &'static str, value: &str) -> ApplicationResult<T> {
    let wanted = value.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
        .map(|(_, item)| *item)
        .ok_or_else(|| ApplicationError::InvalidConfigValue {
            key: key.to_string(),
            message: format!("'{}' is not one of {:?}", wanted, table.iter().map(|(n, _)| *n).collect::<Vec<_>>()),
        })
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const NAMES: [(&'static str, LogLevel); 6] = [
        ("trace", LogLevel::Trace),
        ("debug", LogLevel::Debug),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("warning", LogLevel::Warn),
        ("error", LogLevel::Error),
    ];
}

impl FromStr for LogLevel {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&Self::NAMES, LOGGING_LEVEL, s)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 名称表里每个级别的第一个名字即规范名
        let name = Self::NAMES
            .iter()
            .find(|(_, level)| level == self)
            .map_or("info", |(name, _)| *name);
        f.write_str(name)
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 单行紧凑输出（默认）
    Compact,
    Full,
    /// 每条事件一个 JSON 对象
    Json,
    /// 多行输出，开发时使用
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(
            &[
                ("compact", LogFormat::Compact),
                ("full", LogFormat::Full),
                ("json", LogFormat::Json),
                ("pretty", LogFormat::Pretty),
            ],
            LOGGING_FORMAT,
            s,
        )
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// 输出事件的 target（模块路径）
    pub show_target: bool,
    pub show_thread_names: bool,
    /// 完整的过滤指令，例如 "aspectra_aop=trace,info"；设置后 `level` 只作兜底
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_names: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn show_thread_names(mut self, show: bool) -> Self {
        self.show_thread_names = show;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从进程环境变量读取：`RUST_LOG` 作为过滤器，`ASPECTRA_LOG_LEVEL`、`ASPECTRA_LOG_FORMAT`
    ///
    /// 无法识别的取值保留默认值，启动阶段不因日志配置失败
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.filter = std::env::var("RUST_LOG").ok();

        if let Some(level) = std::env::var("ASPECTRA_LOG_LEVEL").ok().and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = std::env::var("ASPECTRA_LOG_FORMAT").ok().and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        config
    }

    /// 从配置环境绑定 `logging.*`，取值非法时报错
    pub fn from_environment(env: &Environment) -> ApplicationResult<Self> {
        let defaults = Self::default();
        let level = match env.get_string(LOGGING_LEVEL) {
            Some(level) => level.parse()?,
            None => defaults.level,
        };
        let format = match env.get_string(LOGGING_FORMAT) {
            Some(format) => format.parse()?,
            None => defaults.format,
        };

        Ok(Self {
            level,
            format,
            show_target: env.require_bool_or(LOGGING_SHOW_TARGET, defaults.show_target)?,
            show_thread_names: env
                .require_bool_or(LOGGING_SHOW_THREAD_NAMES, defaults.show_thread_names)?,
            filter: env.get_string(LOGGING_FILTER),
        })
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.to_string());
        match &self.filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| fallback()),
            None => fallback(),
        }
    }

    /// 安装全局订阅者，只能成功一次，之后返回 `LoggingInitFailed`
    pub fn init(self) -> ApplicationResult<()> {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_target(self.show_target)
            .with_thread_names(self.show_thread_names);

        let installed = match self.format {
            LogFormat::Compact => subscriber.compact().try_init(),
            LogFormat::Full => subscriber.try_init(),
            LogFormat::Json => subscriber.json().try_init(),
            LogFormat::Pretty => subscriber.pretty().try_init(),
        };

        installed.map_err(|e| ApplicationError::LoggingInitFailed(e.to_string()))
    }
}

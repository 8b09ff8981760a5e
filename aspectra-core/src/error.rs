//! 应用层错误类型
//!
//! 库内部使用 thiserror 定义结构化错误，应用入口（main）使用 anyhow::Result 汇总。

use thiserror::Error;

/// 应用级错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 配置文件读取失败
    #[error("Failed to read config file '{path}': {source}")]
    ConfigLoadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件解析失败
    #[error("Failed to parse config '{name}': {message}")]
    ConfigParseFailed { name: String, message: String },

    /// 配置项取值非法
    #[error("Invalid value for config '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    /// 日志系统初始化失败
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),
}

/// 应用级 Result
pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;

/// 通用 Result，供应用入口使用
pub use anyhow::Result;

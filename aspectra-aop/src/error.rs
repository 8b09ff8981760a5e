//! 异常与错误类型
//!
//! `Exception` 是目标方法或通知抛出的异常，带有一个来自静态层级表的 `ErrorKind`。
//! `AopError` 是代理调用方看到的错误：配置错误、匹配错误，或原样传播的异常。

use std::fmt;
use thiserror::Error;

/// 异常种类
///
/// 种类之间的父子关系由 [`ErrorKind::parent`] 的静态表定义：
///
/// ```text
/// Throwable
/// └── Exception
///     ├── Io
///     └── Runtime
///         ├── IllegalArgument
///         ├── IllegalState
///         │   └── SecurityDenied
///         ├── UnsupportedOperation
///         └── NullPointer
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Throwable,
    Exception,
    Io,
    Runtime,
    IllegalArgument,
    IllegalState,
    SecurityDenied,
    UnsupportedOperation,
    NullPointer,
}

impl ErrorKind {
    pub const fn parent(self) -> Option<ErrorKind> {
        match self {
            ErrorKind::Throwable => None,
            ErrorKind::Exception => Some(ErrorKind::Throwable),
            ErrorKind::Io | ErrorKind::Runtime => Some(ErrorKind::Exception),
            ErrorKind::IllegalArgument
            | ErrorKind::IllegalState
            | ErrorKind::UnsupportedOperation
            | ErrorKind::NullPointer => Some(ErrorKind::Runtime),
            ErrorKind::SecurityDenied => Some(ErrorKind::IllegalState),
        }
    }

    /// `self` 是否为 `ancestor` 本身或其子种类
    pub fn is_a(self, ancestor: ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// 距离根节点 `Throwable` 的层数，越大越具体
    pub fn depth(self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(kind) = current {
            depth += 1;
            current = kind.parent();
        }
        depth
    }

    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::Throwable => "Throwable",
            ErrorKind::Exception => "Exception",
            ErrorKind::Io => "IoException",
            ErrorKind::Runtime => "RuntimeException",
            ErrorKind::IllegalArgument => "IllegalArgumentException",
            ErrorKind::IllegalState => "IllegalStateException",
            ErrorKind::SecurityDenied => "SecurityDeniedException",
            ErrorKind::UnsupportedOperation => "UnsupportedOperationException",
            ErrorKind::NullPointer => "NullPointerException",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 目标方法或通知抛出的异常
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    kind: ErrorKind,
    message: String,
    cause: Option<Box<Exception>>,
}

impl Exception {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalArgument, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalState, message)
    }

    pub fn security_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SecurityDenied, message)
    }

    /// 以 `cause` 作为原因包装成新的异常
    pub fn wrap(kind: ErrorKind, message: impl Into<String>, cause: Exception) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Exception> {
        self.cause.as_deref()
    }

    pub fn is_a(&self, kind: ErrorKind) -> bool {
        self.kind.is_a(kind)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// 代理调用方看到的错误
#[derive(Debug, Error)]
pub enum AopError {
    /// 代理配置非法，在创建代理时报告
    #[error("AOP configuration error: {0}")]
    Configuration(String),

    /// 切点求值失败
    #[error("Pointcut '{pointcut}' failed to evaluate: {reason}")]
    Match { pointcut: String, reason: String },

    /// 类型上不存在该方法，或代理的接口没有声明该方法
    #[error("No method '{method}' is exposed by the proxy of '{type_name}'")]
    NoSuchMethod { type_name: String, method: String },

    /// 目标方法或通知抛出的异常
    #[error(transparent)]
    Target(#[from] Exception),
}

impl AopError {
    pub fn configuration(message: impl Into<String>) -> Self {
        AopError::Configuration(message.into())
    }

    pub fn matching(pointcut: impl Into<String>, reason: impl Into<String>) -> Self {
        AopError::Match {
            pointcut: pointcut.into(),
            reason: reason.into(),
        }
    }

    pub fn exception(&self) -> Option<&Exception> {
        match self {
            AopError::Target(exception) => Some(exception),
            _ => None,
        }
    }

    /// 是否为指定种类（或其子种类）的异常
    pub fn is_exception_of(&self, kind: ErrorKind) -> bool {
        self.exception().is_some_and(|e| e.is_a(kind))
    }
}

pub type AopResult<T> = Result<T, AopError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_hierarchy() {
        assert!(ErrorKind::SecurityDenied.is_a(ErrorKind::IllegalState));
        assert!(ErrorKind::SecurityDenied.is_a(ErrorKind::Exception));
        assert!(ErrorKind::IllegalArgument.is_a(ErrorKind::Runtime));
        assert!(!ErrorKind::IllegalArgument.is_a(ErrorKind::IllegalState));
        assert!(!ErrorKind::Exception.is_a(ErrorKind::Runtime));
        assert!(ErrorKind::Io.is_a(ErrorKind::Throwable));
    }

    #[test]
    fn test_depth_orders_specificity() {
        assert_eq!(ErrorKind::Throwable.depth(), 0);
        assert_eq!(ErrorKind::Exception.depth(), 1);
        assert_eq!(ErrorKind::IllegalState.depth(), 3);
        assert!(ErrorKind::SecurityDenied.depth() > ErrorKind::IllegalState.depth());
    }

    #[test]
    fn test_exception_display_and_source() {
        let cause = Exception::illegal_argument("bad id");
        let wrapped = Exception::wrap(ErrorKind::IllegalState, "lookup failed", cause.clone());

        assert_eq!(wrapped.to_string(), "IllegalStateException: lookup failed");
        assert_eq!(wrapped.cause(), Some(&cause));
        assert_eq!(
            wrapped.source().map(|s| s.to_string()),
            Some("IllegalArgumentException: bad id".to_string())
        );
        assert_eq!(
            Exception::new(ErrorKind::Exception, "").to_string(),
            "Exception"
        );
    }

    #[test]
    fn test_aop_error_kind_queries() {
        let err: AopError = Exception::security_denied("not authenticated").into();
        assert!(err.is_exception_of(ErrorKind::IllegalState));
        assert!(!err.is_exception_of(ErrorKind::IllegalArgument));
        assert_eq!(err.to_string(), "SecurityDeniedException: not authenticated");

        let err = AopError::configuration("no target");
        assert!(err.exception().is_none());
    }
}

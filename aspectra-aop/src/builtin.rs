//! 预定义的常用通知

use crate::advice::{Advice, MethodInterceptor, ThrowsAdvice, ThrowsOutcome};
use crate::error::{ErrorKind, Exception};
use crate::joinpoint::Invocation;
use crate::properties::AopProperties;
use crate::value::Value;
use std::time::Duration;

/// 日志通知 - 记录方法调用
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor {
    log_args: bool,
    log_result: bool,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }

    pub fn with_result(mut self) -> Self {
        self.log_result = true;
        self
    }
}

impl MethodInterceptor for LoggingInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        let signature = invocation.join_point().signature();
        if self.log_args {
            tracing::info!("→ Entering: {} with args {:?}", signature, invocation.args());
        } else {
            tracing::info!("→ Entering: {}", signature);
        }

        let outcome = invocation.proceed();
        let elapsed = invocation.elapsed();
        match &outcome {
            Ok(result) if self.log_result => {
                tracing::info!("← Exiting: {} = {:?} (took {:?})", signature, result, elapsed)
            }
            Ok(_) => tracing::info!("← Exiting: {} (took {:?})", signature, elapsed),
            Err(exception) => {
                tracing::info!("← Exiting: {} with {} (took {:?})", signature, exception, elapsed)
            }
        }
        outcome
    }
}

/// 性能监控通知
#[derive(Debug, Clone)]
pub struct PerformanceInterceptor {
    threshold: Duration,
}

impl PerformanceInterceptor {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn from_properties(properties: &AopProperties) -> Self {
        Self::new(Duration::from_millis(properties.performance_threshold_ms))
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn is_slow(&self, elapsed: Duration) -> bool {
        elapsed > self.threshold
    }
}

impl MethodInterceptor for PerformanceInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        let outcome = invocation.proceed();
        let elapsed = invocation.elapsed();
        if self.is_slow(elapsed) {
            tracing::warn!(
                "⚠️ Slow method detected: {} took {}ms (threshold: {}ms)",
                invocation.join_point().signature(),
                elapsed.as_millis(),
                self.threshold.as_millis()
            );
        }
        outcome
    }
}

/// 异常日志通知：记录所有异常后原样抛出
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionLoggingAdvice;

impl ExceptionLoggingAdvice {
    pub fn new() -> Self {
        Self
    }

    pub fn into_advice(self) -> Advice {
        Advice::after_throwing(self.into())
    }
}

impl From<ExceptionLoggingAdvice> for ThrowsAdvice {
    fn from(_: ExceptionLoggingAdvice) -> Self {
        ThrowsAdvice::new("ExceptionLoggingAdvice").on(ErrorKind::Throwable, |exception, jp| {
            tracing::error!("❌ Exception in {}: {}", jp.signature(), exception);
            let mut cause = exception.cause();
            while let Some(inner) = cause {
                tracing::error!("   caused by: {}", inner);
                cause = inner.cause();
            }
            ThrowsOutcome::Rethrow
        })
    }
}

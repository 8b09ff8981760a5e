//! 演示用的通知与切面（切面通过 inventory 自动注册）

use aspectra_aop::prelude::*;
use aspectra_aop::Value;
use aspectra_aop_macros::Aspect;

/// 把返回值包装为问候语
pub struct SimpleAdvice;

impl MethodInterceptor for SimpleAdvice {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        let result = invocation.proceed()?;
        Ok(Value::from(format!("Hello, {}!", result)))
    }
}

/// 返回值必须是字符串
pub struct HelloAfterReturningAdvice;

impl AfterReturningAdvice for HelloAfterReturningAdvice {
    fn after_returning(&self, result: &Value, join_point: &JoinPoint<'_>) -> Result<(), Exception> {
        if result.as_str().is_none() {
            return Err(Exception::illegal_argument(format!(
                "{} returned {} instead of a string",
                join_point.signature(),
                result.type_name()
            )));
        }
        tracing::info!("After returning from {}: {}", join_point.signature(), result);
        Ok(())
    }
}

pub fn exception_capture_advice() -> ThrowsAdvice {
    ThrowsAdvice::new("ExceptionCaptureThrowsAdvice")
        .on(ErrorKind::Exception, |ex, jp| {
            tracing::info!("Generic exception capture from {}: {}", jp.method_name(), ex);
            ThrowsOutcome::Rethrow
        })
        .on(ErrorKind::IllegalArgument, |ex, jp| {
            tracing::info!("IllegalArgumentException capture from {}: {}", jp.method_name(), ex);
            ThrowsOutcome::Rethrow
        })
}

#[derive(Default, Aspect)]
#[pointcut("execution(* World.get_message*(..))")]
pub struct AnnotatedAdvice;

impl Aspect for AnnotatedAdvice {
    fn before(&self, join_point: &JoinPoint<'_>) -> Result<(), Exception> {
        tracing::info!("Executing: {}", join_point.signature());
        Ok(())
    }

    fn around(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        let result = invocation.proceed()?;
        Ok(Value::from(format!("Hello, {}!", result)))
    }
}

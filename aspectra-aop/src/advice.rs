//! 通知（Advice）定义
//!
//! 定义了在连接点执行的各种动作。通知本身不保存单次调用的状态，
//! 可以被多个代理、多个线程共享。

use crate::error::{ErrorKind, Exception};
use crate::joinpoint::{Invocation, JoinPoint};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceType {
    /// 前置通知
    Before,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（抛出异常时执行）
    AfterThrowing,
    /// 环绕通知（可以控制方法执行）
    Around,
}

/// 前置通知
///
/// 在目标方法执行前调用；返回错误会阻止目标方法执行
pub trait MethodBeforeAdvice: Send + Sync {
    fn before(&self, join_point: &JoinPoint<'_>) -> Result<(), Exception>;
}

/// 返回后通知
///
/// 只在目标方法正常返回后调用，看到的是最终返回值
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(&self, result: &Value, join_point: &JoinPoint<'_>) -> Result<(), Exception>;
}

/// 环绕通知
///
/// 通过 `invocation.proceed()` 决定是否、何时以及调用几次内层链
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception>;
}

/// 异常处理器的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ThrowsOutcome {
    /// 原样抛出
    Rethrow,
    /// 替换成另一个异常
    Replace(Exception),
    /// 吞掉异常，以给定值正常返回
    Recover(Value),
}

type ThrowsHandler = Box<dyn Fn(&Exception, &JoinPoint<'_>) -> ThrowsOutcome + Send + Sync>;

/// 异常通知
///
/// 按异常种类注册处理器；异常发生时选择最具体的匹配种类，
/// 同样具体时先注册的优先。没有匹配的处理器时原样抛出。
pub struct ThrowsAdvice {
    name: String,
    handlers: Vec<(ErrorKind, ThrowsHandler)>,
}

impl ThrowsAdvice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
        }
    }

    /// 注册一个处理 `kind` 及其子种类的处理器
    pub fn on<F>(mut self, kind: ErrorKind, handler: F) -> Self
    where
        F: Fn(&Exception, &JoinPoint<'_>) -> ThrowsOutcome + Send + Sync + 'static,
    {
        self.handlers.push((kind, Box::new(handler)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 为给定异常种类选出的处理器所注册的种类
    pub fn resolve(&self, kind: ErrorKind) -> Option<ErrorKind> {
        self.resolve_index(kind).map(|idx| self.handlers[idx].0)
    }

    fn resolve_index(&self, kind: ErrorKind) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (idx, (handled, _)) in self.handlers.iter().enumerate() {
            if !kind.is_a(*handled) {
                continue;
            }
            let depth = handled.depth();
            if best.map_or(true, |(_, best_depth)| depth > best_depth) {
                best = Some((idx, depth));
            }
        }
        best.map(|(idx, _)| idx)
    }

    pub fn handle(&self, exception: &Exception, join_point: &JoinPoint<'_>) -> ThrowsOutcome {
        match self.resolve_index(exception.kind()) {
            Some(idx) => {
                tracing::debug!(
                    "{} handles {} from {} with the {} handler",
                    self.name,
                    exception.kind(),
                    join_point,
                    self.handlers[idx].0
                );
                (self.handlers[idx].1)(exception, join_point)
            }
            None => ThrowsOutcome::Rethrow,
        }
    }
}

impl fmt::Debug for ThrowsAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<ErrorKind> = self.handlers.iter().map(|(kind, _)| *kind).collect();
        f.debug_struct("ThrowsAdvice")
            .field("name", &self.name)
            .field("handlers", &kinds)
            .finish()
    }
}

struct BeforeFn<F>(F);

impl<F> MethodBeforeAdvice for BeforeFn<F>
where
    F: Fn(&JoinPoint<'_>) -> Result<(), Exception> + Send + Sync,
{
    fn before(&self, join_point: &JoinPoint<'_>) -> Result<(), Exception> {
        (self.0)(join_point)
    }
}

struct AfterReturningFn<F>(F);

impl<F> AfterReturningAdvice for AfterReturningFn<F>
where
    F: Fn(&Value, &JoinPoint<'_>) -> Result<(), Exception> + Send + Sync,
{
    fn after_returning(&self, result: &Value, join_point: &JoinPoint<'_>) -> Result<(), Exception> {
        (self.0)(result, join_point)
    }
}

struct AroundFn<F>(F);

impl<F> MethodInterceptor for AroundFn<F>
where
    F: Fn(&mut Invocation<'_>) -> Result<Value, Exception> + Send + Sync,
{
    fn invoke(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        (self.0)(invocation)
    }
}

/// 通知
#[derive(Clone)]
pub enum Advice {
    Before(Arc<dyn MethodBeforeAdvice>),
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    AfterThrowing(Arc<ThrowsAdvice>),
    Around(Arc<dyn MethodInterceptor>),
}

impl Advice {
    pub fn before(advice: impl MethodBeforeAdvice + 'static) -> Self {
        Advice::Before(Arc::new(advice))
    }

    pub fn before_fn<F>(advice: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> Result<(), Exception> + Send + Sync + 'static,
    {
        Advice::Before(Arc::new(BeforeFn(advice)))
    }

    pub fn after_returning(advice: impl AfterReturningAdvice + 'static) -> Self {
        Advice::AfterReturning(Arc::new(advice))
    }

    pub fn after_returning_fn<F>(advice: F) -> Self
    where
        F: Fn(&Value, &JoinPoint<'_>) -> Result<(), Exception> + Send + Sync + 'static,
    {
        Advice::AfterReturning(Arc::new(AfterReturningFn(advice)))
    }

    pub fn after_throwing(advice: ThrowsAdvice) -> Self {
        Advice::AfterThrowing(Arc::new(advice))
    }

    pub fn around(advice: impl MethodInterceptor + 'static) -> Self {
        Advice::Around(Arc::new(advice))
    }

    pub fn around_fn<F>(advice: F) -> Self
    where
        F: Fn(&mut Invocation<'_>) -> Result<Value, Exception> + Send + Sync + 'static,
    {
        Advice::Around(Arc::new(AroundFn(advice)))
    }

    pub fn advice_type(&self) -> AdviceType {
        match self {
            Advice::Before(_) => AdviceType::Before,
            Advice::AfterReturning(_) => AdviceType::AfterReturning,
            Advice::AfterThrowing(_) => AdviceType::AfterThrowing,
            Advice::Around(_) => AdviceType::Around,
        }
    }

    /// 作为调用链上的一环执行
    pub(crate) fn apply(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        match self {
            Advice::Before(advice) => {
                advice.before(&invocation.join_point())?;
                invocation.proceed()
            }
            Advice::AfterReturning(advice) => {
                let result = invocation.proceed()?;
                advice.after_returning(&result, &invocation.join_point())?;
                Ok(result)
            }
            Advice::AfterThrowing(advice) => match invocation.proceed() {
                Ok(result) => Ok(result),
                Err(exception) => match advice.handle(&exception, &invocation.join_point()) {
                    ThrowsOutcome::Rethrow => Err(exception),
                    ThrowsOutcome::Replace(replacement) => Err(replacement),
                    ThrowsOutcome::Recover(value) => {
                        tracing::debug!(
                            "{} recovered from {} in {}",
                            advice.name(),
                            exception,
                            invocation.method()
                        );
                        Ok(value)
                    }
                },
            },
            Advice::Around(advice) => advice.invoke(invocation),
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advice::AfterThrowing(advice) => f.debug_tuple("AfterThrowing").field(advice).finish(),
            other => write!(f, "{:?}", other.advice_type()),
        }
    }
}

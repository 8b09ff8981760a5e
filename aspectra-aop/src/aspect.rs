//! 切面（Aspect）定义
//!
//! 切面是横切关注点的模块化：一个切点表达式加上一组可选的通知钩子。
//! `#[derive(Aspect)]` 生成 `AspectMetadata` 实现并通过 inventory 注册，
//! 通知钩子由使用者实现 `Aspect` trait 提供。

use crate::advice::{Advice, MethodInterceptor, ThrowsOutcome};
use crate::advisor::Advisor;
use crate::error::Exception;
use crate::expression::ExpressionPointcut;
use crate::joinpoint::{Invocation, JoinPoint};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// 切面的名称与切点表达式
pub trait AspectMetadata {
    fn name(&self) -> &str;

    /// 切点表达式，例如 `execution(* World.get_message(..))`
    fn pointcut(&self) -> &str;
}

/// 切面 Trait
///
/// 所有钩子都有默认实现，只需覆盖关心的那几个
pub trait Aspect: AspectMetadata + Send + Sync {
    /// 前置通知
    fn before(&self, _join_point: &JoinPoint<'_>) -> Result<(), Exception> {
        Ok(())
    }

    /// 环绕通知，默认直接继续执行
    fn around(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        invocation.proceed()
    }

    /// 返回后通知
    fn after_returning(&self, _result: &Value, _join_point: &JoinPoint<'_>) -> Result<(), Exception> {
        Ok(())
    }

    /// 异常通知，默认原样抛出
    fn after_throwing(&self, _exception: &Exception, _join_point: &JoinPoint<'_>) -> ThrowsOutcome {
        ThrowsOutcome::Rethrow
    }
}

/// 切面注册器
///
/// 用于 inventory 自动收集切面，由 `#[derive(Aspect)]` 生成
pub struct AspectRegistration {
    /// 切面名称
    pub name: &'static str,

    /// 切点表达式
    pub pointcut_expr: &'static str,

    /// 创建切面实例的函数
    pub creator: fn() -> Arc<dyn Aspect>,
}

impl AspectRegistration {
    pub const fn new(
        name: &'static str,
        pointcut_expr: &'static str,
        creator: fn() -> Arc<dyn Aspect>,
    ) -> Self {
        Self {
            name,
            pointcut_expr,
            creator,
        }
    }

    pub fn create_instance(&self) -> Arc<dyn Aspect> {
        (self.creator)()
    }
}

inventory::collect!(AspectRegistration);

/// 获取所有链接进来的切面注册器
pub fn get_all_aspect_registrations() -> impl Iterator<Item = &'static AspectRegistration> {
    inventory::iter::<AspectRegistration>()
}

/// 把一个切面适配成一个通知器
///
/// 切点为切面的表达式；通知为一个环绕通知，依次执行
/// `before`、`around`（其中继续执行内层链），再根据结果执行
/// `after_returning` 或 `after_throwing`
#[derive(Clone)]
pub struct AspectAdvisor {
    aspect: Arc<dyn Aspect>,
}

impl AspectAdvisor {
    pub fn new(aspect: Arc<dyn Aspect>) -> Self {
        Self { aspect }
    }

    pub fn aspect(&self) -> &Arc<dyn Aspect> {
        &self.aspect
    }

    pub fn into_advisor(self) -> Advisor {
        let pointcut = ExpressionPointcut::new(self.aspect.pointcut());
        Advisor::new(pointcut, Advice::around(self))
    }
}

impl MethodInterceptor for AspectAdvisor {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        self.aspect.before(&invocation.join_point())?;
        match self.aspect.around(invocation) {
            Ok(result) => {
                self.aspect
                    .after_returning(&result, &invocation.join_point())?;
                Ok(result)
            }
            Err(exception) => {
                match self
                    .aspect
                    .after_throwing(&exception, &invocation.join_point())
                {
                    ThrowsOutcome::Rethrow => Err(exception),
                    ThrowsOutcome::Replace(replacement) => Err(replacement),
                    ThrowsOutcome::Recover(value) => Ok(value),
                }
            }
        }
    }
}

impl From<AspectAdvisor> for Advisor {
    fn from(advisor: AspectAdvisor) -> Self {
        advisor.into_advisor()
    }
}

impl fmt::Debug for AspectAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AspectAdvisor")
            .field("name", &self.aspect.name())
            .field("pointcut", &self.aspect.pointcut())
            .finish()
    }
}

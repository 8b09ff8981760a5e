//! Aspectra AOP - 基于代理的方法拦截
//!
//! 提供类似 Spring AOP 的运行时代理功能，支持：
//! - 基于接口和基于子类的代理
//! - 多种通知类型（Before、AfterReturning、AfterThrowing、Around）
//! - 静态、动态、名称、正则、标记与表达式切点
//! - 通过 `#[derive(Aspect)]` 声明切面，由 inventory 在链接期收集
//! - 目标类型的元数据由 `aspectra-aop-macros` 在编译期生成

pub mod advice;
pub mod advisor;
pub mod aspect;
pub mod builtin;
pub mod error;
pub mod expression;
pub mod joinpoint;
pub mod metadata;
pub mod pointcut;
pub mod properties;
pub mod proxy;
pub mod registry;
pub mod security;
pub mod value;

// 重新导出核心类型
pub use advice::{
    Advice, AdviceType, AfterReturningAdvice, MethodBeforeAdvice, MethodInterceptor, ThrowsAdvice,
    ThrowsOutcome,
};
pub use advisor::Advisor;
pub use aspect::{Aspect, AspectAdvisor, AspectMetadata, AspectRegistration};
pub use builtin::{ExceptionLoggingAdvice, LoggingInterceptor, PerformanceInterceptor};
pub use error::{AopError, AopResult, ErrorKind, Exception};
pub use expression::{
    AspectExpressionMatcher, ExpressionMatcher, ExpressionPointcut, ModifierPattern, ParamPattern,
    PointcutExpression,
};
pub use joinpoint::{Invocation, InvocationState, JoinPoint};
pub use metadata::{check_arity, InterfaceDescriptor, MethodSignature, Modifier, Target, TypeDescriptor};
pub use pointcut::{
    AnnotationMatchingPointcut, ClassFilter, DynamicMethodMatcherPointcut, MethodMatcher,
    NameMatchMethodPointcut, Pointcut, RegexMethodPointcut, StaticMethodMatcherPointcut,
    TruePointcut,
};
pub use properties::AopProperties;
pub use proxy::{create_proxy, Proxy, ProxyFactory};
pub use registry::{get_global_registry, AspectRegistry};
pub use security::{SecurityInterceptor, SecurityManager, User};
pub use value::{FromValue, Value};

// 导出 inventory 供宏使用
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::*;
    pub use crate::advisor::Advisor;
    pub use crate::aspect::{Aspect, AspectAdvisor, AspectMetadata};
    pub use crate::builtin::*;
    pub use crate::error::{AopError, AopResult, ErrorKind, Exception};
    pub use crate::expression::ExpressionPointcut;
    pub use crate::joinpoint::{Invocation, JoinPoint};
    pub use crate::metadata::{MethodSignature, Target, TypeDescriptor};
    pub use crate::pointcut::*;
    pub use crate::properties::AopProperties;
    pub use crate::proxy::{create_proxy, Proxy, ProxyFactory};
    pub use crate::registry::{get_global_registry, AspectRegistry};
    pub use crate::security::{SecurityInterceptor, SecurityManager};
    pub use crate::value::{FromValue, Value};
}

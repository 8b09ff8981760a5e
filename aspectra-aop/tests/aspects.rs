//! `#[derive(Aspect)]` 定义的切面与切面注册表

mod common;

use aspectra_aop::prelude::*;
use aspectra_aop::{get_global_registry, AspectRegistry, Value};
use aspectra_aop_macros::Aspect;
use common::{ErrorBean, ErrorBeanProxy, World, WorldProxy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static BEFORE_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default, Aspect)]
#[pointcut("execution(* World.get_message*(..))")]
struct AnnotatedAdvice;

impl Aspect for AnnotatedAdvice {
    fn before(&self, join_point: &JoinPoint<'_>) -> Result<(), Exception> {
        BEFORE_CALLS.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Before {}", join_point);
        Ok(())
    }

    fn around(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        let result = invocation.proceed()?;
        Ok(Value::from(format!("Hello, {}!", result)))
    }
}

/// 吞掉 ErrorBean 的 IllegalArgument 异常
#[derive(Default, Aspect)]
#[aspect(name = "error-recovery")]
#[pointcut("execution(* ErrorBean.illegal_*(..))")]
struct RecoveryAspect;

impl Aspect for RecoveryAspect {
    fn after_throwing(&self, exception: &Exception, _join_point: &JoinPoint<'_>) -> ThrowsOutcome {
        if exception.is_a(ErrorKind::IllegalArgument) {
            ThrowsOutcome::Recover(Value::Unit)
        } else {
            ThrowsOutcome::Rethrow
        }
    }
}

fn loaded_registry() -> AspectRegistry {
    let mut registry = AspectRegistry::new();
    registry.auto_load_aspects();
    registry
}

#[test]
fn test_auto_load_aspects() {
    let mut registry = AspectRegistry::new();
    assert!(registry.is_empty());

    let loaded = registry.auto_load_aspects();
    assert_eq!(loaded, 2);
    assert!(registry.contains("AnnotatedAdvice"));
    assert!(registry.contains("error-recovery"));

    // 重复加载不会产生重复切面
    assert_eq!(registry.auto_load_aspects(), 0);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.advisors().len(), 2);
}

#[test]
fn test_global_registry_is_preloaded() {
    let registry = get_global_registry();
    assert!(registry.contains("AnnotatedAdvice"));
    assert!(registry.contains("error-recovery"));
}

#[test]
fn test_aspect_applies_around_and_before() {
    common::init_tracing();
    let registry = loaded_registry();
    let mut factory = ProxyFactory::with_target(World::with_message("World"));
    factory.set_proxy_target_class(true).add_aspects(&registry);
    let proxy = factory.get_proxy().unwrap();

    let before = BEFORE_CALLS.load(Ordering::SeqCst);
    assert_eq!(WorldProxy::get_message(&proxy).unwrap(), "Hello, World!");
    assert!(BEFORE_CALLS.load(Ordering::SeqCst) > before);

    // 不匹配切点的方法不受影响
    assert!(WorldProxy::set_message(&proxy, "Rust").is_ok());
    assert_eq!(WorldProxy::get_message(&proxy).unwrap(), "Hello, Rust!");
}

#[test]
fn test_aspect_after_throwing_recovers() {
    let registry = loaded_registry();
    let mut factory = ProxyFactory::with_target(ErrorBean);
    factory.add_aspects(&registry);
    let proxy = factory.get_proxy().unwrap();

    assert!(ErrorBeanProxy::illegal_argument_exception(&proxy).is_ok());
    let err = ErrorBeanProxy::exception(&proxy).unwrap_err();
    assert!(err.is_exception_of(ErrorKind::Exception));
}

#[test]
fn test_aspect_advisor_can_be_added_explicitly() {
    let advisor: Advisor = AspectAdvisor::new(Arc::new(AnnotatedAdvice)).into();
    assert_eq!(advisor.pointcut().name(), "execution(* World.get_message*(..))");

    let proxy = create_proxy(Arc::new(World::default()), vec![advisor], true).unwrap();
    assert_eq!(WorldProxy::get_message(&proxy).unwrap(), "Hello, !");
}

//! 基于接口与基于子类的代理

mod common;

use aspectra_aop::prelude::*;
use aspectra_aop::{SecurityInterceptor, SecurityManager, Value};
use common::{FinalWorld, MessageSource, SecureBean, SecureBeanTarget, SecureBeanTargetProxy, World, WorldProxy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting_advice(counter: &Arc<AtomicUsize>) -> Advice {
    let counter = counter.clone();
    Advice::before_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn test_security_on_interface_proxy() {
    common::init_tracing();
    let mut factory = ProxyFactory::with_target(SecureBeanTarget::default());
    factory
        .set_interfaces([&SecureBean])
        .add_advice(Advice::around(SecurityInterceptor::default()));
    let proxy = factory.get_proxy().unwrap();
    assert!(proxy.is_interface_based());

    let manager = SecurityManager::new();

    // 允许的用户
    manager.login("gugu", "pwd");
    assert!(SecureBean::write_secure_message(&proxy).is_ok());
    manager.logout();

    // 不允许的用户
    manager.login("invalid user", "pwd");
    let err = SecureBean::write_secure_message(&proxy).unwrap_err();
    assert!(err.is_exception_of(ErrorKind::IllegalState));
    assert_eq!(err.exception().unwrap().kind(), ErrorKind::SecurityDenied);
    manager.logout();

    // 未登录
    let err = SecureBean::write_secure_message(&proxy).unwrap_err();
    assert!(err.is_exception_of(ErrorKind::IllegalState));
}

#[test]
fn test_security_on_class_proxy() {
    let mut factory = ProxyFactory::new();
    factory
        .set_target_class::<SecureBeanTarget>()
        .add_advice(Advice::around(SecurityInterceptor::new(["gugu"])));
    let proxy = factory.get_proxy().unwrap();
    assert!(!proxy.is_interface_based());

    let manager = SecurityManager::new();
    manager.login("gugu", "pwd");
    assert!(SecureBeanTargetProxy::write_secure_message(&proxy).is_ok());
    assert!(SecureBeanTargetProxy::write_secure_message(&proxy).is_ok());
    manager.logout();

    manager.login("invalid user", "pwd");
    assert!(SecureBeanTargetProxy::write_secure_message(&proxy)
        .unwrap_err()
        .is_exception_of(ErrorKind::IllegalState));
    manager.logout();

    // 被拒绝的调用没有到达目标
    manager.login("gugu", "pwd");
    assert_eq!(SecureBeanTargetProxy::written(&proxy).unwrap(), 2);
    manager.logout();
}

#[test]
fn test_interface_proxy_hides_undeclared_methods() {
    let proxy = ProxyFactory::with_target(World::with_message("World"))
        .get_proxy()
        .unwrap();

    assert_eq!(MessageSource::get_message(&proxy).unwrap(), "World");
    let err = proxy
        .invoke("set_message", vec![Value::from("Rust")])
        .unwrap_err();
    assert!(matches!(err, AopError::NoSuchMethod { ref method, .. } if method == "set_message"));

    let err = proxy.invoke("missing", Vec::new()).unwrap_err();
    assert!(matches!(err, AopError::NoSuchMethod { .. }));
}

#[test]
fn test_proxy_target_class_overrides_interfaces() {
    let mut factory = ProxyFactory::with_target(World::default());
    factory.set_proxy_target_class(true);
    let proxy = factory.get_proxy().unwrap();

    assert!(!proxy.is_interface_based());
    assert!(proxy.proxied_interfaces().is_empty());
    WorldProxy::set_message(&proxy, "Rust").unwrap();
    assert_eq!(WorldProxy::get_message(&proxy).unwrap(), "Rust");
}

#[test]
fn test_class_proxy_bypasses_non_overridable_methods() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut factory = ProxyFactory::with_target(World::with_message("World"));
    factory
        .set_proxy_target_class(true)
        .add_advice(counting_advice(&counter));
    let proxy = factory.get_proxy().unwrap();

    // 不可覆盖
    assert_eq!(WorldProxy::version(&proxy).unwrap(), 1);
    // 私有
    assert_eq!(proxy.invoke("secret", Vec::new()).unwrap(), "secret");
    // 静态
    assert_eq!(proxy.invoke("describe", Vec::new()).unwrap(), "World");
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    assert_eq!(WorldProxy::get_message(&proxy).unwrap(), "World");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sealed_type_cannot_be_class_proxied() {
    let err = create_proxy(Arc::new(FinalWorld), Vec::new(), true).unwrap_err();
    assert!(matches!(err, AopError::Configuration(_)));

    // 没有接口时也只能创建基于子类的代理
    let err = create_proxy(Arc::new(FinalWorld), Vec::new(), false).unwrap_err();
    assert!(matches!(err, AopError::Configuration(_)));
}

#[test]
fn test_missing_target_is_configuration_error() {
    let err = ProxyFactory::new().get_proxy().unwrap_err();
    assert!(matches!(err, AopError::Configuration(_)));
}

#[test]
fn test_unimplemented_interface_is_configuration_error() {
    let mut factory = ProxyFactory::with_target(World::default());
    factory.set_interfaces([&SecureBean]);
    let err = factory.get_proxy().unwrap_err();
    assert!(matches!(err, AopError::Configuration(_)));
}

#[test]
fn test_argument_type_mismatch() {
    let mut factory = ProxyFactory::with_target(World::default());
    factory.set_proxy_target_class(true);
    let proxy = factory.get_proxy().unwrap();

    let err = proxy.invoke("set_message", vec![Value::from(42i64)]).unwrap_err();
    assert!(err.is_exception_of(ErrorKind::IllegalArgument));

    let err = proxy.invoke("set_message", Vec::new()).unwrap_err();
    assert!(err.is_exception_of(ErrorKind::IllegalArgument));
}

#[test]
fn test_same_advice_twice_applies_twice() {
    let counter = Arc::new(AtomicUsize::new(0));
    let advice = counting_advice(&counter);
    let mut factory = ProxyFactory::with_target(World::default());
    factory.add_advice(advice.clone()).add_advice(advice);
    let proxy = factory.get_proxy().unwrap();

    MessageSource::get_message(&proxy).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_static_match_cache_toggle_gives_same_result() {
    for cache in [true, false] {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut factory = ProxyFactory::with_target(World::default());
        factory
            .set_proxy_target_class(true)
            .set_cache_static_matches(cache)
            .add_advisor(Advisor::new(
                NameMatchMethodPointcut::new().add_method_name("get_*"),
                counting_advice(&counter),
            ));
        let proxy = factory.get_proxy().unwrap();

        for _ in 0..3 {
            WorldProxy::get_message(&proxy).unwrap();
            WorldProxy::set_message(&proxy, "x").unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}

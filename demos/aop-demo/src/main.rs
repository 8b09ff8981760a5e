mod aspects;
mod beans;

use aspectra_aop::prelude::*;
use aspectra_aop::{get_global_registry, SecurityInterceptor, SecurityManager, Value};
use aspectra_core::prelude::*;
use aspects::{exception_capture_advice, HelloAfterReturningAdvice, SimpleAdvice};
use beans::{
    ErrorBean, ErrorBeanProxy, MessageSource, SampleBean, SampleBeanProxy, SecureBean,
    SecureBeanTarget, SecureBeanTargetProxy, SlowRepository, SlowRepositoryProxy, World, WorldProxy,
};
use std::sync::Arc;

fn load_environment() -> anyhow::Result<Environment> {
    let env = Environment::with_defaults();

    let config_paths = ["demos/aop-demo/application.toml", "application.toml"];
    if let Some(path) = config_paths.iter().find(|p| std::path::Path::new(p).exists()) {
        let source = TomlPropertySource::from_file(path)
            .with_context(|| format!("loading {}", path))?;
        env.add_property_source(Box::new(source));
    }

    Ok(env)
}

fn section(title: &str) {
    println!("\n=== {} ===", title);
}

fn advice_types() -> anyhow::Result<()> {
    section("Advice types");

    let mut factory = ProxyFactory::with_target(World::new("World"));
    factory.add_advice(Advice::around(SimpleAdvice));
    let proxy = factory.get_proxy()?;
    println!("around (interface proxy): {}", MessageSource::get_message(&proxy)?);

    let mut factory = ProxyFactory::with_target(World::default());
    factory
        .set_proxy_target_class(true)
        .add_advice(Advice::before_fn(|jp| {
            println!("before: {}", jp.signature());
            Ok(())
        }))
        .add_advice(Advice::after_returning(HelloAfterReturningAdvice));
    let proxy = factory.get_proxy()?;
    // set_message 没有返回字符串，被返回后通知拒绝
    if let Err(e) = WorldProxy::set_message(&proxy, "Rust") {
        println!("after-returning rejected set_message: {}", e);
    }
    println!("get_message: {}", WorldProxy::get_message(&proxy)?);

    let mut factory = ProxyFactory::with_target(ErrorBean);
    factory.add_advice(Advice::after_throwing(exception_capture_advice()));
    let proxy = factory.get_proxy()?;
    if let Err(e) = ErrorBeanProxy::exception(&proxy) {
        println!("exception(): {}", e);
    }
    if let Err(e) = ErrorBeanProxy::illegal_argument_exception(&proxy) {
        println!("illegal_argument_exception(): {}", e);
    }
    Ok(())
}

fn pointcuts() -> anyhow::Result<()> {
    section("Pointcuts");

    let dynamic = DynamicMethodMatcherPointcut::new(
        "SimpleDynamicPointcut",
        |method, _| method.name == "dynamic_pointcut",
        |_, _, args| Ok(args.first().and_then(Value::as_i64) != Some(100)),
    )
    .with_class_filter(ClassFilter::exact("SampleBean"));
    let annotation = AnnotationMatchingPointcut::for_method_marker("CustomAnnotation");

    let proxy = create_proxy(
        Arc::new(SampleBean),
        vec![
            Advisor::new(dynamic, Advice::around(SimpleAdvice)),
            Advisor::new(annotation, Advice::around(SimpleAdvice)),
        ],
        true,
    )?;
    println!("dynamic(1): {}", SampleBeanProxy::dynamic_pointcut(&proxy, 1)?);
    println!("dynamic(100): {}", SampleBeanProxy::dynamic_pointcut(&proxy, 100)?);
    println!("annotation: {}", SampleBeanProxy::annotation_pointcut(&proxy)?);

    let mut factory = ProxyFactory::with_target(World::new("World"));
    factory
        .set_proxy_target_class(true)
        .add_advisor(Advisor::new(
            NameMatchMethodPointcut::new().add_method_name("get_message"),
            Advice::around(SimpleAdvice),
        ));
    let proxy = factory.get_proxy()?;
    println!("name match: {}", WorldProxy::get_message(&proxy)?);
    println!("sealed version(): {}", WorldProxy::version(&proxy)?);
    Ok(())
}

fn security(properties: &AopProperties) -> anyhow::Result<()> {
    section("Security");

    let mut factory = ProxyFactory::with_target(SecureBeanTarget);
    factory.add_advice(Advice::around(SecurityInterceptor::from_properties(properties)));
    let interface_proxy = factory.get_proxy()?;

    let mut factory = ProxyFactory::new();
    factory
        .set_target_class::<SecureBeanTarget>()
        .add_advice(Advice::around(SecurityInterceptor::from_properties(properties)));
    let class_proxy = factory.get_proxy()?;

    let manager = SecurityManager::new();
    for user in ["gugu", "invalid user"] {
        manager.login(user, "pwd");
        match SecureBean::write_secure_message(&interface_proxy) {
            Ok(()) => println!("{} wrote through the interface proxy", user),
            Err(e) => println!("{} denied: {}", user, e),
        }
        match SecureBeanTargetProxy::write_secure_message(&class_proxy) {
            Ok(()) => println!("{} wrote through the class proxy", user),
            Err(e) => println!("{} denied: {}", user, e),
        }
        manager.logout();
    }

    if let Err(e) = SecureBean::write_secure_message(&interface_proxy) {
        println!("anonymous denied: {}", e);
    }
    Ok(())
}

fn registered_aspects() -> anyhow::Result<()> {
    section("Aspects");

    let registry = get_global_registry();
    for aspect in registry.aspects() {
        println!("aspect {} -> {}", aspect.name(), aspect.pointcut());
    }

    let mut factory = ProxyFactory::with_target(World::new("World"));
    factory.set_proxy_target_class(true).add_aspects(registry);
    let proxy = factory.get_proxy()?;
    println!("aspect result: {}", WorldProxy::get_message(&proxy)?);
    Ok(())
}

async fn concurrent_calls(properties: &AopProperties) -> anyhow::Result<()> {
    section("Concurrent invocations");

    let mut factory = ProxyFactory::with_properties(properties);
    factory
        .set_target(SlowRepository)
        .add_advice(Advice::around(PerformanceInterceptor::from_properties(properties)))
        .add_advice(Advice::around(LoggingInterceptor::new().with_args().with_result()));
    let proxy = factory.get_proxy()?;

    let mut handles = Vec::new();
    for delay in [5i64, 20, 80] {
        let proxy = proxy.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            SlowRepositoryProxy::find_all(&proxy, delay)
        }));
    }
    for handle in handles {
        println!("find_all: {:?}", handle.await??);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("\n╔════════════════════════════════════════════════════╗");
    println!("║          Aspectra AOP - Interception Demo          ║");
    println!("╚════════════════════════════════════════════════════╝");

    let env = load_environment()?;
    LoggingConfig::from_environment(&env)?.init()?;
    tracing::info!("Property sources: {:?}", env.source_names());

    let properties = AopProperties::from_environment(&env)?;
    tracing::info!("Using {:?}", properties);

    advice_types()?;
    pointcuts()?;
    security(&properties)?;
    registered_aspects()?;
    concurrent_calls(&properties).await?;

    println!("\nDone.");
    Ok(())
}

//! 代理工厂与代理分派
//!
//! `ProxyFactory` 收集目标对象与通知器，生成不可变的 `Proxy`。
//! 每次调用时代理找出匹配的通知器，按注册顺序组成调用链，最后调用目标方法。

use crate::advice::Advice;
use crate::advisor::Advisor;
use crate::error::{AopError, AopResult};
use crate::joinpoint::Invocation;
use crate::metadata::{InterfaceDescriptor, MethodSignature, Target, TypeDescriptor};
use crate::pointcut::matches_statically;
use crate::properties::AopProperties;
use crate::registry::AspectRegistry;
use crate::value::{FromValue, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 代理工厂
///
/// 配置阶段可变；`get_proxy()` 生成的代理此后不再受工厂修改影响
pub struct ProxyFactory {
    target: Option<Arc<dyn Target>>,
    advisors: Vec<Advisor>,
    proxy_target_class: bool,
    interfaces: Option<Vec<&'static InterfaceDescriptor>>,
    cache_static_matches: bool,
}

impl ProxyFactory {
    pub fn new() -> Self {
        Self {
            target: None,
            advisors: Vec::new(),
            proxy_target_class: false,
            interfaces: None,
            cache_static_matches: true,
        }
    }

    pub fn with_target(target: impl Target) -> Self {
        let mut factory = Self::new();
        factory.set_target(target);
        factory
    }

    /// 按配置创建工厂
    pub fn with_properties(properties: &AopProperties) -> Self {
        let mut factory = Self::new();
        factory
            .set_proxy_target_class(properties.proxy_target_class)
            .set_cache_static_matches(properties.cache_static_matches);
        factory
    }

    pub fn set_target(&mut self, target: impl Target) -> &mut Self {
        self.target = Some(Arc::new(target));
        self
    }

    /// 多个代理共享同一个目标对象
    pub fn set_shared_target(&mut self, target: Arc<dyn Target>) -> &mut Self {
        self.target = Some(target);
        self
    }

    /// 由类型创建目标对象，并强制使用基于子类的代理
    pub fn set_target_class<T: Target + Default>(&mut self) -> &mut Self {
        self.proxy_target_class = true;
        self.set_target(T::default())
    }

    pub fn add_advice(&mut self, advice: Advice) -> &mut Self {
        self.add_advisor(Advisor::always(advice))
    }

    /// 注册顺序即调用链顺序；重复注册的通知器会执行两次
    pub fn add_advisor(&mut self, advisor: Advisor) -> &mut Self {
        tracing::debug!("Adding advisor: {:?}", advisor);
        self.advisors.push(advisor);
        self
    }

    pub fn add_aspects(&mut self, registry: &AspectRegistry) -> &mut Self {
        for advisor in registry.advisors() {
            self.add_advisor(advisor);
        }
        self
    }

    pub fn set_proxy_target_class(&mut self, proxy_target_class: bool) -> &mut Self {
        self.proxy_target_class = proxy_target_class;
        self
    }

    /// 只代理给定的接口；目标未实现其中任何一个时创建代理失败
    pub fn set_interfaces<I>(&mut self, interfaces: I) -> &mut Self
    where
        I: IntoIterator<Item = &'static InterfaceDescriptor>,
    {
        self.interfaces = Some(interfaces.into_iter().collect());
        self
    }

    pub fn set_cache_static_matches(&mut self, cache: bool) -> &mut Self {
        self.cache_static_matches = cache;
        self
    }

    pub fn advisors(&self) -> &[Advisor] {
        &self.advisors
    }

    pub fn is_proxy_target_class(&self) -> bool {
        self.proxy_target_class
    }

    pub fn get_proxy(&self) -> AopResult<Proxy> {
        let target = self
            .target
            .clone()
            .ok_or_else(|| AopError::configuration("no target object set on the proxy factory"))?;
        build_proxy(
            target,
            self.advisors.clone(),
            self.proxy_target_class,
            self.interfaces.clone(),
            self.cache_static_matches,
        )
    }
}

impl Default for ProxyFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("target", &self.target.as_ref().map(|t| t.descriptor().name))
            .field("advisors", &self.advisors)
            .field("proxy_target_class", &self.proxy_target_class)
            .field(
                "interfaces",
                &self
                    .interfaces
                    .as_ref()
                    .map(|list| list.iter().map(|i| i.name).collect::<Vec<_>>()),
            )
            .finish()
    }
}

/// 直接由目标与通知器列表创建代理
///
/// `use_class_based_proxy` 为 false 且目标实现了接口时创建基于接口的代理
pub fn create_proxy(
    target: Arc<dyn Target>,
    advisors: Vec<Advisor>,
    use_class_based_proxy: bool,
) -> AopResult<Proxy> {
    build_proxy(target, advisors, use_class_based_proxy, None, true)
}

fn build_proxy(
    target: Arc<dyn Target>,
    advisors: Vec<Advisor>,
    proxy_target_class: bool,
    interfaces: Option<Vec<&'static InterfaceDescriptor>>,
    cache_static_matches: bool,
) -> AopResult<Proxy> {
    let descriptor = target.descriptor();

    if let Some(explicit) = &interfaces {
        if let Some(missing) = explicit.iter().find(|i| !descriptor.implements(i.name)) {
            return Err(AopError::configuration(format!(
                "{} does not implement interface {}",
                descriptor.name, missing.name
            )));
        }
    }

    let kind = if proxy_target_class {
        ProxyKind::Subclass
    } else {
        let proxied: Vec<&'static InterfaceDescriptor> =
            interfaces.unwrap_or_else(|| descriptor.interfaces.to_vec());
        if proxied.is_empty() {
            ProxyKind::Subclass
        } else {
            ProxyKind::Interface(proxied)
        }
    };

    if matches!(kind, ProxyKind::Subclass) && descriptor.sealed {
        return Err(AopError::configuration(format!(
            "cannot create a class-based proxy of sealed type {}",
            descriptor.name
        )));
    }

    tracing::debug!(
        "Creating {} proxy for {} with {} advisor(s)",
        kind.label(),
        descriptor.name,
        advisors.len()
    );

    Ok(Proxy {
        inner: Arc::new(ProxyInner {
            target,
            advisors,
            kind,
            cache: cache_static_matches.then(|| RwLock::new(HashMap::new())),
        }),
    })
}

enum ProxyKind {
    /// 只暴露给定接口声明的方法
    Interface(Vec<&'static InterfaceDescriptor>),
    /// 可覆盖的方法走通知链，其余方法直接调用目标
    Subclass,
}

impl ProxyKind {
    fn label(&self) -> &'static str {
        match self {
            ProxyKind::Interface(_) => "interface-based",
            ProxyKind::Subclass => "class-based",
        }
    }
}

struct ProxyInner {
    target: Arc<dyn Target>,
    advisors: Vec<Advisor>,
    kind: ProxyKind,
    /// 方法名 -> 静态匹配通过的通知器下标
    cache: Option<RwLock<HashMap<&'static str, Arc<[usize]>>>>,
}

/// 代理对象
///
/// 可以廉价克隆并在线程间共享
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<ProxyInner>,
}

impl Proxy {
    /// 按方法名调用
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> AopResult<Value> {
        let descriptor = self.inner.target.descriptor();
        let signature = descriptor
            .method(method)
            .ok_or_else(|| self.no_such_method(method))?;
        self.invoke_method(signature, args)
    }

    /// 调用并把返回值转换为具体类型
    pub fn call<T: FromValue>(&self, method: &str, args: Vec<Value>) -> AopResult<T> {
        let value = self.invoke(method, args)?;
        Ok(T::from_value(&value)?)
    }

    pub fn invoke_method(
        &self,
        method: &'static MethodSignature,
        args: Vec<Value>,
    ) -> AopResult<Value> {
        let inner = &self.inner;
        let descriptor = inner.target.descriptor();

        match &inner.kind {
            ProxyKind::Interface(interfaces) => {
                if !interfaces.iter().any(|i| i.declares(method.name)) {
                    return Err(self.no_such_method(method.name));
                }
            }
            ProxyKind::Subclass => {
                if !method.is_overridable() {
                    tracing::trace!(
                        "{} is {:?}, bypassing advice",
                        method,
                        method.modifier
                    );
                    return Ok(inner.target.invoke(method, &args)?);
                }
            }
        }

        let matched = self.static_matches(method, descriptor)?;
        let mut chain: Vec<Advice> = Vec::with_capacity(matched.len());
        for &idx in matched.iter() {
            let advisor = &inner.advisors[idx];
            let pointcut = advisor.pointcut();
            if pointcut.is_runtime() && !pointcut.matches_runtime(method, descriptor, &args)? {
                continue;
            }
            chain.push(advisor.advice().clone());
        }

        if chain.is_empty() {
            tracing::trace!("No advice for {}, invoking target directly", method);
            return Ok(inner.target.invoke(method, &args)?);
        }

        tracing::trace!("Invoking {} through {} advice(s)", method, chain.len());
        let (outcome, state) =
            Invocation::new(inner.target.as_ref(), method, args, &chain).run();
        tracing::trace!("Invocation of {} finished in state {:?}", method, state);
        Ok(outcome?)
    }

    fn static_matches(
        &self,
        method: &'static MethodSignature,
        descriptor: &TypeDescriptor,
    ) -> AopResult<Arc<[usize]>> {
        let inner = &self.inner;
        if let Some(cache) = &inner.cache {
            if let Some(hit) = cache.read().get(method.name) {
                return Ok(Arc::clone(hit));
            }
        }

        let mut matched = Vec::new();
        for (idx, advisor) in inner.advisors.iter().enumerate() {
            if matches_statically(advisor.pointcut(), method, descriptor)? {
                matched.push(idx);
            }
        }
        let matched: Arc<[usize]> = matched.into();

        if let Some(cache) = &inner.cache {
            cache.write().insert(method.name, Arc::clone(&matched));
        }
        Ok(matched)
    }

    fn no_such_method(&self, method: &str) -> AopError {
        AopError::NoSuchMethod {
            type_name: self.inner.target.descriptor().name.to_string(),
            method: method.to_string(),
        }
    }

    pub fn is_interface_based(&self) -> bool {
        matches!(self.inner.kind, ProxyKind::Interface(_))
    }

    pub fn proxied_interfaces(&self) -> Vec<&'static str> {
        match &self.inner.kind {
            ProxyKind::Interface(interfaces) => interfaces.iter().map(|i| i.name).collect(),
            ProxyKind::Subclass => Vec::new(),
        }
    }

    pub fn target_type(&self) -> &'static TypeDescriptor {
        self.inner.target.descriptor()
    }

    pub fn target(&self) -> &Arc<dyn Target> {
        &self.inner.target
    }

    pub fn advisors(&self) -> &[Advisor] {
        &self.inner.advisors
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("target", &self.target_type().name)
            .field("kind", &self.inner.kind.label())
            .field("advisors", &self.inner.advisors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Exception};
    use crate::metadata::{check_arity, Modifier};
    use crate::pointcut::{DynamicMethodMatcherPointcut, NameMatchMethodPointcut};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static MESSAGE_SOURCE: InterfaceDescriptor = InterfaceDescriptor {
        name: "MessageSource",
        methods: &["get_message"],
    };

    static CLOSEABLE: InterfaceDescriptor = InterfaceDescriptor {
        name: "Closeable",
        methods: &["close"],
    };

    static WORLD: TypeDescriptor = TypeDescriptor {
        name: "World",
        interfaces: &[&MESSAGE_SOURCE],
        markers: &[],
        sealed: false,
        methods: &[
            MethodSignature::new("World", "get_message"),
            MethodSignature::new("World", "set_message").with_arity(1),
            MethodSignature::new("World", "version").with_modifier(Modifier::Final),
        ],
    };

    static SEALED_WORLD: TypeDescriptor = TypeDescriptor {
        name: "SealedWorld",
        interfaces: &[],
        markers: &[],
        sealed: true,
        methods: &[MethodSignature::new("SealedWorld", "get_message")],
    };

    #[derive(Default)]
    struct World {
        message: Mutex<String>,
    }

    impl Target for World {
        fn descriptor(&self) -> &'static TypeDescriptor {
            &WORLD
        }

        fn invoke(&self, method: &MethodSignature, args: &[Value]) -> Result<Value, Exception> {
            check_arity(method, args)?;
            match method.name {
                "get_message" => Ok(Value::from(self.message.lock().clone())),
                "set_message" => {
                    *self.message.lock() = String::from_value(&args[0])?;
                    Ok(Value::Unit)
                }
                "version" => Ok(Value::from(1)),
                other => Err(Exception::new(
                    ErrorKind::UnsupportedOperation,
                    format!("World has no method {}", other),
                )),
            }
        }
    }

    struct SealedWorld;

    impl Target for SealedWorld {
        fn descriptor(&self) -> &'static TypeDescriptor {
            &SEALED_WORLD
        }

        fn invoke(&self, _method: &MethodSignature, _args: &[Value]) -> Result<Value, Exception> {
            Ok(Value::from("sealed"))
        }
    }

    fn greeting() -> Advice {
        Advice::around_fn(|inv| {
            let message = inv.proceed()?;
            Ok(Value::from(format!("Hello, {}!", message)))
        })
    }

    #[test]
    fn test_no_target_is_configuration_error() {
        let err = ProxyFactory::new().get_proxy().unwrap_err();
        assert!(matches!(err, AopError::Configuration(_)));
    }

    #[test]
    fn test_around_wraps_result() {
        let mut factory = ProxyFactory::with_target(World::default());
        factory.add_advice(greeting());
        let proxy = factory.get_proxy().unwrap();

        assert!(proxy.is_interface_based());
        assert_eq!(proxy.call::<String>("get_message", vec![]).unwrap(), "Hello, !");
    }

    #[test]
    fn test_interface_proxy_hides_undeclared_members() {
        let proxy = ProxyFactory::with_target(World::default()).get_proxy().unwrap();
        let err = proxy.invoke("set_message", vec![Value::from("x")]).unwrap_err();
        assert!(matches!(err, AopError::NoSuchMethod { .. }));

        let err = proxy.invoke("missing", vec![]).unwrap_err();
        assert!(matches!(err, AopError::NoSuchMethod { .. }));
    }

    #[test]
    fn test_class_proxy_bypasses_final_members() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut factory = ProxyFactory::with_target(World::default());
        factory
            .set_proxy_target_class(true)
            .add_advice(Advice::before_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        let proxy = factory.get_proxy().unwrap();

        assert!(!proxy.is_interface_based());
        assert_eq!(proxy.invoke("version", vec![]).unwrap(), Value::Int(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        proxy.invoke("set_message", vec![Value::from("World")]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sealed_class_proxy_rejected() {
        let err = create_proxy(Arc::new(SealedWorld), Vec::new(), true).unwrap_err();
        assert!(matches!(err, AopError::Configuration(_)));

        // 没有接口时同样退化为基于子类的代理
        let err = create_proxy(Arc::new(SealedWorld), Vec::new(), false).unwrap_err();
        assert!(matches!(err, AopError::Configuration(_)));
    }

    #[test]
    fn test_unimplemented_interface_rejected() {
        let mut factory = ProxyFactory::with_target(World::default());
        factory.set_interfaces([&CLOSEABLE]);
        let err = factory.get_proxy().unwrap_err();
        assert!(err.to_string().contains("Closeable"));
    }

    #[test]
    fn test_name_match_pointcut_selects_methods() {
        let mut factory = ProxyFactory::with_target(World::default());
        factory.set_proxy_target_class(true).add_advisor(Advisor::new(
            NameMatchMethodPointcut::new().add_method_name("get_message"),
            greeting(),
        ));
        let proxy = factory.get_proxy().unwrap();

        proxy.invoke("set_message", vec![Value::from("World")]).unwrap();
        assert_eq!(proxy.invoke("get_message", vec![]).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_registration_order_and_duplicates() {
        let trail = Arc::new(Mutex::new(Vec::new()));
        let record = |tag: &'static str| {
            let trail = Arc::clone(&trail);
            Advice::before_fn(move |_| {
                trail.lock().push(tag);
                Ok(())
            })
        };
        let first = record("first");

        let mut factory = ProxyFactory::with_target(World::default());
        factory
            .add_advice(first.clone())
            .add_advice(record("second"))
            .add_advice(first);
        factory.get_proxy().unwrap().invoke("get_message", vec![]).unwrap();

        assert_eq!(*trail.lock(), vec!["first", "second", "first"]);
    }

    #[test]
    fn test_dynamic_pointcut_checks_arguments_each_call() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let pointcut = DynamicMethodMatcherPointcut::new(
            "short-messages",
            |method, _| method.name == "set_message",
            |_, _, args| Ok(args[0].as_str().map_or(false, |s| s.len() < 5)),
        );
        let mut factory = ProxyFactory::with_target(World::default());
        factory.set_proxy_target_class(true).add_advisor(Advisor::new(
            pointcut,
            Advice::before_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ));
        let proxy = factory.get_proxy().unwrap();

        proxy.invoke("set_message", vec![Value::from("abc")]).unwrap();
        proxy.invoke("set_message", vec![Value::from("abcdefgh")]).unwrap();
        proxy.invoke("set_message", vec![Value::from("xy")]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_exception_propagates_unchanged() {
        let mut factory = ProxyFactory::with_target(World::default());
        factory.set_proxy_target_class(true).add_advice(greeting());
        let proxy = factory.get_proxy().unwrap();

        let err = proxy.invoke("set_message", vec![Value::from(3)]).unwrap_err();
        assert!(err.is_exception_of(ErrorKind::IllegalArgument));
    }

    #[test]
    fn test_cache_toggle_keeps_results() {
        for cache in [true, false] {
            let properties = AopProperties {
                proxy_target_class: true,
                cache_static_matches: cache,
                ..AopProperties::default()
            };
            let mut factory = ProxyFactory::with_properties(&properties);
            factory.set_target(World::default()).add_advice(greeting());
            let proxy = factory.get_proxy().unwrap();
            for _ in 0..3 {
                assert_eq!(proxy.call::<String>("get_message", vec![]).unwrap(), "Hello, !");
            }
        }
    }
}

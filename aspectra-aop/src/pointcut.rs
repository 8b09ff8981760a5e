//! 切点（Pointcut）
//!
//! 切点由类过滤器（`ClassFilter`）和方法匹配器（`MethodMatcher`）组成。
//! 静态切点的结果只取决于方法签名，可以按方法缓存；
//! 动态切点（`is_runtime() == true`）在静态匹配通过后，每次调用还要结合实际参数再判断一次。

use crate::error::{AopError, AopResult};
use crate::metadata::{MethodSignature, TypeDescriptor};
use crate::value::Value;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// 类过滤器
#[derive(Clone)]
pub enum ClassFilter {
    /// 匹配所有类型
    True,
    /// 只匹配指定名称的类型
    Exact(&'static str),
    /// 自定义匹配函数
    Custom(Arc<dyn Fn(&TypeDescriptor) -> bool + Send + Sync>),
}

impl ClassFilter {
    pub fn exact(type_name: &'static str) -> Self {
        ClassFilter::Exact(type_name)
    }

    pub fn custom<F>(filter: F) -> Self
    where
        F: Fn(&TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        ClassFilter::Custom(Arc::new(filter))
    }

    pub fn matches(&self, target_type: &TypeDescriptor) -> bool {
        match self {
            ClassFilter::True => true,
            ClassFilter::Exact(name) => target_type.name == *name,
            ClassFilter::Custom(filter) => filter(target_type),
        }
    }
}

impl fmt::Debug for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassFilter::True => write!(f, "True"),
            ClassFilter::Exact(name) => write!(f, "Exact({})", name),
            ClassFilter::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}

/// 方法匹配器
pub trait MethodMatcher: Send + Sync {
    /// 静态匹配，只依赖方法签名与目标类型
    fn matches(&self, method: &MethodSignature, target_type: &TypeDescriptor) -> AopResult<bool>;

    /// 是否需要在每次调用时结合参数再匹配
    fn is_runtime(&self) -> bool {
        false
    }

    /// 动态匹配，仅在静态匹配通过且 `is_runtime()` 为 true 时调用
    fn matches_runtime(
        &self,
        _method: &MethodSignature,
        _target_type: &TypeDescriptor,
        _args: &[Value],
    ) -> AopResult<bool> {
        Ok(true)
    }
}

/// 切点
pub trait Pointcut: MethodMatcher {
    fn class_filter(&self) -> &ClassFilter;

    /// 切点名称，用于日志与错误信息
    fn name(&self) -> &str;
}

/// 静态匹配：类过滤器与方法匹配器都要通过
pub fn matches_statically(
    pointcut: &dyn Pointcut,
    method: &MethodSignature,
    target_type: &TypeDescriptor,
) -> AopResult<bool> {
    if !pointcut.class_filter().matches(target_type) {
        return Ok(false);
    }
    pointcut.matches(method, target_type)
}

/// 简单通配符匹配
///
/// 支持的模式：
/// - `*` - 匹配任意字符串
/// - `get*` - 以 get 开头
/// - `*_message` - 以 _message 结尾
/// - `*message*` - 包含 message
/// - `get*message` - 任意位置的多个 `*`
pub fn simple_match(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }

    let mut parts = pattern.split('*');
    let mut rest = candidate;

    // 首段必须是前缀
    if let Some(first) = parts.next() {
        match rest.strip_prefix(first) {
            Some(stripped) => rest = stripped,
            None => return false,
        }
    }

    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        return true;
    };

    for segment in middle {
        match rest.find(segment) {
            Some(idx) => rest = &rest[idx + segment.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}

// ============================================================================
// 预定义切点
// ============================================================================

/// 匹配所有方法的切点
#[derive(Debug, Default, Clone, Copy)]
pub struct TruePointcut;

static TRUE_FILTER: ClassFilter = ClassFilter::True;

impl MethodMatcher for TruePointcut {
    fn matches(&self, _method: &MethodSignature, _target_type: &TypeDescriptor) -> AopResult<bool> {
        Ok(true)
    }
}

impl Pointcut for TruePointcut {
    fn class_filter(&self) -> &ClassFilter {
        &TRUE_FILTER
    }

    fn name(&self) -> &str {
        "TruePointcut"
    }
}

/// 按方法名匹配的切点
///
/// 名称支持 `*` 通配符；没有配置任何名称时不匹配任何方法
#[derive(Debug, Clone)]
pub struct NameMatchMethodPointcut {
    names: Vec<String>,
    class_filter: ClassFilter,
}

impl NameMatchMethodPointcut {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            class_filter: ClassFilter::True,
        }
    }

    pub fn add_method_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn with_class_filter(mut self, filter: ClassFilter) -> Self {
        self.class_filter = filter;
        self
    }

    pub fn method_names(&self) -> &[String] {
        &self.names
    }
}

impl Default for NameMatchMethodPointcut {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodMatcher for NameMatchMethodPointcut {
    fn matches(&self, method: &MethodSignature, _target_type: &TypeDescriptor) -> AopResult<bool> {
        Ok(self.names.iter().any(|name| simple_match(name, method.name)))
    }
}

impl Pointcut for NameMatchMethodPointcut {
    fn class_filter(&self) -> &ClassFilter {
        &self.class_filter
    }

    fn name(&self) -> &str {
        "NameMatchMethodPointcut"
    }
}

/// 按正则表达式匹配 `Type.method` 的切点
#[derive(Debug, Clone)]
pub struct RegexMethodPointcut {
    patterns: Vec<Regex>,
    excluded: Vec<Regex>,
}

impl RegexMethodPointcut {
    /// 正则非法时返回 `AopError::Match`
    pub fn new<I, S>(patterns: I) -> AopResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: Self::compile(patterns)?,
            excluded: Vec::new(),
        })
    }

    pub fn with_excluded<I, S>(mut self, patterns: I) -> AopResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded = Self::compile(patterns)?;
        Ok(self)
    }

    fn compile<I, S>(patterns: I) -> AopResult<Vec<Regex>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|e| AopError::matching("RegexMethodPointcut", format!("'{}': {}", p, e)))
            })
            .collect()
    }
}

impl MethodMatcher for RegexMethodPointcut {
    fn matches(&self, method: &MethodSignature, target_type: &TypeDescriptor) -> AopResult<bool> {
        let qualified = format!("{}.{}", target_type.name, method.name);
        let included = self.patterns.iter().any(|re| re.is_match(&qualified));
        Ok(included && !self.excluded.iter().any(|re| re.is_match(&qualified)))
    }
}

impl Pointcut for RegexMethodPointcut {
    fn class_filter(&self) -> &ClassFilter {
        &TRUE_FILTER
    }

    fn name(&self) -> &str {
        "RegexMethodPointcut"
    }
}

type StaticMatchFn = dyn Fn(&MethodSignature, &TypeDescriptor) -> bool + Send + Sync;
type RuntimeMatchFn = dyn Fn(&MethodSignature, &TypeDescriptor, &[Value]) -> AopResult<bool> + Send + Sync;

/// 静态方法匹配切点
///
/// 结果只依赖方法签名，代理会按方法缓存匹配结果
#[derive(Clone)]
pub struct StaticMethodMatcherPointcut {
    name: String,
    matcher: Arc<StaticMatchFn>,
    class_filter: ClassFilter,
}

impl StaticMethodMatcherPointcut {
    pub fn new<F>(name: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&MethodSignature, &TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher: Arc::new(matcher),
            class_filter: ClassFilter::True,
        }
    }

    pub fn with_class_filter(mut self, filter: ClassFilter) -> Self {
        self.class_filter = filter;
        self
    }
}

impl MethodMatcher for StaticMethodMatcherPointcut {
    fn matches(&self, method: &MethodSignature, target_type: &TypeDescriptor) -> AopResult<bool> {
        Ok((self.matcher)(method, target_type))
    }
}

impl Pointcut for StaticMethodMatcherPointcut {
    fn class_filter(&self) -> &ClassFilter {
        &self.class_filter
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 动态方法匹配切点
///
/// 先做静态检查，通过后每次调用再用实际参数做动态检查
#[derive(Clone)]
pub struct DynamicMethodMatcherPointcut {
    name: String,
    static_check: Arc<StaticMatchFn>,
    runtime_check: Arc<RuntimeMatchFn>,
    class_filter: ClassFilter,
}

impl DynamicMethodMatcherPointcut {
    pub fn new<S, R>(name: impl Into<String>, static_check: S, runtime_check: R) -> Self
    where
        S: Fn(&MethodSignature, &TypeDescriptor) -> bool + Send + Sync + 'static,
        R: Fn(&MethodSignature, &TypeDescriptor, &[Value]) -> AopResult<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            static_check: Arc::new(static_check),
            runtime_check: Arc::new(runtime_check),
            class_filter: ClassFilter::True,
        }
    }

    pub fn with_class_filter(mut self, filter: ClassFilter) -> Self {
        self.class_filter = filter;
        self
    }
}

impl MethodMatcher for DynamicMethodMatcherPointcut {
    fn matches(&self, method: &MethodSignature, target_type: &TypeDescriptor) -> AopResult<bool> {
        Ok((self.static_check)(method, target_type))
    }

    fn is_runtime(&self) -> bool {
        true
    }

    fn matches_runtime(
        &self,
        method: &MethodSignature,
        target_type: &TypeDescriptor,
        args: &[Value],
    ) -> AopResult<bool> {
        (self.runtime_check)(method, target_type, args)
    }
}

impl Pointcut for DynamicMethodMatcherPointcut {
    fn class_filter(&self) -> &ClassFilter {
        &self.class_filter
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 标记（注解）匹配切点
#[derive(Debug, Clone)]
pub struct AnnotationMatchingPointcut {
    class_marker: Option<String>,
    method_marker: Option<String>,
    class_filter: ClassFilter,
}

impl AnnotationMatchingPointcut {
    /// 方法上带有指定标记
    pub fn for_method_marker(marker: impl Into<String>) -> Self {
        Self {
            class_marker: None,
            method_marker: Some(marker.into()),
            class_filter: ClassFilter::True,
        }
    }

    /// 声明类型上带有指定标记，匹配该类型的所有方法
    pub fn for_class_marker(marker: impl Into<String>) -> Self {
        Self {
            class_marker: Some(marker.into()),
            method_marker: None,
            class_filter: ClassFilter::True,
        }
    }

    /// 类型与方法上都要带有对应标记
    pub fn new(class_marker: impl Into<String>, method_marker: impl Into<String>) -> Self {
        Self {
            class_marker: Some(class_marker.into()),
            method_marker: Some(method_marker.into()),
            class_filter: ClassFilter::True,
        }
    }
}

impl MethodMatcher for AnnotationMatchingPointcut {
    fn matches(&self, method: &MethodSignature, target_type: &TypeDescriptor) -> AopResult<bool> {
        let class_ok = self
            .class_marker
            .as_deref()
            .map_or(true, |marker| target_type.has_marker(marker));
        let method_ok = self
            .method_marker
            .as_deref()
            .map_or(true, |marker| method.has_marker(marker));
        Ok(class_ok && method_ok)
    }
}

impl Pointcut for AnnotationMatchingPointcut {
    fn class_filter(&self) -> &ClassFilter {
        &self.class_filter
    }

    fn name(&self) -> &str {
        "AnnotationMatchingPointcut"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Modifier;

    static WORLD: TypeDescriptor = TypeDescriptor {
        name: "World",
        interfaces: &[],
        markers: &["Service"],
        sealed: false,
        methods: &[
            MethodSignature::new("World", "get_message"),
            MethodSignature::new("World", "get_message_length"),
            MethodSignature::new("World", "set_message")
                .with_arity(1)
                .with_markers(&["CustomAnnotation"]),
            MethodSignature::new("World", "reset").with_modifier(Modifier::Final),
        ],
    };

    static OTHER: TypeDescriptor = TypeDescriptor {
        name: "Other",
        interfaces: &[],
        markers: &[],
        sealed: false,
        methods: &[MethodSignature::new("Other", "get_message")],
    };

    fn method(name: &str) -> &'static MethodSignature {
        WORLD.method(name).unwrap()
    }

    #[test]
    fn test_simple_match() {
        assert!(simple_match("*", "anything"));
        assert!(simple_match("get_message", "get_message"));
        assert!(!simple_match("get_message", "get_message_length"));
        assert!(simple_match("get*", "get_message"));
        assert!(simple_match("*message", "get_message"));
        assert!(simple_match("*mess*", "get_message_length"));
        assert!(simple_match("get*length", "get_message_length"));
        assert!(!simple_match("get*length", "get_message"));
        assert!(!simple_match("set*", "get_message"));
        assert!(!simple_match("a*a", "a"));
    }

    #[test]
    fn test_name_match_pointcut() {
        let pointcut = NameMatchMethodPointcut::new().add_method_name("get_message");
        assert!(pointcut.matches(method("get_message"), &WORLD).unwrap());
        assert!(!pointcut.matches(method("get_message_length"), &WORLD).unwrap());
        assert!(!pointcut.matches(method("set_message"), &WORLD).unwrap());
    }

    #[test]
    fn test_empty_name_match_matches_nothing() {
        let pointcut = NameMatchMethodPointcut::new();
        for m in WORLD.methods {
            assert!(!pointcut.matches(m, &WORLD).unwrap());
        }
    }

    #[test]
    fn test_class_filter() {
        let pointcut = StaticMethodMatcherPointcut::new("getMessage", |m, _| m.name == "get_message")
            .with_class_filter(ClassFilter::exact("World"));

        assert!(matches_statically(&pointcut, method("get_message"), &WORLD).unwrap());
        assert!(!matches_statically(&pointcut, &OTHER.methods[0], &OTHER).unwrap());
    }

    #[test]
    fn test_static_pointcut_is_idempotent() {
        let pointcut = StaticMethodMatcherPointcut::new("getMessage", |m, _| m.name == "get_message");
        let first = pointcut.matches(method("get_message"), &WORLD).unwrap();
        for _ in 0..10 {
            assert_eq!(pointcut.matches(method("get_message"), &WORLD).unwrap(), first);
        }
        assert!(!pointcut.is_runtime());
    }

    #[test]
    fn test_dynamic_pointcut() {
        let pointcut = DynamicMethodMatcherPointcut::new(
            "setMessage",
            |m, _| m.name == "set_message",
            |_, _, args| Ok(args.first().and_then(Value::as_str) != Some("skip")),
        );

        let m = method("set_message");
        assert!(pointcut.is_runtime());
        assert!(pointcut.matches(m, &WORLD).unwrap());
        assert!(pointcut.matches_runtime(m, &WORLD, &[Value::from("hello")]).unwrap());
        assert!(!pointcut.matches_runtime(m, &WORLD, &[Value::from("skip")]).unwrap());
    }

    #[test]
    fn test_annotation_pointcut() {
        let by_method = AnnotationMatchingPointcut::for_method_marker("CustomAnnotation");
        assert!(by_method.matches(method("set_message"), &WORLD).unwrap());
        assert!(!by_method.matches(method("get_message"), &WORLD).unwrap());

        let by_class = AnnotationMatchingPointcut::for_class_marker("Service");
        assert!(by_class.matches(method("get_message"), &WORLD).unwrap());
        assert!(!by_class.matches(&OTHER.methods[0], &OTHER).unwrap());

        let both = AnnotationMatchingPointcut::new("Service", "CustomAnnotation");
        assert!(both.matches(method("set_message"), &WORLD).unwrap());
        assert!(!both.matches(method("get_message"), &WORLD).unwrap());
    }

    #[test]
    fn test_regex_pointcut() {
        let pointcut = RegexMethodPointcut::new([r"^World\.get_.*$"])
            .unwrap()
            .with_excluded([r"_length$"])
            .unwrap();
        assert!(pointcut.matches(method("get_message"), &WORLD).unwrap());
        assert!(!pointcut.matches(method("get_message_length"), &WORLD).unwrap());
        assert!(!pointcut.matches(&OTHER.methods[0], &OTHER).unwrap());

        let err = RegexMethodPointcut::new(["get_("]).unwrap_err();
        assert!(matches!(err, AopError::Match { .. }));
    }
}

//! 切点表达式
//!
//! `ExpressionPointcut` 把表达式交给一个 `ExpressionMatcher` 求值。
//! 内置的 `AspectExpressionMatcher` 支持一个精简的表达式子集：
//!
//! - `execution([修饰符] <返回类型> [类型.]方法(参数))`，例如 `execution(public * get_message*(..))`
//! - `within(类型)`
//! - `@annotation(标记)`：方法带有标记
//! - `@within(标记)`：类型带有标记
//! - 使用 `&&`、`||`、`!` 与括号组合
//!
//! 名称和类型模式支持 `*` 通配符。修饰符可以是 `public`、`private`、`static`、`final`。
//! 返回类型按方法声明匹配（`Result<T, _>` 按 `T`），`void` 等同于 `()`。
//! 参数列表中 `*` 匹配一个参数，`..` 匹配零个或多个，其余按参数类型匹配：
//! `(..)` 任意参数，`(*, ..)` 至少一个，`(&str)` 恰好一个 `&str` 参数。

use crate::error::{AopError, AopResult};
use crate::metadata::{MethodSignature, Modifier, TypeDescriptor};
use crate::pointcut::{simple_match, ClassFilter, MethodMatcher, Pointcut};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// `execution` 中的修饰符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierPattern {
    Public,
    Private,
    Static,
    Final,
}

impl ModifierPattern {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "public" | "pub" => Some(ModifierPattern::Public),
            "private" => Some(ModifierPattern::Private),
            "static" => Some(ModifierPattern::Static),
            "final" => Some(ModifierPattern::Final),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            ModifierPattern::Public => "public",
            ModifierPattern::Private => "private",
            ModifierPattern::Static => "static",
            ModifierPattern::Final => "final",
        }
    }

    /// 关联函数不区分可见性，`public` 对它们总是成立
    fn matches(self, modifier: Modifier) -> bool {
        match self {
            ModifierPattern::Public => modifier != Modifier::Private,
            ModifierPattern::Private => modifier == Modifier::Private,
            ModifierPattern::Static => modifier == Modifier::Static,
            ModifierPattern::Final => modifier == Modifier::Final,
        }
    }
}

/// 参数列表中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamPattern {
    /// `*`：恰好一个任意类型的参数
    Any,
    /// `..`：零个或多个参数
    Rest,
    /// 按声明的参数类型匹配
    Type(String),
}

impl ParamPattern {
    fn matches(&self, declared: &str) -> bool {
        match self {
            ParamPattern::Any | ParamPattern::Rest => true,
            ParamPattern::Type(pattern) => !declared.is_empty() && simple_match(pattern, declared),
        }
    }
}

impl fmt::Display for ParamPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamPattern::Any => f.write_str("*"),
            ParamPattern::Rest => f.write_str(".."),
            ParamPattern::Type(pattern) => f.write_str(pattern),
        }
    }
}

/// 参数模式逐项匹配，`..` 可以吞掉任意个参数
fn params_match(patterns: &[ParamPattern], params: &[&str]) -> bool {
    match patterns.split_first() {
        None => params.is_empty(),
        Some((ParamPattern::Rest, rest)) => {
            (0..=params.len()).any(|skip| params_match(rest, &params[skip..]))
        }
        Some((pattern, rest)) => match params.split_first() {
            Some((param, tail)) => pattern.matches(param) && params_match(rest, tail),
            None => false,
        },
    }
}

/// 解析后的切点表达式
#[derive(Clone, PartialEq, Eq)]
pub enum PointcutExpression {
    /// `execution(...)`
    Execution {
        modifiers: Vec<ModifierPattern>,
        /// `*` 匹配任意返回类型，包括未知的
        return_pattern: String,
        type_pattern: Option<String>,
        method_pattern: String,
        params: Vec<ParamPattern>,
    },

    /// `within(Type)`
    Within(String),

    /// `@annotation(Marker)`
    Annotation(String),

    /// `@within(Marker)`
    WithinAnnotation(String),

    And(Box<PointcutExpression>, Box<PointcutExpression>),

    Or(Box<PointcutExpression>, Box<PointcutExpression>),

    Not(Box<PointcutExpression>),
}

impl PointcutExpression {
    pub fn parse(expression: &str) -> AopResult<Self> {
        let mut parser = Parser {
            source: expression,
            pos: 0,
        };
        let parsed = parser
            .parse_or()
            .map_err(|reason| AopError::matching(expression, reason))?;
        parser.skip_whitespace();
        if parser.pos != expression.len() {
            return Err(AopError::matching(
                expression,
                format!("unexpected input at offset {}", parser.pos),
            ));
        }
        Ok(parsed)
    }

    pub fn matches(&self, method: &MethodSignature, target_type: &TypeDescriptor) -> bool {
        match self {
            PointcutExpression::Execution {
                modifiers,
                return_pattern,
                type_pattern,
                method_pattern,
                params,
            } => {
                let type_ok = type_pattern.as_deref().map_or(true, |pattern| {
                    simple_match(pattern, target_type.name)
                        || simple_match(pattern, method.declaring_type)
                });
                let return_ok = return_pattern == "*"
                    || (!method.return_type.is_empty()
                        && simple_match(return_pattern, method.return_type));
                let declared: Vec<&str> = (0..method.arity)
                    .map(|i| method.param_types.get(i).copied().unwrap_or_default())
                    .collect();

                type_ok
                    && return_ok
                    && simple_match(method_pattern, method.name)
                    && modifiers.iter().all(|m| m.matches(method.modifier))
                    && params_match(params, &declared)
            }
            PointcutExpression::Within(pattern) => simple_match(pattern, target_type.name),
            PointcutExpression::Annotation(marker) => method.has_marker(marker),
            PointcutExpression::WithinAnnotation(marker) => target_type.has_marker(marker),
            PointcutExpression::And(left, right) => {
                left.matches(method, target_type) && right.matches(method, target_type)
            }
            PointcutExpression::Or(left, right) => {
                left.matches(method, target_type) || right.matches(method, target_type)
            }
            PointcutExpression::Not(inner) => !inner.matches(method, target_type),
        }
    }

    pub fn and(self, other: PointcutExpression) -> Self {
        PointcutExpression::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: PointcutExpression) -> Self {
        PointcutExpression::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> Self {
        PointcutExpression::Not(Box::new(self))
    }
}

impl fmt::Debug for PointcutExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointcutExpression::Execution {
                modifiers,
                return_pattern,
                type_pattern,
                method_pattern,
                params,
            } => {
                f.write_str("Execution(")?;
                for modifier in modifiers {
                    write!(f, "{} ", modifier.keyword())?;
                }
                write!(f, "{} ", return_pattern)?;
                if let Some(t) = type_pattern {
                    write!(f, "{}.", t)?;
                }
                let params: Vec<String> = params.iter().map(ToString::to_string).collect();
                write!(f, "{}({}))", method_pattern, params.join(", "))
            }
            PointcutExpression::Within(p) => write!(f, "Within({})", p),
            PointcutExpression::Annotation(m) => write!(f, "Annotation({})", m),
            PointcutExpression::WithinAnnotation(m) => write!(f, "WithinAnnotation({})", m),
            PointcutExpression::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            PointcutExpression::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            PointcutExpression::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}

/// 递归下降解析器，错误信息以字符串返回，由调用方包装为 `AopError::Match`
struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.source.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<PointcutExpression, String> {
        let mut left = self.parse_and()?;
        while self.eat("||") {
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<PointcutExpression, String> {
        let mut left = self.parse_unary()?;
        while self.eat("&&") {
            let right = self.parse_unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<PointcutExpression, String> {
        if self.eat("!") {
            return Ok(self.parse_unary()?.not());
        }
        if self.eat("(") {
            let inner = self.parse_or()?;
            if !self.eat(")") {
                return Err(format!("expected ')' at offset {}", self.pos));
            }
            return Ok(inner);
        }
        self.parse_designator()
    }

    fn parse_designator(&mut self) -> Result<PointcutExpression, String> {
        self.skip_whitespace();
        let start = self.pos;
        let name_len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '@' || c == '_'))
            .unwrap_or(self.rest().len());
        let name = &self.source[start..start + name_len];
        self.pos += name_len;

        if name.is_empty() {
            return Err(format!("expected a pointcut designator at offset {}", start));
        }
        if !self.eat("(") {
            return Err(format!("expected '(' after '{}'", name));
        }
        let body = self.take_balanced()?.trim();

        match name {
            "execution" => parse_execution(body),
            "within" => non_empty(body, name).map(|b| PointcutExpression::Within(b.to_string())),
            "@annotation" => {
                non_empty(body, name).map(|b| PointcutExpression::Annotation(b.to_string()))
            }
            "@within" => {
                non_empty(body, name).map(|b| PointcutExpression::WithinAnnotation(b.to_string()))
            }
            other => Err(format!("unsupported pointcut designator '{}'", other)),
        }
    }

    /// 读取到与已消费的 '(' 配对的 ')' 为止，返回括号内的文本
    fn take_balanced(&mut self) -> Result<&'a str, String> {
        let start = self.pos;
        let mut depth = 1usize;
        for (offset, c) in self.rest().char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = start + offset + 1;
                        return Ok(&self.source[start..start + offset]);
                    }
                }
                _ => {}
            }
        }
        Err(format!("unbalanced parentheses starting at offset {}", start))
    }
}

fn non_empty<'s>(body: &'s str, designator: &str) -> Result<&'s str, String> {
    if body.is_empty() {
        Err(format!("'{}' requires an argument", designator))
    } else {
        Ok(body)
    }
}

fn parse_execution(body: &str) -> Result<PointcutExpression, String> {
    let usage = || {
        format!(
            "execution requires '[modifiers] <return-type> <method>(<params>)', got '{}'",
            body
        )
    };
    if !body.ends_with(')') {
        return Err(format!("unterminated parameter list in '{}'", body));
    }
    let open = parameter_list_start(body)
        .ok_or_else(|| format!("missing parameter list in '{}'", body))?;
    let params = &body[open + 1..body.len() - 1];

    let mut head = split_top_level(&body[..open], char::is_whitespace);
    head.retain(|token| !token.is_empty());
    let qualified = head.pop().ok_or_else(usage)?;
    let return_pattern = head.pop().ok_or_else(usage)?;
    if ModifierPattern::from_keyword(return_pattern).is_some() {
        return Err(usage());
    }
    let modifiers = head
        .into_iter()
        .map(|token| {
            ModifierPattern::from_keyword(token)
                .ok_or_else(|| format!("unsupported modifier '{}' in '{}'", token, body))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (type_pattern, method_pattern) = match qualified.rsplit_once('.') {
        Some((type_pattern, method)) => (Some(type_pattern.to_string()), method),
        None => (None, qualified),
    };
    if method_pattern.is_empty() {
        return Err(format!("missing method pattern in '{}'", body));
    }

    let return_pattern = match normalize_type(return_pattern) {
        name if name == "void" => "()".to_string(),
        name => name,
    };

    Ok(PointcutExpression::Execution {
        modifiers,
        return_pattern,
        type_pattern,
        method_pattern: method_pattern.to_string(),
        params: parse_params(params)?,
    })
}

fn parse_params(params: &str) -> Result<Vec<ParamPattern>, String> {
    if params.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(params, |c| c == ',')
        .into_iter()
        .map(|param| match param {
            "" => Err(format!("empty parameter pattern in '({})'", params)),
            "*" => Ok(ParamPattern::Any),
            ".." => Ok(ParamPattern::Rest),
            ty => Ok(ParamPattern::Type(normalize_type(ty))),
        })
        .collect()
}

/// 与末尾 ')' 配对的 '(' 的位置
fn parameter_list_start(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in body.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// 在尖括号和圆括号之外按分隔符切分，每段去掉首尾空白
fn split_top_level(source: &str, separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (offset, c) in source.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && separator(c) => {
                pieces.push(source[start..offset].trim());
                start = offset + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(source[start..].trim());
    pieces
}

/// 只在两个标识符之间保留一个空格，与 `#[aop_target]` 记录的类型名一致
fn normalize_type(raw: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '\'';
    let mut name = String::with_capacity(raw.len());
    let mut spaced = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            spaced = true;
            continue;
        }
        if spaced && is_word(c) && name.chars().last().is_some_and(is_word) {
            name.push(' ');
        }
        spaced = false;
        name.push(c);
    }
    name
}

/// 表达式求值器
///
/// 表达式语言的语法完全由实现方决定，`ExpressionPointcut` 只负责转发
pub trait ExpressionMatcher: Send + Sync {
    fn matches(
        &self,
        expression: &str,
        method: &MethodSignature,
        target_type: &TypeDescriptor,
    ) -> AopResult<bool>;
}

/// 内置表达式求值器，缓存解析结果
#[derive(Default)]
pub struct AspectExpressionMatcher {
    parsed: RwLock<HashMap<String, Arc<PointcutExpression>>>,
}

impl AspectExpressionMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, expression: &str) -> AopResult<Arc<PointcutExpression>> {
        if let Some(parsed) = self.parsed.read().get(expression) {
            return Ok(Arc::clone(parsed));
        }
        let parsed = Arc::new(PointcutExpression::parse(expression)?);
        tracing::debug!("Parsed pointcut expression '{}' as {:?}", expression, parsed);
        self.parsed
            .write()
            .insert(expression.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }
}

impl ExpressionMatcher for AspectExpressionMatcher {
    fn matches(
        &self,
        expression: &str,
        method: &MethodSignature,
        target_type: &TypeDescriptor,
    ) -> AopResult<bool> {
        Ok(self.compile(expression)?.matches(method, target_type))
    }
}

static DEFAULT_MATCHER: Lazy<Arc<AspectExpressionMatcher>> =
    Lazy::new(|| Arc::new(AspectExpressionMatcher::new()));

/// 表达式切点
///
/// 表达式在第一次匹配时才求值，语法错误以 `AopError::Match` 返回给调用方
#[derive(Clone)]
pub struct ExpressionPointcut {
    expression: String,
    matcher: Arc<dyn ExpressionMatcher>,
    class_filter: ClassFilter,
}

impl ExpressionPointcut {
    pub fn new(expression: impl Into<String>) -> Self {
        let matcher: Arc<dyn ExpressionMatcher> = DEFAULT_MATCHER.clone();
        Self::with_matcher(expression, matcher)
    }

    pub fn with_matcher(expression: impl Into<String>, matcher: Arc<dyn ExpressionMatcher>) -> Self {
        Self {
            expression: expression.into(),
            matcher,
            class_filter: ClassFilter::True,
        }
    }

    /// 表达式只决定方法，类型先经过这里的过滤
    pub fn with_class_filter(mut self, filter: ClassFilter) -> Self {
        self.class_filter = filter;
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl fmt::Debug for ExpressionPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionPointcut")
            .field("expression", &self.expression)
            .finish()
    }
}

impl MethodMatcher for ExpressionPointcut {
    fn matches(&self, method: &MethodSignature, target_type: &TypeDescriptor) -> AopResult<bool> {
        self.matcher.matches(&self.expression, method, target_type)
    }
}

impl Pointcut for ExpressionPointcut {
    fn class_filter(&self) -> &ClassFilter {
        &self.class_filter
    }

    fn name(&self) -> &str {
        &self.expression
    }
}

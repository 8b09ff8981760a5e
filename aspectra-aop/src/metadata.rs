//! 目标类型的静态元数据
//!
//! Rust 没有运行时反射，目标类型通过 `Target` trait 暴露自己的类型描述与方法分派。
//! 通常由 `#[aop_target]` 宏生成，也可以手工实现。

use crate::error::Exception;
use crate::value::Value;
use std::fmt;

/// 方法修饰符
///
/// 只有 `Overridable` 的方法能被基于子类的代理拦截
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Overridable,
    Final,
    Private,
    Static,
}

/// 方法签名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub declaring_type: &'static str,
    pub name: &'static str,
    pub arity: usize,
    /// 声明的返回值类型，`Result<T, _>` 记为 `T`；空串表示未知
    pub return_type: &'static str,
    /// 声明的参数类型；比 `arity` 短时缺少的部分视为未知
    pub param_types: &'static [&'static str],
    pub markers: &'static [&'static str],
    pub modifier: Modifier,
}

impl MethodSignature {
    pub const fn new(declaring_type: &'static str, name: &'static str) -> Self {
        Self {
            declaring_type,
            name,
            arity: 0,
            return_type: "",
            param_types: &[],
            markers: &[],
            modifier: Modifier::Overridable,
        }
    }

    pub const fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    pub const fn with_return_type(mut self, return_type: &'static str) -> Self {
        self.return_type = return_type;
        self
    }

    /// 同时把 `arity` 设为参数个数
    pub const fn with_param_types(mut self, param_types: &'static [&'static str]) -> Self {
        self.param_types = param_types;
        self.arity = param_types.len();
        self
    }

    pub const fn with_markers(mut self, markers: &'static [&'static str]) -> Self {
        self.markers = markers;
        self
    }

    pub const fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| *m == marker)
    }

    pub fn is_overridable(&self) -> bool {
        self.modifier == Modifier::Overridable
    }

    /// 形如 `World::get_message` 的完整签名
    pub fn signature(&self) -> String {
        format!("{}::{}", self.declaring_type, self.name)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// 接口（能力契约）描述
#[derive(Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: &'static str,
    pub methods: &'static [&'static str],
}

impl InterfaceDescriptor {
    pub fn declares(&self, method: &str) -> bool {
        self.methods.iter().any(|m| *m == method)
    }
}

/// 目标类型描述
#[derive(Debug)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub interfaces: &'static [&'static InterfaceDescriptor],
    pub markers: &'static [&'static str],
    /// 不可被继承的类型，不能创建基于子类的代理
    pub sealed: bool,
    pub methods: &'static [MethodSignature],
}

impl TypeDescriptor {
    pub fn method(&self, name: &str) -> Option<&'static MethodSignature> {
        let methods: &'static [MethodSignature] = self.methods;
        methods.iter().find(|m| m.name == name)
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| *m == marker)
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i.name == interface)
    }
}

/// 目标对象：承载业务逻辑，可以被代理
pub trait Target: Send + Sync + 'static {
    fn descriptor(&self) -> &'static TypeDescriptor;

    /// 以反射方式调用方法
    fn invoke(&self, method: &MethodSignature, args: &[Value]) -> Result<Value, Exception>;
}

/// 检查参数个数，供手写或宏生成的 `Target::invoke` 使用
pub fn check_arity(method: &MethodSignature, args: &[Value]) -> Result<(), Exception> {
    if args.len() == method.arity {
        Ok(())
    } else {
        Err(Exception::illegal_argument(format!(
            "{} expects {} argument(s), got {}",
            method,
            method.arity,
            args.len()
        )))
    }
}

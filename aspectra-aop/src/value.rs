//! 调用参数与返回值
//!
//! 代理以动态类型的 `Value` 在通知链中传递参数和返回值，
//! 类型化的门面（宏生成）在边界处通过 `FromValue` 转换回具体类型。

use crate::error::{ErrorKind, Exception};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 动态类型值
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// 任意类型的不透明值
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Arc::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{:?}", b),
            Value::Int(i) => write!(f, "{:?}", i),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => write!(f, "{:?}", other),
        }
    }
}

/// 不透明值按指针判等
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// 从 `Value` 提取具体类型
///
/// 类型不匹配时返回 `IllegalArgument` 异常
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, Exception>;
}

fn mismatch(expected: &str, value: &Value) -> Exception {
    Exception::new(
        ErrorKind::IllegalArgument,
        format!("expected {}, found {}", expected, value.type_name()),
    )
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, Exception> {
        Ok(value.clone())
    }
}

impl FromValue for () {
    // 无返回值的方法丢弃通知替换进来的任何结果
    fn from_value(_value: &Value) -> Result<Self, Exception> {
        Ok(())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, Exception> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, Exception> {
        value.as_i64().ok_or_else(|| mismatch("int", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, Exception> {
        let wide = value.as_i64().ok_or_else(|| mismatch("int", value))?;
        i32::try_from(wide).map_err(|_| {
            Exception::new(
                ErrorKind::IllegalArgument,
                format!("{} does not fit in i32", wide),
            )
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, Exception> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(i) => Ok(*i as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, Exception> {
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| mismatch("string", value))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, Exception> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(mismatch("list", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from("hello"), "hello");
        assert_eq!(i64::from_value(&Value::from(42)).unwrap(), 42);
        assert_eq!(String::from_value(&Value::from("x")).unwrap(), "x");
        assert!(<()>::from_value(&Value::Unit).is_ok());
        assert_eq!(
            Vec::<i64>::from_value(&Value::from(vec![1i64, 2, 3])).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_unit_discards_advised_value() {
        assert!(<()>::from_value(&Value::from("Hello, null!")).is_ok());
        assert!(<()>::from_value(&Value::Int(7)).is_ok());
        assert!(<()>::from_value(&Value::Unit).is_ok());
    }

    #[test]
    fn test_mismatch_is_illegal_argument() {
        let err = String::from_value(&Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArgument);
        assert!(err.message().contains("expected string"));

        let err = i32::from_value(&Value::Int(i64::MAX)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArgument);
    }

    #[test]
    fn test_opaque_values() {
        #[derive(Debug, PartialEq)]
        struct Order(u32);

        let value = Value::opaque(Order(7));
        assert_eq!(value.downcast_ref::<Order>(), Some(&Order(7)));
        assert!(value.downcast_ref::<String>().is_none());
        assert_eq!(value.clone(), value);
        assert_ne!(value, Value::opaque(Order(7)));
    }
}

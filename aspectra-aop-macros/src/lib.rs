//! Aspectra AOP 过程宏
//!
//! Rust 没有运行时反射，这些宏在编译期生成代理所需的元数据：
//! - `#[aop_target]` - 为固有 impl 块生成类型描述与按名称分派的 `Target` 实现
//! - `#[aop_interface]` - 为 trait 生成接口描述，并让 `Proxy` 实现该 trait
//! - `#[derive(Aspect)]` - 定义切面，配合 `#[pointcut("...")]` 自动注册

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, ItemImpl, ItemTrait};

mod aspect;
mod interface;
mod target;
mod utils;

/// `#[aop_target]` 宏
///
/// 标注在目标类型的固有 impl 块上。支持的参数：
/// - `name = "World"` - 类型名，默认取 impl 的类型名
/// - `interfaces(MessageSource, ...)` - 实现的 `#[aop_interface]` 接口
/// - `markers("Entity", ...)` - 类型上的标记
/// - `sealed` - 不可继承，不能创建基于子类的代理
/// - `facade` / `facade = "Name"` - 生成 `<Type>Proxy` 扩展 trait，供基于子类的代理类型化调用
///
/// 方法上可以使用 `#[marker("...")]` 添加标记，`#[sealed]` 标记为不可覆盖。
/// 非 `pub` 方法视为私有，没有 `self` 的函数视为静态，二者都不会被基于子类的代理拦截。
/// 泛型、异步、返回 `Self` 以及不以 `&self` 为接收者的方法不参与分派。
///
/// 使用示例：
/// ```ignore
/// use aspectra_aop_macros::aop_target;
///
/// #[derive(Default)]
/// pub struct World;
///
/// #[aop_target(interfaces(MessageSource), facade)]
/// impl World {
///     pub fn get_message(&self) -> String {
///         String::new()
///     }
///
///     #[marker("CustomAnnotation")]
///     pub fn annotated(&self) -> String {
///         "annotated".to_string()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn aop_target(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = target::TargetArgs::default();
    let parser = syn::meta::parser(|meta| args.parse_meta(meta));
    parse_macro_input!(attr with parser);
    let item = parse_macro_input!(item as ItemImpl);

    target::impl_aop_target(args, item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// `#[aop_interface]` 宏
///
/// 标注在 trait 上，生成同名的 `InterfaceDescriptor` 常量并为 `Proxy` 实现该 trait。
/// 每个方法必须以 `&self` 为接收者并返回 `Result<T, E>`，其中 `E: From<AopError>`。
///
/// 使用示例：
/// ```ignore
/// use aspectra_aop::AopError;
/// use aspectra_aop_macros::aop_interface;
///
/// #[aop_interface]
/// pub trait MessageSource {
///     fn get_message(&self) -> Result<String, AopError>;
/// }
/// ```
#[proc_macro_attribute]
pub fn aop_interface(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemTrait);

    interface::impl_aop_interface(item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// `#[derive(Aspect)]` 宏
///
/// 生成 `AspectMetadata` 实现并通过 inventory 注册切面，通知钩子通过实现 `Aspect` trait 提供。
/// 类型需要实现 `Default`。
///
/// 使用示例：
/// ```ignore
/// use aspectra_aop::prelude::*;
/// use aspectra_aop_macros::Aspect;
///
/// #[derive(Default, Aspect)]
/// #[pointcut("execution(* get_message*(..))")]
/// pub struct AnnotatedAdvice;
///
/// impl Aspect for AnnotatedAdvice {
///     fn around(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
///         Ok(Value::from(format!("Hello, {}!", invocation.proceed()?)))
///     }
/// }
/// ```
#[proc_macro_derive(Aspect, attributes(pointcut, aspect))]
pub fn derive_aspect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    aspect::impl_aspect_derive(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

//! 工具函数

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{
    FnArg, GenericArgument, Ident, LitStr, Pat, PathArguments, ReturnType, Signature, Token, Type,
};

/// 类型路径的最后一段，例如 `std::io::Result<T>` 的 `Result`
fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}

pub fn is_result(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|seg| seg.ident == "Result")
}

pub fn is_self(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|seg| seg.ident == "Self")
}

/// `Result<T, E>` 中的 `T`
pub fn result_ok_type(ty: &Type) -> Option<Type> {
    let seg = last_segment(ty)?;
    match &seg.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty.clone()),
            _ => None,
        }),
        _ => None,
    }
}

/// 代理方法的返回值类型：`Result<T, _>` 取 `T`，无返回值取 `()`
pub fn proxied_return_type(output: &ReturnType) -> Type {
    match output {
        ReturnType::Default => syn::parse_quote!(()),
        ReturnType::Type(_, ty) if is_result(ty) => {
            result_ok_type(ty).unwrap_or_else(|| syn::parse_quote!(()))
        }
        ReturnType::Type(_, ty) => (**ty).clone(),
    }
}

/// 写入方法签名的类型名，例如 `Vec<String>`、`&'a str`
///
/// 只在两个标识符之间保留一个空格，和切点表达式里类型模式的规范化一致
pub fn type_name(ty: &Type) -> String {
    let raw = quote!(#ty).to_string();
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

/// 参数从 `Value` 中提取时使用的拥有所有权的类型
///
/// `&str` 对应 `String`，`&[T]` 对应 `Vec<T>`，其余 `&T` 对应 `T`
pub fn owned_type(ty: &Type) -> Type {
    match ty {
        Type::Reference(reference) => match &*reference.elem {
            Type::Path(path) if path.path.is_ident("str") => syn::parse_quote!(::std::string::String),
            Type::Slice(slice) => {
                let elem = &slice.elem;
                syn::parse_quote!(::std::vec::Vec<#elem>)
            }
            other => other.clone(),
        },
        other => other.clone(),
    }
}

pub fn is_reference(ty: &Type) -> bool {
    matches!(ty, Type::Reference(_))
}

/// 把参数转换为 `Value` 的表达式
pub fn to_value(ident: &Ident, ty: &Type) -> TokenStream {
    if is_reference(ty) {
        quote! { ::aspectra_aop::Value::from(::std::borrow::ToOwned::to_owned(#ident)) }
    } else {
        quote! { ::aspectra_aop::Value::from(#ident) }
    }
}

/// 方法的具名参数；非标识符模式的参数使用 `__arg{i}`
pub fn typed_args(sig: &Signature) -> Vec<(Ident, Type)> {
    sig.inputs
        .iter()
        .filter_map(|input| match input {
            FnArg::Typed(pat_type) => Some(pat_type),
            FnArg::Receiver(_) => None,
        })
        .enumerate()
        .map(|(idx, pat_type)| {
            let ident = match &*pat_type.pat {
                Pat::Ident(pat_ident) => pat_ident.ident.clone(),
                _ => format_ident!("__arg{}", idx),
            };
            (ident, (*pat_type.ty).clone())
        })
        .collect()
}

/// 解析 `("A", "B")` 形式的字符串列表
pub fn parse_string_list(input: syn::parse::ParseStream) -> syn::Result<Vec<LitStr>> {
    let list = Punctuated::<LitStr, Token![,]>::parse_terminated(input)?;
    Ok(list.into_iter().collect())
}

//! Aspect 宏实现

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, LitStr, Result};

pub fn impl_aspect_derive(input: &DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "#[derive(Aspect)] does not support generic types",
        ));
    }

    let pointcut_expr = extract_pointcut_attr(input)?;
    let aspect_name = extract_name_attr(input)?.unwrap_or_else(|| name.to_string());

    let expanded = quote! {
        impl ::aspectra_aop::AspectMetadata for #name {
            fn name(&self) -> &str {
                #aspect_name
            }

            fn pointcut(&self) -> &str {
                #pointcut_expr
            }
        }

        // 链接期注册，`AspectRegistry::auto_load_aspects` 负责加载
        ::aspectra_aop::inventory::submit! {
            ::aspectra_aop::AspectRegistration::new(
                #aspect_name,
                #pointcut_expr,
                || ::std::sync::Arc::new(<#name as ::core::default::Default>::default())
                    as ::std::sync::Arc<dyn ::aspectra_aop::Aspect>
            )
        }
    };

    Ok(expanded)
}

fn extract_pointcut_attr(input: &DeriveInput) -> Result<LitStr> {
    for attr in &input.attrs {
        if attr.path().is_ident("pointcut") {
            // 解析 #[pointcut("expression")]
            return attr.parse_args();
        }
    }

    Err(Error::new_spanned(
        input,
        "#[derive(Aspect)] requires #[pointcut(\"expression\")] attribute",
    ))
}

/// 可选的 `#[aspect(name = "...")]`
fn extract_name_attr(input: &DeriveInput) -> Result<Option<String>> {
    let mut name = None;
    for attr in &input.attrs {
        if attr.path().is_ident("aspect") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported aspect property, expected name"))
                }
            })?;
        }
    }
    Ok(name)
}

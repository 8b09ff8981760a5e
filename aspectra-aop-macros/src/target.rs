//! `#[aop_target]` 宏实现
//!
//! 为固有 impl 块生成静态类型描述和按方法名分派的 `Target` 实现

use crate::utils::{
    is_reference, is_result, is_self, owned_type, parse_string_list, proxied_return_type,
    to_value, type_name, typed_args,
};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Error, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Path, Result, ReturnType, Type, Visibility};

/// `#[aop_target(...)]` 的参数
#[derive(Default)]
pub struct TargetArgs {
    name: Option<LitStr>,
    interfaces: Vec<Path>,
    markers: Vec<LitStr>,
    sealed: bool,
    facade: Option<Option<LitStr>>,
}

impl TargetArgs {
    pub fn parse_meta(&mut self, meta: syn::meta::ParseNestedMeta) -> Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("interfaces") {
            meta.parse_nested_meta(|inner| {
                self.interfaces.push(inner.path);
                Ok(())
            })?;
        } else if meta.path.is_ident("markers") {
            let content;
            syn::parenthesized!(content in meta.input);
            self.markers.extend(parse_string_list(&content)?);
        } else if meta.path.is_ident("sealed") {
            self.sealed = true;
        } else if meta.path.is_ident("facade") {
            let name = if meta.input.peek(syn::Token![=]) {
                Some(meta.value()?.parse()?)
            } else {
                None
            };
            self.facade = Some(name);
        } else {
            return Err(meta.error(
                "unsupported aop_target property, expected name, interfaces, markers, sealed or facade",
            ));
        }
        Ok(())
    }
}

enum Dispatch {
    Instance,
    Static,
}

struct MethodInfo {
    ident: Ident,
    dispatch: Dispatch,
    public: bool,
    is_final: bool,
    markers: Vec<LitStr>,
    args: Vec<(Ident, Type)>,
    output: ReturnType,
}

impl MethodInfo {
    /// 提取方法信息并移除 `#[marker]`、`#[sealed]` 辅助属性
    ///
    /// 无法按名称分派的方法（泛型、异步、返回 `Self`、非 `&self` 接收者）返回 `None`
    fn extract(method: &mut ImplItemFn) -> Result<Option<Self>> {
        let mut markers = Vec::new();
        let mut is_final = false;
        let mut error = None;
        method.attrs.retain(|attr| {
            if attr.path().is_ident("marker") {
                match attr.parse_args_with(parse_string_list) {
                    Ok(list) => markers.extend(list),
                    Err(err) => error = Some(err),
                }
                false
            } else if attr.path().is_ident("sealed") {
                is_final = true;
                false
            } else {
                true
            }
        });
        if let Some(err) = error {
            return Err(err);
        }

        let sig = &method.sig;
        let returns_self = matches!(&sig.output, ReturnType::Type(_, ty) if is_self(ty));
        if sig.asyncness.is_some() || !sig.generics.params.is_empty() || returns_self {
            return Ok(None);
        }

        let dispatch = match sig.receiver() {
            None => Dispatch::Static,
            Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {
                Dispatch::Instance
            }
            Some(_) => return Ok(None),
        };

        Ok(Some(Self {
            ident: sig.ident.clone(),
            dispatch,
            public: matches!(method.vis, Visibility::Public(_)),
            is_final,
            markers,
            args: typed_args(sig),
            output: sig.output.clone(),
        }))
    }

    fn modifier(&self) -> TokenStream {
        let modifier = match (&self.dispatch, self.public, self.is_final) {
            (Dispatch::Static, _, _) => quote!(Static),
            (Dispatch::Instance, false, _) => quote!(Private),
            (Dispatch::Instance, true, true) => quote!(Final),
            (Dispatch::Instance, true, false) => quote!(Overridable),
        };
        quote!(::aspectra_aop::Modifier::#modifier)
    }

    fn signature(&self, declaring_type: &str) -> TokenStream {
        let name = self.ident.to_string();
        let param_types = self.args.iter().map(|(_, ty)| type_name(ty));
        let return_type = type_name(&proxied_return_type(&self.output));
        let markers = &self.markers;
        let modifier = self.modifier();
        quote! {
            ::aspectra_aop::MethodSignature::new(#declaring_type, #name)
                .with_param_types(&[#(#param_types),*])
                .with_return_type(#return_type)
                .with_markers(&[#(#markers),*])
                .with_modifier(#modifier)
        }
    }

    fn dispatch_arm(&self, self_ty: &Type) -> TokenStream {
        let name = self.ident.to_string();
        let ident = &self.ident;

        let bindings: Vec<Ident> = (0..self.args.len())
            .map(|idx| format_ident!("__arg{}", idx))
            .collect();
        let extract = self.args.iter().zip(&bindings).enumerate().map(|(idx, ((_, ty), binding))| {
            let owned = owned_type(ty);
            quote! {
                let #binding: #owned = ::aspectra_aop::FromValue::from_value(&args[#idx])?;
            }
        });
        let pass = self.args.iter().zip(&bindings).map(|((_, ty), binding)| {
            if is_reference(ty) {
                quote!(&#binding)
            } else {
                quote!(#binding)
            }
        });

        let call = match self.dispatch {
            Dispatch::Instance => quote!(self.#ident(#(#pass),*)),
            Dispatch::Static => quote!(<#self_ty>::#ident(#(#pass),*)),
        };
        let convert = match &self.output {
            ReturnType::Default => quote! {
                #call;
                ::core::result::Result::Ok(::aspectra_aop::Value::Unit)
            },
            ReturnType::Type(_, ty) if is_result(ty) => quote! {
                ::core::result::Result::map(#call, ::aspectra_aop::Value::from)
                    .map_err(::core::convert::Into::into)
            },
            ReturnType::Type(_, _) => quote! {
                ::core::result::Result::Ok(::aspectra_aop::Value::from(#call))
            },
        };

        quote! {
            #name => {
                #(#extract)*
                #convert
            }
        }
    }
}

fn type_name_of(self_ty: &Type) -> Result<String> {
    match self_ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|seg| seg.ident.to_string())
            .ok_or_else(|| Error::new_spanned(self_ty, "cannot determine the target type name")),
        other => Err(Error::new_spanned(
            other,
            "#[aop_target] must be placed on an impl block of a named type",
        )),
    }
}

pub fn impl_aop_target(args: TargetArgs, mut item: ItemImpl) -> Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new_spanned(
            path,
            "#[aop_target] must be placed on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item.generics,
            "#[aop_target] does not support generic types",
        ));
    }

    let self_ty = (*item.self_ty).clone();
    let type_name = match &args.name {
        Some(name) => name.value(),
        None => type_name_of(&self_ty)?,
    };

    let mut methods = Vec::new();
    for impl_item in &mut item.items {
        if let ImplItem::Fn(method) = impl_item {
            if let Some(info) = MethodInfo::extract(method)? {
                methods.push(info);
            }
        }
    }

    let interfaces = &args.interfaces;
    let markers = &args.markers;
    let sealed = args.sealed;
    let signatures = methods.iter().map(|m| m.signature(&type_name));
    let arms = methods.iter().map(|m| m.dispatch_arm(&self_ty));
    let facade = args
        .facade
        .as_ref()
        .map(|name| impl_facade(name.as_ref(), &type_name, &methods));

    Ok(quote! {
        #item

        impl ::aspectra_aop::Target for #self_ty {
            fn descriptor(&self) -> &'static ::aspectra_aop::TypeDescriptor {
                static DESCRIPTOR: ::aspectra_aop::TypeDescriptor = ::aspectra_aop::TypeDescriptor {
                    name: #type_name,
                    interfaces: &[#(&#interfaces),*],
                    markers: &[#(#markers),*],
                    sealed: #sealed,
                    methods: &[#(#signatures),*],
                };
                &DESCRIPTOR
            }

            fn invoke(
                &self,
                method: &::aspectra_aop::MethodSignature,
                args: &[::aspectra_aop::Value],
            ) -> ::core::result::Result<::aspectra_aop::Value, ::aspectra_aop::Exception> {
                ::aspectra_aop::check_arity(method, args)?;
                match method.name {
                    #(#arms)*
                    other => ::core::result::Result::Err(::aspectra_aop::Exception::new(
                        ::aspectra_aop::ErrorKind::UnsupportedOperation,
                        ::std::format!("{} has no method {}", #type_name, other),
                    )),
                }
            }
        }

        #facade
    })
}

/// 基于子类的代理使用的类型化门面：`<Type>Proxy` 扩展 trait
fn impl_facade(name: Option<&LitStr>, type_name: &str, methods: &[MethodInfo]) -> TokenStream {
    let trait_ident = match name {
        Some(name) => format_ident!("{}", name.value()),
        None => format_ident!("{}Proxy", type_name),
    };

    let exposed: Vec<&MethodInfo> = methods
        .iter()
        .filter(|m| matches!(m.dispatch, Dispatch::Instance) && m.public)
        .collect();

    let declarations = exposed.iter().map(|m| {
        let ident = &m.ident;
        let params = m.args.iter().map(|(ident, ty)| quote!(#ident: #ty));
        let ret = proxied_return_type(&m.output);
        quote! {
            fn #ident(&self, #(#params),*) -> ::core::result::Result<#ret, ::aspectra_aop::AopError>;
        }
    });

    let implementations = exposed.iter().map(|m| {
        let ident = &m.ident;
        let method_name = ident.to_string();
        let params = m.args.iter().map(|(ident, ty)| quote!(#ident: #ty));
        let values = m.args.iter().map(|(ident, ty)| to_value(ident, ty));
        let ret = proxied_return_type(&m.output);
        quote! {
            fn #ident(&self, #(#params),*) -> ::core::result::Result<#ret, ::aspectra_aop::AopError> {
                ::aspectra_aop::Proxy::call::<#ret>(self, #method_name, ::std::vec![#(#values),*])
            }
        }
    });

    quote! {
        pub trait #trait_ident {
            #(#declarations)*
        }

        impl #trait_ident for ::aspectra_aop::Proxy {
            #(#implementations)*
        }
    }
}

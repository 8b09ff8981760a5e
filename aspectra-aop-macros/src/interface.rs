//! `#[aop_interface]` 宏实现
//!
//! 为 trait 生成同名的接口描述常量，并为 `Proxy` 实现该 trait

use crate::utils::{is_result, to_value, typed_args};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, FnArg, ItemTrait, Pat, Result, ReturnType, TraitItem};

pub fn impl_aop_interface(item: ItemTrait) -> Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item.generics,
            "#[aop_interface] does not support generic traits",
        ));
    }

    let trait_ident = &item.ident;
    let trait_name = trait_ident.to_string();
    let vis = &item.vis;

    let mut method_names = Vec::new();
    let mut implementations = Vec::new();

    for trait_item in &item.items {
        let TraitItem::Fn(method) = trait_item else {
            continue;
        };
        let sig = &method.sig;

        let takes_ref_self = sig
            .receiver()
            .is_some_and(|r| r.reference.is_some() && r.mutability.is_none());
        if !takes_ref_self {
            return Err(Error::new_spanned(
                sig,
                "methods of an #[aop_interface] trait must take &self",
            ));
        }
        if !matches!(&sig.output, ReturnType::Type(_, ty) if is_result(ty)) {
            return Err(Error::new_spanned(
                sig,
                "methods of an #[aop_interface] trait must return Result<_, E> where E: From<AopError>",
            ));
        }

        let method_name = sig.ident.to_string();
        let args = typed_args(sig);
        let values = args.iter().map(|(ident, ty)| to_value(ident, ty));

        // 参数模式统一改写为标识符，便于转换为 Value
        let mut signature = sig.clone();
        let mut idx = 0;
        for input in signature.inputs.iter_mut() {
            if let FnArg::Typed(pat_type) = input {
                let ident = &args[idx].0;
                *pat_type.pat = Pat::Verbatim(quote!(#ident));
                idx += 1;
            }
        }

        implementations.push(quote! {
            #signature {
                ::aspectra_aop::Proxy::call(self, #method_name, ::std::vec![#(#values),*])
                    .map_err(::core::convert::Into::into)
            }
        });
        method_names.push(method_name);
    }

    let descriptor_doc = format!("Interface descriptor of `{}`", trait_name);

    Ok(quote! {
        #item

        #[doc = #descriptor_doc]
        #[allow(non_upper_case_globals)]
        #vis const #trait_ident: ::aspectra_aop::InterfaceDescriptor = ::aspectra_aop::InterfaceDescriptor {
            name: #trait_name,
            methods: &[#(#method_names),*],
        };

        impl #trait_ident for ::aspectra_aop::Proxy {
            #(#implementations)*
        }
    })
}

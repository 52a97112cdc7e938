//! Procedural macros for recmold.
//!
//! `#[derive(Accessible)]` turns a plain struct into something a
//! `TypedAccessorBag` can read and write by property name. It generates the
//! accessor table once at compile time, so no runtime reflection is needed.
//!
//! These macros are used by application crates via the `recmold` facade.

use proc_macro::TokenStream;
use quote::quote;

mod parse;

use parse::{AccessibleDef, parse_accessible};

/// Derive macro for the `Accessible` trait.
///
/// Every named field becomes a property, named in lower camel case
/// (`secret_name` -> `secretName`). Field types must be `Clone`, convert
/// into `Value` and implement `FromValue`.
///
/// # Attributes
///
/// - `#[accessor(rename = "name")]` - Use a different property name
/// - `#[accessor(read_only)]` - Generate a getter only
/// - `#[accessor(skip)]` - Do not expose this field
///
/// # Example
///
/// ```ignore
/// use recmold::Accessible;
///
/// #[derive(Debug, Clone, Accessible)]
/// struct Hero {
///     #[accessor(read_only)]
///     id: i64,
///     name: String,
///     #[accessor(rename = "alias")]
///     secret_name: String,
///     #[accessor(skip)]
///     scratch: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Accessible, attributes(accessor))]
pub fn derive_accessible(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let def = match parse_accessible(&input) {
        Ok(d) => d,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_accessible_impl(&def).into()
}

fn generate_accessible_impl(def: &AccessibleDef) -> proc_macro2::TokenStream {
    let name = &def.name;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = def.generics.split_for_impl();

    let accessors = def.fields.iter().map(|field| {
        let ident = &field.ident;
        let ty = &field.ty;
        let property = &field.property;

        let getter = quote! {
            |this: &Self| {
                ::std::result::Result::Ok(::recmold_core::Value::from(
                    ::std::clone::Clone::clone(&this.#ident),
                ))
            }
        };

        if field.read_only {
            quote! {
                ::recmold_core::Accessor::read_only(#property, #getter)
            }
        } else {
            quote! {
                ::recmold_core::Accessor::read_write(
                    #property,
                    #getter,
                    |this: &mut Self, value: ::recmold_core::Value| {
                        this.#ident = <#ty as ::recmold_core::FromValue>::from_value(&value)?;
                        ::std::result::Result::Ok(())
                    },
                )
            }
        }
    });

    quote! {
        impl #impl_generics ::recmold_core::Accessible for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn accessors() -> ::std::vec::Vec<::recmold_core::Accessor<Self>> {
                ::std::vec![#(#accessors),*]
            }
        }
    }
}

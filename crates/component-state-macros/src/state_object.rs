//! Implementation of #[derive(Component)] and #[derive(Dto)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

use crate::field::StateField;

#[derive(Clone, Copy)]
pub enum DeriveTarget {
    Component,
    Dto,
}

pub fn derive_state_object_impl(input: TokenStream, target: DeriveTarget) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input, target) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput, target: DeriveTarget) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "state derives do not support generic types",
        ));
    }

    // Validate: must be a struct with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named
                .named
                .iter()
                .map(StateField::from_field)
                .collect::<syn::Result<Vec<_>>>()?,
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "state derives require named fields: struct MyComponent { text: String }",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "state derives only work on structs",
            ));
        }
    };

    let type_name = parse_type_name(&input.attrs)?.unwrap_or_else(|| name.to_string());

    let descriptors = fields.iter().map(|field| {
        let field_name = field.name();
        let policy = field.policy.tokens();
        let kind = field.kind_tokens();
        quote! {
            ::component_state::FieldDescriptor::new(#field_name, #policy, #kind)
        }
    });
    let read_arms = fields.iter().map(|field| field.read_arm(&type_name));
    let write_arms = fields.iter().map(|field| field.write_arm(&type_name));

    let marker_impl = match target {
        DeriveTarget::Component => quote! {
            impl ::component_state::Component for #name {
                fn as_any(&self) -> &dyn ::std::any::Any { self }
                fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any { self }
            }
        },
        DeriveTarget::Dto => quote! {
            impl ::component_state::Dto for #name {}
        },
    };

    Ok(quote! {
        impl ::component_state::StateObject for #name {
            fn type_name(&self) -> &'static str { #type_name }

            fn descriptors(&self) -> &'static [::component_state::FieldDescriptor] {
                <Self as ::component_state::StateObject>::field_table()
            }

            fn field_table() -> &'static [::component_state::FieldDescriptor] {
                const FIELDS: &[::component_state::FieldDescriptor] = &[#(#descriptors),*];
                FIELDS
            }

            fn read_field(
                &self,
                name: &str,
            ) -> ::component_state::Result<::component_state::FieldValue> {
                match name {
                    #(#read_arms)*
                    _ => Err(::component_state::StateError::UnknownField {
                        type_name: #type_name.to_string(),
                        field: name.to_string(),
                    }),
                }
            }

            fn write_field(
                &mut self,
                name: &str,
                value: ::component_state::FieldValue,
            ) -> ::component_state::Result<()> {
                let _ = &value;
                match name {
                    #(#write_arms)*
                    _ => Err(::component_state::StateError::UnknownField {
                        type_name: #type_name.to_string(),
                        field: name.to_string(),
                    }),
                }
            }
        }

        #marker_impl
    })
}

fn parse_type_name(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut type_name = None;

    for attr in attrs {
        if attr.path().is_ident("state") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    type_name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"`"))
                }
            })?;
        }
    }

    Ok(type_name)
}

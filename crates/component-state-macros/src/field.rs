//! Field classification for the state derives.
//!
//! The field kind is decided once, here, from the declared type and the
//! `#[state(...)]` attributes. Generated code never inspects types at runtime.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{GenericArgument, PathArguments, PathSegment, Type};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    None,
    Session,
    Client,
    Both,
}

impl Policy {
    pub fn tokens(self) -> TokenStream2 {
        match self {
            Policy::None => quote! { ::component_state::SerializeEnum::None },
            Policy::Session => quote! { ::component_state::SerializeEnum::Session },
            Policy::Client => quote! { ::component_state::SerializeEnum::Client },
            Policy::Both => quote! { ::component_state::SerializeEnum::Both },
        }
    }
}

pub enum Kind {
    Scalar,
    List,
    Row,
    Reference,
    ReferenceList,
    Any,
    Dto { inner: Type, optional: bool },
}

pub struct StateField {
    pub ident: syn::Ident,
    pub policy: Policy,
    pub kind: Kind,
}

impl StateField {
    pub fn from_field(field: &syn::Field) -> syn::Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "state fields must be named"))?;

        let mut policy: Option<Policy> = None;
        let mut dto = false;
        let mut row = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("state") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                let requested = if meta.path.is_ident("session") {
                    Some(Policy::Session)
                } else if meta.path.is_ident("client") {
                    Some(Policy::Client)
                } else if meta.path.is_ident("both") {
                    Some(Policy::Both)
                } else if meta.path.is_ident("none") {
                    Some(Policy::None)
                } else if meta.path.is_ident("dto") {
                    dto = true;
                    None
                } else if meta.path.is_ident("row") {
                    row = true;
                    None
                } else {
                    return Err(meta.error(
                        "expected one of: session, client, both, none, dto, row",
                    ));
                };

                if let Some(requested) = requested {
                    if policy.is_some_and(|current| current != requested) {
                        return Err(meta.error("conflicting serialize policies on one field"));
                    }
                    policy = Some(requested);
                }
                Ok(())
            })?;
        }

        if dto && row {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "a field can not be both `dto` and `row`",
            ));
        }

        let kind = classify(&field.ty, dto, row)?;

        Ok(Self {
            ident,
            policy: policy.unwrap_or(Policy::Both),
            kind,
        })
    }

    pub fn name(&self) -> String {
        self.ident.to_string()
    }

    pub fn kind_tokens(&self) -> TokenStream2 {
        match &self.kind {
            Kind::Scalar => quote! { ::component_state::FieldKind::Scalar },
            Kind::List => quote! { ::component_state::FieldKind::List },
            Kind::Row => quote! { ::component_state::FieldKind::Row },
            Kind::Reference => quote! { ::component_state::FieldKind::Reference },
            Kind::ReferenceList => quote! { ::component_state::FieldKind::ReferenceList },
            Kind::Any => quote! { ::component_state::FieldKind::Any },
            Kind::Dto { inner, .. } => quote! {
                ::component_state::FieldKind::Dto(
                    <#inner as ::component_state::StateObject>::field_table
                )
            },
        }
    }

    pub fn read_arm(&self, type_name: &str) -> TokenStream2 {
        let ident = &self.ident;
        let name = self.name();
        let body = match &self.kind {
            Kind::Scalar | Kind::List | Kind::Row => quote! {
                ::component_state::value::read_scalar(&self.#ident, #type_name, #name)
            },
            Kind::Reference => quote! {
                Ok(::component_state::FieldValue::Reference(self.#ident))
            },
            Kind::ReferenceList => quote! {
                Ok(::component_state::FieldValue::ReferenceList(
                    ::component_state::value::ReferenceSlots::to_slots(&self.#ident)
                ))
            },
            Kind::Any => quote! {
                Ok(::component_state::FieldValue::Any(::std::clone::Clone::clone(&self.#ident)))
            },
            Kind::Dto { optional: true, .. } => quote! {
                ::component_state::value::read_dto(self.#ident.as_ref())
            },
            Kind::Dto { optional: false, .. } => quote! {
                ::component_state::value::read_dto(Some(&self.#ident))
            },
        };
        quote! { #name => #body, }
    }

    pub fn write_arm(&self, type_name: &str) -> TokenStream2 {
        let ident = &self.ident;
        let name = self.name();
        let assign = match &self.kind {
            Kind::Scalar | Kind::List | Kind::Row => quote! {
                self.#ident = ::component_state::value::write_scalar(value, #type_name, #name)?;
            },
            Kind::Reference => quote! {
                self.#ident = ::component_state::value::write_reference(value, #type_name, #name)?;
            },
            Kind::ReferenceList => quote! {
                self.#ident = ::component_state::value::ReferenceSlots::from_slots(
                    ::component_state::value::write_reference_list(value, #type_name, #name)?
                );
            },
            Kind::Any => quote! {
                self.#ident = ::component_state::value::write_any(value, #type_name, #name)?;
            },
            Kind::Dto {
                inner,
                optional: true,
            } => quote! {
                self.#ident = ::component_state::value::write_dto::<#inner>(value, #type_name, #name)?;
            },
            Kind::Dto {
                inner,
                optional: false,
            } => quote! {
                self.#ident = ::component_state::value::write_dto::<#inner>(value, #type_name, #name)?
                    .unwrap_or_default();
            },
        };
        quote! {
            #name => {
                #assign
                Ok(())
            }
        }
    }
}

fn classify(ty: &Type, dto: bool, row: bool) -> syn::Result<Kind> {
    if dto {
        let (inner, optional) = match generic_inner(ty, "Option") {
            Some(inner) => (inner.clone(), true),
            None => (ty.clone(), false),
        };
        return Ok(Kind::Dto { inner, optional });
    }
    if row {
        return Ok(Kind::Row);
    }
    if is_plain(ty, "ComponentId") {
        return Err(syn::Error::new_spanned(
            ty,
            "reference fields must be declared as Option<ComponentId>",
        ));
    }
    if generic_inner(ty, "Option").is_some_and(|inner| is_plain(inner, "ComponentId")) {
        return Ok(Kind::Reference);
    }
    if is_reference_list(ty) {
        return Ok(Kind::ReferenceList);
    }
    if is_plain(ty, "AnyValue") {
        return Ok(Kind::Any);
    }
    let list = generic_inner(ty, "Vec").is_some()
        || generic_inner(ty, "Option").is_some_and(|inner| generic_inner(inner, "Vec").is_some());
    if list {
        return Ok(Kind::List);
    }
    Ok(Kind::Scalar)
}

fn is_reference_list(ty: &Type) -> bool {
    let element_is_reference = |element: &Type| {
        is_plain(element, "ComponentId")
            || generic_inner(element, "Option").is_some_and(|inner| is_plain(inner, "ComponentId"))
    };

    if let Some(element) = generic_inner(ty, "Vec") {
        return element_is_reference(element);
    }
    generic_inner(ty, "Option")
        .and_then(|inner| generic_inner(inner, "Vec"))
        .is_some_and(element_is_reference)
}

fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path.path.segments.last(),
        _ => None,
    }
}

fn is_plain(ty: &Type, name: &str) -> bool {
    last_segment(ty).is_some_and(|segment| segment.ident == name && segment.arguments.is_none())
}

fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let segment = last_segment(ty)?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) if args.args.len() == 1 => match args.args.first()? {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

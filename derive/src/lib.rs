//! Derive macro for `wbxml` record types.
//!
//! `#[derive(Record)]` turns a struct whose fields carry
//! `#[wbxml(tag = ...)]` annotations into a schema table plus the accessor
//! and constructor hooks the codec engines drive.
//!
//! # Example
//!
//! ```ignore
//! use wbxml::Record;
//!
//! #[derive(Debug, PartialEq, Record)]
//! pub struct Message {
//!     #[wbxml(tag = 0x45)]
//!     pub subject: String,
//!     #[wbxml(tag = 0x46)]
//!     pub read: bool,
//!     #[wbxml(tag = 0x47, stream)]
//!     pub body: Option<Vec<u8>>,
//! }
//! ```
//!
//! # Attributes
//!
//! - `#[wbxml(tag = 0x0145)]` - Required. The composite `(page << 6) | id`
//!   element tag.
//! - `#[wbxml(tag = ..., index = 2)]` - Optional position override; defaults
//!   to declaration order.
//! - `#[wbxml(tag = ..., stream)]` - Marks an `Option<S>` field as
//!   streamable rather than a nested record.

use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Field, Fields, Type, parse_macro_input};

#[proc_macro_derive(Record, attributes(wbxml))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "#[derive(Record)] does not support generic parameters",
        ));
    }

    let ident = &input.ident;
    let (fields, is_unit) = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => (named.named.iter().collect::<Vec<_>>(), false),
            Fields::Unit => (Vec::new(), true),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Record only supports named fields or unit structs",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut infos = Vec::with_capacity(fields.len());
    for (position, field) in fields.iter().enumerate() {
        infos.push(FieldInfo::parse(field, position)?);
    }

    let specs: Vec<_> = infos.iter().map(FieldInfo::spec_tokens).collect();
    let accessors: Vec<_> = infos.iter().map(FieldInfo::accessor_tokens).collect();
    let takes: Vec<_> = infos.iter().map(FieldInfo::take_tokens).collect();

    let from_slots = if is_unit {
        quote! {
            fn from_slots(
                _slots: ::std::vec::Vec<::wbxml::record::Slot>,
            ) -> ::wbxml::error::Result<Self> {
                Ok(Self)
            }
        }
    } else if infos.is_empty() {
        quote! {
            fn from_slots(
                _slots: ::std::vec::Vec<::wbxml::record::Slot>,
            ) -> ::wbxml::error::Result<Self> {
                Ok(Self {})
            }
        }
    } else {
        quote! {
            fn from_slots(
                mut slots: ::std::vec::Vec<::wbxml::record::Slot>,
            ) -> ::wbxml::error::Result<Self> {
                Ok(Self {
                    #(#takes),*
                })
            }
        }
    };

    Ok(quote! {
        impl ::wbxml::record::Record for #ident {
            fn schema() -> ::wbxml::error::Result<&'static ::wbxml::schema::Schema> {
                const FIELDS: &[::wbxml::schema::FieldSpec] = &[
                    #(#specs),*
                ];
                ::wbxml::schema::resolve::<Self>(FIELDS)
            }

            fn field(&self, index: usize) -> ::wbxml::record::FieldRef<'_> {
                match index {
                    #(#accessors)*
                    _ => ::wbxml::record::FieldRef::Absent,
                }
            }

            #from_slots
        }
    })
}

/// How a declared field type maps onto the wire.
enum Shape {
    Str,
    OptStr,
    Int,
    OptInt,
    Bool,
    Nested(Type),
    Stream(Type),
    StrList,
    IntList,
    NestedList(Type),
}

struct FieldInfo {
    ident: syn::Ident,
    name: String,
    tag: u16,
    index: usize,
    shape: Shape,
}

impl FieldInfo {
    fn parse(field: &Field, position: usize) -> syn::Result<FieldInfo> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;

        let mut tag: Option<u16> = None;
        let mut index: Option<usize> = None;
        let mut stream = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("wbxml") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("tag") {
                    let lit: syn::LitInt = meta.value()?.parse()?;
                    tag = Some(lit.base10_parse()?);
                    Ok(())
                } else if meta.path.is_ident("index") {
                    let lit: syn::LitInt = meta.value()?.parse()?;
                    index = Some(lit.base10_parse()?);
                    Ok(())
                } else if meta.path.is_ident("stream") {
                    stream = true;
                    Ok(())
                } else {
                    Err(meta.error("unknown wbxml attribute; expected `tag`, `index`, or `stream`"))
                }
            })?;
        }

        let tag = tag.ok_or_else(|| {
            syn::Error::new(
                field.span(),
                format!("field `{ident}` is missing #[wbxml(tag = ...)]"),
            )
        })?;

        let shape = classify(&field.ty, stream)?;

        Ok(FieldInfo {
            name: ident.to_string(),
            ident,
            tag,
            index: index.unwrap_or(position),
            shape,
        })
    }

    fn spec_tokens(&self) -> proc_macro2::TokenStream {
        let tag = self.tag;
        let index = self.index;
        let name = &self.name;
        let kind = match &self.shape {
            Shape::Str | Shape::OptStr => quote! { ::wbxml::schema::FieldKind::String },
            Shape::Int | Shape::OptInt => quote! { ::wbxml::schema::FieldKind::Integer },
            Shape::Bool => quote! { ::wbxml::schema::FieldKind::Boolean },
            Shape::Nested(ty) => quote! {
                ::wbxml::schema::FieldKind::Nested(::wbxml::schema::NestedVtable {
                    parse: ::wbxml::decoder::parse_nested::<#ty>,
                })
            },
            Shape::Stream(ty) => quote! {
                ::wbxml::schema::FieldKind::Stream(::wbxml::schema::StreamVtable {
                    read: ::wbxml::stream::read_stream::<#ty>,
                })
            },
            Shape::StrList => quote! { ::wbxml::schema::FieldKind::StringList },
            Shape::IntList => quote! { ::wbxml::schema::FieldKind::IntegerList },
            Shape::NestedList(ty) => quote! {
                ::wbxml::schema::FieldKind::NestedList(::wbxml::schema::NestedVtable {
                    parse: ::wbxml::decoder::parse_nested::<#ty>,
                })
            },
        };
        quote! {
            ::wbxml::schema::FieldSpec {
                tag: #tag,
                index: #index,
                name: #name,
                kind: #kind,
            }
        }
    }

    fn accessor_tokens(&self) -> proc_macro2::TokenStream {
        let index = self.index;
        let ident = &self.ident;
        match &self.shape {
            Shape::Str => quote! {
                #index => ::wbxml::record::FieldRef::Str(self.#ident.as_str()),
            },
            Shape::OptStr => quote! {
                #index => match self.#ident.as_deref() {
                    Some(value) => ::wbxml::record::FieldRef::Str(value),
                    None => ::wbxml::record::FieldRef::Absent,
                },
            },
            Shape::Int => quote! {
                #index => ::wbxml::record::FieldRef::Int(self.#ident),
            },
            Shape::OptInt => quote! {
                #index => match self.#ident {
                    Some(value) => ::wbxml::record::FieldRef::Int(value),
                    None => ::wbxml::record::FieldRef::Absent,
                },
            },
            Shape::Bool => quote! {
                #index => ::wbxml::record::FieldRef::Bool(self.#ident),
            },
            Shape::Nested(_) => quote! {
                #index => match self.#ident.as_ref() {
                    Some(value) => ::wbxml::record::FieldRef::Nested(value),
                    None => ::wbxml::record::FieldRef::Absent,
                },
            },
            Shape::Stream(_) => quote! {
                #index => match self.#ident.as_ref() {
                    Some(value) => ::wbxml::record::FieldRef::Stream(value),
                    None => ::wbxml::record::FieldRef::Absent,
                },
            },
            Shape::StrList => quote! {
                #index => ::wbxml::record::FieldRef::StrList(self.#ident.as_slice()),
            },
            Shape::IntList => quote! {
                #index => ::wbxml::record::FieldRef::IntList(self.#ident.as_slice()),
            },
            Shape::NestedList(_) => quote! {
                #index => ::wbxml::record::FieldRef::NestedList(
                    self.#ident
                        .iter()
                        .map(|item| item as &dyn ::wbxml::record::EncodeRecord)
                        .collect(),
                ),
            },
        }
    }

    fn take_tokens(&self) -> proc_macro2::TokenStream {
        let index = self.index;
        let ident = &self.ident;
        match &self.shape {
            Shape::Str => quote! {
                #ident: ::wbxml::record::take_string(&mut slots, #index)?
            },
            Shape::OptStr => quote! {
                #ident: ::wbxml::record::take_opt_string(&mut slots, #index)?
            },
            Shape::Int => quote! {
                #ident: ::wbxml::record::take_int(&mut slots, #index)?
            },
            Shape::OptInt => quote! {
                #ident: ::wbxml::record::take_opt_int(&mut slots, #index)?
            },
            Shape::Bool => quote! {
                #ident: ::wbxml::record::take_bool(&mut slots, #index)?
            },
            Shape::Nested(ty) => quote! {
                #ident: ::wbxml::record::take_nested::<#ty>(&mut slots, #index)?
            },
            Shape::Stream(ty) => quote! {
                #ident: ::wbxml::record::take_stream::<#ty>(&mut slots, #index)?
            },
            Shape::StrList => quote! {
                #ident: ::wbxml::record::take_string_list(&mut slots, #index)?
            },
            Shape::IntList => quote! {
                #ident: ::wbxml::record::take_int_list(&mut slots, #index)?
            },
            Shape::NestedList(ty) => quote! {
                #ident: ::wbxml::record::take_nested_list::<#ty>(&mut slots, #index)?
            },
        }
    }
}

fn classify(ty: &Type, stream: bool) -> syn::Result<Shape> {
    if stream {
        return match generic_arg(ty, "Option") {
            Some(inner) => Ok(Shape::Stream(inner.clone())),
            None => Err(syn::Error::new(
                ty.span(),
                "streamable fields must be declared as Option<S>",
            )),
        };
    }
    if is_path(ty, "String") {
        return Ok(Shape::Str);
    }
    if is_path(ty, "i32") {
        return Ok(Shape::Int);
    }
    if is_path(ty, "bool") {
        return Ok(Shape::Bool);
    }
    if let Some(inner) = generic_arg(ty, "Option") {
        if is_path(inner, "String") {
            return Ok(Shape::OptStr);
        }
        if is_path(inner, "i32") {
            return Ok(Shape::OptInt);
        }
        return Ok(Shape::Nested(inner.clone()));
    }
    if let Some(inner) = generic_arg(ty, "Vec") {
        if is_path(inner, "String") {
            return Ok(Shape::StrList);
        }
        if is_path(inner, "i32") {
            return Ok(Shape::IntList);
        }
        return Ok(Shape::NestedList(inner.clone()));
    }
    Err(syn::Error::new(
        ty.span(),
        "unsupported field type; expected String, i32, bool, Option<_>, or Vec<_>",
    ))
}

fn is_path(ty: &Type, name: &str) -> bool {
    matches!(
        ty,
        Type::Path(path) if path.qself.is_none()
            && path
                .path
                .segments
                .last()
                .is_some_and(|seg| seg.ident == name && seg.arguments.is_none())
    )
}

fn generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else { return None };
    let seg = path.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

//! Attribute macro that compiles a struct's wire plan at expansion time
//! (spec §5): `#[tagwire::wire(type_id = N)]` generates `GobType`,
//! `WireMarshal` and `WireUnmarshal` impls directly from the struct's field
//! list, so nothing about that type's layout needs to be rediscovered by a
//! runtime walk the way a reflection-based compiler would.
//!
//! Per-field attributes:
//! - `#[wire(id = N)]` — required on every encoded field; its wire FieldID.
//! - `#[wire(id = N, fixed)]` — use a fixed-width (non-compact) encoding for
//!   a 16/32/64-bit int/uint field instead of the VarInt default.
//! - `#[wire(id = N, any)]` — a polymorphic field; the field's Rust type
//!   must be `Option<tagwire::Any>`.
//! - `#[wire(skip)]` — excluded from the wire entirely; always decodes back
//!   to `Default::default()`.
//!
//! A field with no `#[wire(...)]` attribute at all, or one whose `id` is
//! missing or `0`, is skipped the same way: it's never written and always
//! decodes back to `Default::default()`. `0` is reserved for the struct
//! terminator, so it can't double as a real FieldID. The only attribute
//! error that's a hard compile failure is two fields claiming the same
//! nonzero id.
//!
//! Field types must implement `Default` (every Go type this was ported from
//! has an implicit zero value; Rust structs generated here need the same).

use darling::{ast::NestedMeta, FromAttributes, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, DeriveInput, Data, Fields, Meta, Token};

#[derive(Debug, FromMeta)]
struct WireArgs {
    type_id: u64,
    #[darling(default)]
    name: Option<String>,
}

#[derive(Debug, Default, FromAttributes)]
#[darling(attributes(wire))]
struct WireFieldArgs {
    #[darling(default)]
    id: Option<u64>,
    #[darling(default)]
    fixed: bool,
    #[darling(default)]
    any: bool,
    #[darling(default)]
    skip: bool,
}

enum FieldKind {
    Any,
    Fixed,
    Default,
}

struct FieldPlan<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    id: u64,
    kind: FieldKind,
}

/// Maps an integer type's last path segment to the `ops` module's
/// fixed-width helpers. `None` for any type with no fixed-width form (8-bit
/// widths only have `ops::write_byte`/`read_byte`, word-sized int/uint only
/// have the compact default).
fn fixed_ops(ty: &syn::Type) -> Option<(&'static str, &'static str, &'static str)> {
    let name = quote!(#ty).to_string();
    match name.as_str() {
        "u16" => Some(("size_fixed16", "write_fixed_u16", "read_fixed_u16")),
        "i16" => Some(("size_fixed16", "write_fixed_i16", "read_fixed_i16")),
        "u32" => Some(("size_fixed32", "write_fixed_u32", "read_fixed_u32")),
        "i32" => Some(("size_fixed32", "write_fixed_i32", "read_fixed_i32")),
        "u64" => Some(("size_fixed64", "write_fixed_u64", "read_fixed_u64")),
        "i64" => Some(("size_fixed64", "write_fixed_i64", "read_fixed_i64")),
        _ => None,
    }
}

#[proc_macro_attribute]
pub fn wire(args: TokenStream, input: TokenStream) -> TokenStream {
    let attr_args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let attr_args: Vec<NestedMeta> = attr_args.into_iter().map(NestedMeta::Meta).collect();

    let wire_args = match WireArgs::from_list(&attr_args) {
        Ok(v) => v,
        Err(e) => return TokenStream::from(e.write_errors()),
    };

    let mut item = parse_macro_input!(input as DeriveInput);
    let struct_ident = item.ident.clone();
    let type_id = wire_args.type_id;
    let type_name = wire_args.name.unwrap_or_else(|| struct_ident.to_string());

    let fields = match &mut item.data {
        Data::Struct(data) => match &mut data.fields {
            Fields::Named(named) => named,
            _ => panic!("#[wire] only supports structs with named fields"),
        },
        _ => panic!("#[wire] only supports structs"),
    };

    let mut plans: Vec<FieldPlan> = Vec::new();
    for field in fields.named.iter_mut() {
        let (wire_attrs, other_attrs): (Vec<_>, Vec<_>) = field
            .attrs
            .iter()
            .cloned()
            .partition(|attr| attr.path().is_ident("wire"));
        field.attrs = other_attrs;

        let parsed = if wire_attrs.is_empty() {
            WireFieldArgs::default()
        } else {
            match WireFieldArgs::from_attributes(&wire_attrs) {
                Ok(p) => p,
                Err(e) => return TokenStream::from(e.write_errors()),
            }
        };

        // Missing or zero FieldID skips the field the same as having no
        // `#[wire(...)]` attribute at all. Only a genuine duplicate id is a
        // hard error.
        let id = match parsed.id {
            Some(0) | None => continue,
            Some(id) => id,
        };
        if parsed.skip {
            continue;
        }

        let kind = if parsed.any {
            FieldKind::Any
        } else if parsed.fixed {
            FieldKind::Fixed
        } else {
            FieldKind::Default
        };

        plans.push(FieldPlan {
            ident: field.ident.as_ref().unwrap(),
            ty: &field.ty,
            id,
            kind,
        });
    }

    let mut seen_ids = std::collections::HashSet::new();
    for p in &plans {
        if !seen_ids.insert(p.id) {
            panic!("field id {} redefined on {}", p.id, struct_ident);
        }
        if matches!(p.kind, FieldKind::Fixed) && fixed_ops(p.ty).is_none() {
            panic!(
                "#[wire(fixed)] is only valid on u16/i16/u32/i32/u64/i64 fields, field `{}` is not",
                p.ident
            );
        }
    }

    let size_arms: Vec<TokenStream2> = plans.iter().map(field_size_arm).collect();
    let write_arms: Vec<TokenStream2> = plans.iter().map(field_write_arm).collect();
    let read_match_arms: Vec<TokenStream2> = plans.iter().map(field_read_match_arm).collect();
    let to_value_arms: Vec<TokenStream2> = plans.iter().map(field_to_value_arm).collect();
    let is_zero_terms: Vec<TokenStream2> = plans.iter().map(field_is_zero_term).collect();
    let field_idents: Vec<&syn::Ident> = fields
        .named
        .iter()
        .map(|f| f.ident.as_ref().unwrap())
        .collect();
    // Every field — including ones skipped on the wire — needs a `let mut`
    // local here, since the closing struct literal below references all of
    // them. `Option<T>::default()` doesn't require `T: Default`, so this
    // single form covers plain scalars, `Vec`/`Option<Box<_>>` fields and
    // `Option<Any>` fields alike.
    let read_locals: Vec<TokenStream2> = fields
        .named
        .iter()
        .map(|f| {
            let ident = f.ident.as_ref().unwrap();
            let ty = &f.ty;
            quote! { let mut #ident: #ty = Default::default(); }
        })
        .collect();

    let expanded = quote! {
        #item

        impl ::tagwire::marshal::GobType for #struct_ident {
            const TYPE_ID: ::tagwire::registry::TypeId = #type_id;
            const TYPE_NAME: &'static str = #type_name;
        }

        impl ::tagwire::marshal::WireMarshal for #struct_ident {
            fn wire_size(&self) -> usize {
                use ::tagwire::marshal::{IsZero, WireMarshal};
                let mut size = 1usize;
                #(#size_arms)*
                size
            }

            fn write_body(&self, w: &mut ::tagwire::cursor::Writer) {
                use ::tagwire::marshal::{IsZero, WireMarshal};
                #(#write_arms)*
                w.varuint(0);
            }
        }

        impl ::tagwire::marshal::WireUnmarshal for #struct_ident {
            fn read_body(r: &mut ::tagwire::cursor::Reader) -> ::tagwire::error::Result<Self> {
                use ::tagwire::marshal::WireUnmarshal;
                #(#read_locals)*
                loop {
                    let field_id = r.varuint()?;
                    if field_id == 0 {
                        break;
                    }
                    match field_id {
                        #(#read_match_arms)*
                        other => {
                            return Err(::tagwire::error::Error::UnknownField {
                                type_id: <#struct_ident as ::tagwire::marshal::GobType>::TYPE_ID,
                                field_id: other,
                            });
                        }
                    }
                }
                Ok(#struct_ident {
                    #(#field_idents: #field_idents,)*
                })
            }
        }

        impl ::tagwire::marshal::IsZero for #struct_ident {
            // A struct is its own field-operation kind (spec §4.4), usable
            // directly as a nested field with no pointer indirection; its
            // zero value is "every wire-bearing field is zero".
            fn is_zero(&self) -> bool {
                use ::tagwire::marshal::IsZero;
                true #(&& #is_zero_terms)*
            }
        }

        impl ::tagwire::value::ToValue for #struct_ident {
            fn to_value(&self) -> ::tagwire::value::Value {
                use ::tagwire::marshal::IsZero;
                use ::tagwire::value::ToValue;
                let mut fields = Vec::new();
                #(#to_value_arms)*
                ::tagwire::value::Value::Struct(fields)
            }
        }

        impl #struct_ident {
            /// Registers this type with the global TypeID registry, making
            /// it reachable as an `Any` payload or a dynamically-dispatched
            /// envelope (spec §5).
            pub fn register() -> ::tagwire::error::Result<()> {
                ::tagwire::registry::register::<#struct_ident>()
            }
        }
    };

    TokenStream::from(expanded)
}

fn field_size_arm(p: &FieldPlan) -> TokenStream2 {
    let ident = p.ident;
    let id = p.id;
    match p.kind {
        FieldKind::Any => quote! {
            if let Some(any) = &self.#ident {
                size += ::tagwire::varint::size_uvarint(#id) + WireMarshal::wire_size(any);
            }
        },
        FieldKind::Fixed => {
            let (size_fn, _, _) = fixed_ops(p.ty).unwrap();
            let size_fn = format_ident!("{}", size_fn);
            quote! {
                if !IsZero::is_zero(&self.#ident) {
                    size += ::tagwire::varint::size_uvarint(#id) + ::tagwire::marshal::ops::#size_fn(self.#ident as _);
                }
            }
        }
        FieldKind::Default => quote! {
            if !IsZero::is_zero(&self.#ident) {
                size += ::tagwire::varint::size_uvarint(#id) + WireMarshal::wire_size(&self.#ident);
            }
        },
    }
}

fn field_write_arm(p: &FieldPlan) -> TokenStream2 {
    let ident = p.ident;
    let id = p.id;
    match p.kind {
        FieldKind::Any => quote! {
            if let Some(any) = &self.#ident {
                w.varuint(#id);
                WireMarshal::write_body(any, w);
            }
        },
        FieldKind::Fixed => {
            let (_, write_fn, _) = fixed_ops(p.ty).unwrap();
            let write_fn = format_ident!("{}", write_fn);
            quote! {
                if !IsZero::is_zero(&self.#ident) {
                    w.varuint(#id);
                    ::tagwire::marshal::ops::#write_fn(w, self.#ident);
                }
            }
        }
        FieldKind::Default => quote! {
            if !IsZero::is_zero(&self.#ident) {
                w.varuint(#id);
                WireMarshal::write_body(&self.#ident, w);
            }
        },
    }
}

fn field_read_match_arm(p: &FieldPlan) -> TokenStream2 {
    let ident = p.ident;
    let id = p.id;
    match p.kind {
        FieldKind::Any => quote! {
            #id => { #ident = Some(::tagwire::marshal::read_any_global(r)?); }
        },
        FieldKind::Fixed => {
            let (_, _, read_fn) = fixed_ops(p.ty).unwrap();
            let read_fn = format_ident!("{}", read_fn);
            quote! {
                #id => { #ident = ::tagwire::marshal::ops::#read_fn(r)?; }
            }
        }
        FieldKind::Default => quote! {
            #id => { #ident = WireUnmarshal::read_body(r)?; }
        },
    }
}

/// `Option<Any>` has no `IsZero` impl of its own (unlike `Option<Box<T>>`,
/// which the pointer marshaller covers), so an `any` field checks `is_none`
/// directly instead of going through the trait.
fn field_is_zero_term(p: &FieldPlan) -> TokenStream2 {
    let ident = p.ident;
    match p.kind {
        FieldKind::Any => quote! { self.#ident.is_none() },
        FieldKind::Fixed | FieldKind::Default => quote! { IsZero::is_zero(&self.#ident) },
    }
}

/// Fixed vs compact representation only affects wire bytes, not the value a
/// field holds, so both kinds restate through the same `ToValue` call a
/// `Default`-kind field uses. Only an `any` field needs its own arm, since
/// it's an `Option<Any>` rather than something `IsZero` is implemented for.
fn field_to_value_arm(p: &FieldPlan) -> TokenStream2 {
    let ident = p.ident;
    let id = p.id;
    match p.kind {
        FieldKind::Any => quote! {
            if let Some(any) = &self.#ident {
                fields.push((#id, ToValue::to_value(any)));
            }
        },
        FieldKind::Fixed | FieldKind::Default => quote! {
            if !IsZero::is_zero(&self.#ident) {
                fields.push((#id, ToValue::to_value(&self.#ident)));
            }
        },
    }
}

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Token};

use crate::crate_path::keel_orm_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// `#[entity(table = "...", class = "...", comment = "...")]`.
#[derive(Default)]
struct EntityArgs {
    class: Option<String>,
    table: Option<String>,
    comment: Option<String>,
}

/// `#[field(type = "...", name = "...", length = N, primary, index = "...",
/// enum_values("a", "b"), hidden, nullable)]`.
#[derive(Default)]
struct FieldArgs {
    type_name: Option<String>,
    column: Option<String>,
    length: Option<u32>,
    primary: bool,
    index: Option<String>,
    enum_values: Vec<String>,
    hidden: bool,
    nullable: bool,
}

/// `#[relation(kind = "...", target = "...", joining_field = "...",
/// current_field = "...", inverse = "...", inverse_kind = "...")]`.
#[derive(Default)]
struct RelationArgs {
    kind: Option<LitStr>,
    target: Option<String>,
    joining_field: Option<String>,
    current_field: Option<String>,
    inverse: Option<String>,
    inverse_kind: Option<LitStr>,
}

/// `#[index(fields("a", "b"), kind = "...")]`.
struct IndexArgs {
    fields: Vec<String>,
    kind: LitStr,
}

fn string_value(meta: &ParseNestedMeta) -> syn::Result<String> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

/// Parse `name("a", "b", ...)`.
fn string_list(meta: &ParseNestedMeta) -> syn::Result<Vec<String>> {
    let content;
    syn::parenthesized!(content in meta.input);
    let items = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
    Ok(items.iter().map(LitStr::value).collect())
}

fn extract_entity_args(input: &DeriveInput) -> syn::Result<EntityArgs> {
    let mut args = EntityArgs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                args.table = Some(string_value(&meta)?);
                Ok(())
            } else if meta.path.is_ident("class") {
                args.class = Some(string_value(&meta)?);
                Ok(())
            } else if meta.path.is_ident("comment") {
                args.comment = Some(string_value(&meta)?);
                Ok(())
            } else {
                Err(meta.error("expected `table`, `class`, or `comment` in #[entity(...)]"))
            }
        })?;
    }
    Ok(args)
}

fn extract_index_args(input: &DeriveInput) -> syn::Result<Vec<IndexArgs>> {
    let mut indexes = Vec::new();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("index")) {
        let mut fields = Vec::new();
        let mut kind = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("fields") {
                fields = string_list(&meta)?;
                Ok(())
            } else if meta.path.is_ident("kind") {
                kind = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `fields` or `kind` in #[index(...)]"))
            }
        })?;
        if fields.is_empty() {
            return Err(syn::Error::new_spanned(
                attr,
                "#[index] requires at least one field: #[index(fields(\"a\", \"b\"), kind = \"unique\")]",
            ));
        }
        let kind = kind.unwrap_or_else(|| LitStr::new("index", proc_macro2::Span::call_site()));
        indexes.push(IndexArgs { fields, kind });
    }
    Ok(indexes)
}

fn extract_field_args(attrs: &[syn::Attribute]) -> syn::Result<Option<FieldArgs>> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("field")) {
        let args = found.get_or_insert_with(FieldArgs::default);
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type") {
                args.type_name = Some(string_value(&meta)?);
            } else if meta.path.is_ident("name") {
                args.column = Some(string_value(&meta)?);
            } else if meta.path.is_ident("length") {
                let lit: syn::LitInt = meta.value()?.parse()?;
                args.length = Some(lit.base10_parse()?);
            } else if meta.path.is_ident("primary") {
                args.primary = true;
            } else if meta.path.is_ident("index") {
                args.index = Some(string_value(&meta)?);
            } else if meta.path.is_ident("enum_values") {
                args.enum_values = string_list(&meta)?;
            } else if meta.path.is_ident("hidden") {
                args.hidden = true;
            } else if meta.path.is_ident("nullable") {
                args.nullable = true;
            } else {
                return Err(meta.error(
                    "expected `type`, `name`, `length`, `primary`, `index`, `enum_values`, `hidden`, or `nullable` in #[field(...)]",
                ));
            }
            Ok(())
        })?;
    }
    Ok(found)
}

fn extract_relation_args(attrs: &[syn::Attribute]) -> syn::Result<Option<(RelationArgs, &syn::Attribute)>> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("relation")) else {
        return Ok(None);
    };
    let mut args = RelationArgs::default();
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("kind") {
            args.kind = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("target") {
            args.target = Some(string_value(&meta)?);
        } else if meta.path.is_ident("joining_field") {
            args.joining_field = Some(string_value(&meta)?);
        } else if meta.path.is_ident("current_field") {
            args.current_field = Some(string_value(&meta)?);
        } else if meta.path.is_ident("inverse") {
            args.inverse = Some(string_value(&meta)?);
        } else if meta.path.is_ident("inverse_kind") {
            args.inverse_kind = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error(
                "expected `kind`, `target`, `joining_field`, `current_field`, `inverse`, or `inverse_kind` in #[relation(...)]",
            ));
        }
        Ok(())
    })?;
    Ok(Some((args, attr)))
}

/// Extract the inner type from `Option<T>`.
fn option_inner_type(ty: &syn::Type) -> Option<&syn::Type> {
    if let syn::Type::Path(syn::TypePath { path, .. }) = ty {
        if let Some(seg) = path.segments.last() {
            if seg.ident == "Option" {
                if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                    if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                        return Some(inner);
                    }
                }
            }
        }
    }
    None
}

/// Logical type name for common Rust types.
fn infer_type_name(ty: &syn::Type) -> Option<&'static str> {
    let syn::Type::Path(syn::TypePath { path, .. }) = ty else {
        return None;
    };
    let name = match path.segments.last()?.ident.to_string().as_str() {
        "i64" | "i32" | "i16" | "u32" | "u16" => "int",
        "f64" | "f32" => "float",
        "bool" => "bool",
        "String" => "string",
        "NaiveDateTime" => "datetime",
        "Uuid" => "uuid",
        "Value" => "json",
        _ => return None,
    };
    Some(name)
}

fn relation_kind(krate: &TokenStream2, lit: &LitStr) -> syn::Result<TokenStream2> {
    let normalized = lit.value().to_ascii_lowercase().replace(['-', ' '], "_");
    let variant = match normalized.as_str() {
        "has_one" => quote!(HasOne),
        "belongs_to" => quote!(BelongsTo),
        "has_many" => quote!(HasMany),
        "many_to_many" => quote!(ManyToMany),
        _ => {
            return Err(syn::Error::new_spanned(
                lit,
                "unknown relation kind; expected `has_one`, `belongs_to`, `has_many`, or `many_to_many`",
            ))
        }
    };
    Ok(quote!(#krate::RelationKind::#variant))
}

fn index_kind(krate: &TokenStream2, lit: &LitStr) -> syn::Result<TokenStream2> {
    let variant = match lit.value().to_ascii_lowercase().as_str() {
        "primary" => quote!(Primary),
        "index" => quote!(Index),
        "unique" => quote!(Unique),
        _ => {
            return Err(syn::Error::new_spanned(
                lit,
                "unknown index kind; expected `primary`, `index`, or `unique`",
            ))
        }
    };
    Ok(quote!(#krate::IndexType::#variant))
}

/// `UserProfile` -> `user_profile`.
fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, c) in ident.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn field_attribute(
    krate: &TokenStream2,
    field: &syn::Field,
    args: &FieldArgs,
) -> syn::Result<TokenStream2> {
    let inner = option_inner_type(&field.ty);
    let type_name = match &args.type_name {
        Some(name) => name.clone(),
        None if !args.enum_values.is_empty() => "enum".to_string(),
        None => infer_type_name(inner.unwrap_or(&field.ty))
            .map(str::to_string)
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    &field.ty,
                    "cannot infer the column type; add #[field(type = \"...\")]",
                )
            })?,
    };

    let mut attribute = quote!(#krate::FieldAttribute::new(#type_name));
    if let Some(column) = &args.column {
        attribute = quote!(#attribute.name(#column));
    }
    if let Some(length) = args.length {
        attribute = quote!(#attribute.length(#length));
    }
    if args.primary {
        attribute = quote!(#attribute.primary());
    }
    if let Some(index) = &args.index {
        let lit = LitStr::new(index, proc_macro2::Span::call_site());
        let kind = index_kind(krate, &lit)?;
        attribute = quote!(#attribute.index(#kind));
    }
    if !args.enum_values.is_empty() {
        let values = &args.enum_values;
        attribute = quote!(#attribute.enum_values([#(#values),*]));
    }
    if args.hidden {
        attribute = quote!(#attribute.hidden());
    }
    if args.nullable || inner.is_some() {
        attribute = quote!(#attribute.nullable());
    }
    Ok(attribute)
}

fn relation_attribute(
    krate: &TokenStream2,
    args: &RelationArgs,
    attr: &syn::Attribute,
) -> syn::Result<TokenStream2> {
    let (Some(kind), Some(target)) = (&args.kind, &args.target) else {
        return Err(syn::Error::new_spanned(
            attr,
            "#[relation] requires `kind` and `target`: #[relation(kind = \"has_many\", target = \"Post\")]",
        ));
    };
    let kind = relation_kind(krate, kind)?;
    let mut attribute = quote!(#krate::RelationAttribute::new(#kind, #target));
    if let Some(joining) = &args.joining_field {
        attribute = quote!(#attribute.joining_field(#joining));
    }
    if let Some(current) = &args.current_field {
        attribute = quote!(#attribute.current_field(#current));
    }
    match (&args.inverse, &args.inverse_kind) {
        (Some(inverse), Some(inverse_kind)) => {
            let inverse_kind = relation_kind(krate, inverse_kind)?;
            attribute = quote!(#attribute.inverse_as(#inverse, #inverse_kind));
        }
        (Some(inverse), None) => attribute = quote!(#attribute.inverse(#inverse)),
        (None, Some(inverse_kind)) => {
            return Err(syn::Error::new_spanned(inverse_kind, "`inverse_kind` requires `inverse`"))
        }
        (None, None) => {}
    }
    Ok(attribute)
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let krate = keel_orm_path();
    let entity = extract_entity_args(input)?;
    let class = entity.class.unwrap_or_else(|| name.to_string());
    let table = entity.table.unwrap_or_else(|| snake_case(&name.to_string()));

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Entity)] only works on structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "#[derive(Entity)] only works on structs")),
    };

    let mut declarations = Vec::new();
    let mut state_entries = Vec::new();
    let mut hydrations = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let property = ident.to_string();
        let field_args = extract_field_args(&field.attrs)?;
        let relation_args = extract_relation_args(&field.attrs)?;

        if let Some(args) = &field_args {
            let attribute = field_attribute(&krate, field, args)?;
            declarations.push(quote!(.field(#property, #attribute)));
            state_entries.push(quote!(.with(#property, ::core::clone::Clone::clone(&self.#ident))));
            hydrations.push(quote!(#ident: result.get_as(#property)?));
        } else {
            hydrations.push(quote!(#ident: ::core::default::Default::default()));
        }
        if let Some((args, attr)) = &relation_args {
            let attribute = relation_attribute(&krate, args, attr)?;
            declarations.push(quote!(.relation(#property, #attribute)));
        }
    }

    let comment = entity.comment.map(|c| quote!(.comment(#c)));
    let mut index_declarations = Vec::new();
    for index in extract_index_args(input)? {
        let kind = index_kind(&krate, &index.kind)?;
        let fields = &index.fields;
        index_declarations.push(quote!(.index(#krate::IndexAttribute::new([#(#fields),*], #kind))));
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics #krate::Entity for #name #ty_generics #where_clause {
            fn class_name() -> &'static str {
                #class
            }

            fn declaration() -> #krate::EntityDeclaration {
                #krate::EntityDeclaration::entity(#class, #table)
                    #comment
                    #(#declarations)*
                    #(#index_declarations)*
            }

            fn to_state(&self) -> #krate::State {
                #krate::State::new()
                    #(#state_entries)*
            }

            fn from_result(result: &#krate::ResultEntity) -> ::core::result::Result<Self, #krate::DataError> {
                ::core::result::Result::Ok(Self {
                    #(#hydrations,)*
                })
            }
        }
    })
}

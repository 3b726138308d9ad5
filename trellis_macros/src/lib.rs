//! `#[derive(Bind)]` — generates the request binder for a struct.
//!
//! Field attributes:
//!
//! - `#[bind(path | query | header | form | json)]` — value source,
//!   defaulting to `json`.
//! - `alias = "name"` — lookup key override.
//! - `default = "text"` — decoded when the key is absent; only valid on
//!   required non-json scalars.
//! - `desc = "text"` — documentation, kept in the field descriptor table.
//! - `#[bind(skip)]` — field is not bound; filled with `Default::default()`.
//! - `#[bind(flatten)]` — embedded struct bound through its own `Bind` impl.
//!
//! Invalid combinations are rejected at compile time, so a malformed
//! binding never reaches request handling.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, LitStr, Type};

#[derive(Clone, Copy, PartialEq)]
enum Src {
    Path,
    Query,
    Header,
    Form,
    Json,
}

impl Src {
    fn variant(self) -> TokenStream2 {
        match self {
            Src::Path => quote!(::trellis::bind::Source::Path),
            Src::Query => quote!(::trellis::bind::Source::Query),
            Src::Header => quote!(::trellis::bind::Source::Header),
            Src::Form => quote!(::trellis::bind::Source::Form),
            Src::Json => quote!(::trellis::bind::Source::Json),
        }
    }
}

struct FieldPlan {
    src: Src,
    alias: Option<String>,
    default: Option<String>,
    desc: Option<String>,
    skip: bool,
    flatten: bool,
}

fn parse_field_attrs(field: &Field) -> syn::Result<FieldPlan> {
    let mut plan = FieldPlan {
        src: Src::Json,
        alias: None,
        default: None,
        desc: None,
        skip: false,
        flatten: false,
    };
    let mut src_set = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let set_src = |plan: &mut FieldPlan, src_set: &mut bool, src: Src| {
                *src_set = true;
                plan.src = src;
            };
            if meta.path.is_ident("path") {
                set_src(&mut plan, &mut src_set, Src::Path);
            } else if meta.path.is_ident("query") {
                set_src(&mut plan, &mut src_set, Src::Query);
            } else if meta.path.is_ident("header") {
                set_src(&mut plan, &mut src_set, Src::Header);
            } else if meta.path.is_ident("form") {
                set_src(&mut plan, &mut src_set, Src::Form);
            } else if meta.path.is_ident("json") {
                set_src(&mut plan, &mut src_set, Src::Json);
            } else if meta.path.is_ident("skip") {
                plan.skip = true;
            } else if meta.path.is_ident("flatten") {
                plan.flatten = true;
            } else if meta.path.is_ident("alias") {
                let value: LitStr = meta.value()?.parse()?;
                plan.alias = Some(value.value());
            } else if meta.path.is_ident("default") {
                let value: LitStr = meta.value()?.parse()?;
                plan.default = Some(value.value());
            } else if meta.path.is_ident("desc") {
                let value: LitStr = meta.value()?.parse()?;
                plan.desc = Some(value.value());
            } else {
                return Err(meta.error("unsupported bind attribute"));
            }
            Ok(())
        })?;
    }

    if plan.default.is_some() && !src_set {
        return Err(syn::Error::new_spanned(
            field,
            "default requires an explicit non-json source",
        ));
    }
    Ok(plan)
}

/// `Option<T>` unwrapping by path inspection.
fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}

fn vec_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Vec")
}

fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else { return None };
    let last = path.path.segments.last()?;
    if last.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn is_uploaded_file(ty: &Type) -> bool {
    matches!(ty, Type::Path(path)
        if path.path.segments.last().is_some_and(|s| s.ident == "UploadedFile"))
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bind can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bind requires named fields",
        ));
    };

    let mut stmts = Vec::new();
    let mut idents = Vec::new();
    let mut specs = Vec::new();

    for field in &fields.named {
        let ident = field.ident.as_ref().expect("named field");
        let ty = &field.ty;
        let plan = parse_field_attrs(field)?;
        idents.push(ident.clone());

        if plan.skip {
            stmts.push(quote! {
                let #ident = ::core::default::Default::default();
            });
            continue;
        }

        if plan.flatten {
            stmts.push(quote! {
                let #ident = <#ty as ::trellis::bind::Bind>::bind(ctx)?;
            });
            continue;
        }

        let key = plan.alias.clone().unwrap_or_else(|| ident.to_string());
        let key_lit = LitStr::new(&key, ident.span());
        let option_ty = option_inner(ty);
        let is_optional = option_ty.is_some();

        if plan.default.is_some() && is_optional {
            return Err(syn::Error::new_spanned(
                field,
                "default is not honored on Option fields",
            ));
        }
        if plan.default.is_some() && plan.src == Src::Json {
            return Err(syn::Error::new_spanned(
                field,
                "default is not honored on json fields",
            ));
        }

        let source = plan.src.variant();
        let required = !is_optional && plan.default.is_none();
        let default_tokens = match &plan.default {
            Some(text) => {
                let lit = LitStr::new(text, ident.span());
                quote!(::core::option::Option::Some(#lit))
            }
            None => quote!(::core::option::Option::None),
        };
        let desc_tokens = match &plan.desc {
            Some(text) => {
                let lit = LitStr::new(text, ident.span());
                quote!(::core::option::Option::Some(#lit))
            }
            None => quote!(::core::option::Option::None),
        };
        let type_lit = LitStr::new(&ty.to_token_stream().to_string(), ident.span());
        specs.push(quote! {
            ::trellis::bind::FieldSpec {
                name: #key_lit,
                source: #source,
                required: #required,
                default: #default_tokens,
                desc: #desc_tokens,
                type_name: #type_lit,
            }
        });

        // File-typed form fields bind uploaded parts instead of text.
        if plan.src == Src::Form {
            let file_shape = if is_uploaded_file(ty) {
                Some(quote! {
                    let #ident = ::trellis::bind::required_file(ctx.form_files(#key_lit)?, #key_lit)?;
                })
            } else if vec_inner(ty).is_some_and(is_uploaded_file) {
                Some(quote! {
                    let #ident = ::trellis::bind::required_files(ctx.form_files(#key_lit)?, #key_lit)?;
                })
            } else if option_ty.is_some_and(is_uploaded_file) {
                Some(quote! {
                    let #ident = ::trellis::bind::optional_file(ctx.form_files(#key_lit)?);
                })
            } else {
                None
            };
            if let Some(stmt) = file_shape {
                stmts.push(stmt);
                continue;
            }
        }

        let stmt = match plan.src {
            Src::Json => {
                if is_optional {
                    quote! {
                        let #ident = ::trellis::bind::optional_json(
                            ctx.json_field(#key_lit)?, #key_lit)?;
                    }
                } else {
                    quote! {
                        let #ident = ::trellis::bind::required_json(
                            ctx.json_field(#key_lit)?, #key_lit)?;
                    }
                }
            }
            _ => {
                if is_optional {
                    quote! {
                        let #ident = ::trellis::bind::optional(
                            ctx.arg_value(#source, #key_lit)?, #key_lit)?;
                    }
                } else {
                    quote! {
                        let #ident = ::trellis::bind::required(
                            ctx.arg_value(#source, #key_lit)?, #default_tokens, #key_lit)?;
                    }
                }
            }
        };
        stmts.push(stmt);
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::trellis::bind::Bind for #name #ty_generics #where_clause {
            const FIELDS: &'static [::trellis::bind::FieldSpec] = &[ #(#specs),* ];

            fn bind(ctx: &mut ::trellis::Context) -> ::trellis::Result<Self> {
                #(#stmts)*
                ::core::result::Result::Ok(Self { #(#idents),* })
            }
        }
    })
}

#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

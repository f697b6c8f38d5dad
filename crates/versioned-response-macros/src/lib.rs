//! Procedural macros for versioned-response
//!
//! This crate provides the macros re-exported by `versioned-response`:
//!
//! - `#[derive(VersionedModel)]` - declare which member receives the target version
//! - `#[versioned_body(...)]` - attach a version policy to a handler function

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{parse_macro_input, Data, DeriveInput, Index, ItemFn, LitStr, Member};

/// Derive `VersionedModel` for a struct
///
/// Mark the member that receives the resolved target version with one of:
///
/// - `#[version_sink]` on a field whose type implements `SinkField`
///   (`String`, `Option<String>`, ...)
/// - `#[versioned(accessor = "method")]` on the struct, naming a
///   `fn(&mut self, &str)` method (it may also return `Result<(), E>`)
///
/// `#[versioned(flatten)]` on a field pulls in the sink of an embedded model.
/// Declaring more than one sink in total is reported at runtime as an
/// ambiguity error, every time the type is tagged.
///
/// # Example
///
/// ```rust,ignore
/// use versioned_response::prelude::*;
///
/// #[derive(Serialize, VersionedModel)]
/// struct Order {
///     id: u64,
///     #[version_sink]
///     model_version: Option<String>,
/// }
///
/// #[derive(Serialize, VersionedModel)]
/// #[versioned(accessor = "set_model_version")]
/// struct Invoice {
///     number: String,
///     #[serde(skip)]
///     target: Option<String>,
/// }
///
/// impl Invoice {
///     fn set_model_version(&mut self, version: &str) {
///         self.target = Some(version.to_owned());
///     }
/// }
/// ```
#[proc_macro_derive(VersionedModel, attributes(version_sink, versioned))]
pub fn derive_versioned_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_versioned_model(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_versioned_model(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "VersionedModel can only be derived for structs",
            ))
        }
    };

    let mut pushes = Vec::new();
    let mut flattened_types = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let (member, label) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.unraw().to_string()),
            None => (Member::Unnamed(Index::from(index)), index.to_string()),
        };

        let mut sink = false;
        let mut flatten = false;
        for attr in &field.attrs {
            if attr.path().is_ident("version_sink") {
                attr.meta.require_path_only()?;
                sink = true;
            } else if attr.path().is_ident("versioned") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("flatten") {
                        flatten = true;
                        Ok(())
                    } else if meta.path.is_ident("sink") {
                        sink = true;
                        Ok(())
                    } else {
                        Err(meta.error("unsupported field option, expected `flatten` or `sink`"))
                    }
                })?;
            }
        }

        if sink && flatten {
            return Err(syn::Error::new(
                field.span(),
                "a field cannot be both a version sink and flattened",
            ));
        }

        if sink {
            pushes.push(quote! {
                candidates.push(::versioned_response::SinkCandidate::<Self>::field(
                    #label,
                    |model| &mut model.#member,
                ));
            });
        }

        if flatten {
            let ty = &field.ty;
            flattened_types.push(ty.clone());
            pushes.push(quote! {
                candidates.extend(
                    <#ty as ::versioned_response::VersionedModel>::sink_candidates()
                        .into_iter()
                        .map(|candidate| candidate.flatten::<Self>(#label, |model| &mut model.#member)),
                );
            });
        }
    }

    for attr in &input.attrs {
        if attr.path().is_ident("versioned") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("accessor") {
                    let lit: LitStr = meta.value()?.parse()?;
                    let method: syn::Ident = lit.parse()?;
                    let label = lit.value();
                    pushes.push(quote! {
                        candidates.push(::versioned_response::SinkCandidate::<Self>::accessor(
                            #label,
                            Self::#method,
                        ));
                    });
                    Ok(())
                } else {
                    Err(meta.error("unsupported option, expected `accessor = \"method\"`"))
                }
            })?;
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let mut where_clause = where_clause.cloned();
    // Type parameters must be Send + 'static; concrete flattened types need no bound.
    if input.generics.type_params().next().is_some() {
        let clause = where_clause.get_or_insert_with(|| syn::parse_quote!(where));
        for param in input.generics.type_params() {
            let ident = &param.ident;
            clause
                .predicates
                .push(syn::parse_quote!(#ident: ::std::marker::Send + 'static));
        }
        for ty in &flattened_types {
            clause
                .predicates
                .push(syn::parse_quote!(#ty: ::versioned_response::VersionedModel));
        }
    }

    Ok(quote! {
        impl #impl_generics ::versioned_response::VersionedModel for #name #ty_generics #where_clause {
            #[allow(unused_mut)]
            fn sink_candidates() -> ::std::vec::Vec<::versioned_response::SinkCandidate<Self>> {
                let mut candidates = ::std::vec::Vec::new();
                #(#pushes)*
                candidates
            }
        }
    })
}

/// Settings collected from `#[versioned_body(...)]`
#[derive(Default)]
struct BodySettings {
    default_version: Option<LitStr>,
    query_param: Option<LitStr>,
    header: Option<LitStr>,
}

impl BodySettings {
    fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        let slot = if meta.path.is_ident("default") || meta.path.is_ident("default_version") {
            &mut self.default_version
        } else if meta.path.is_ident("query_param") || meta.path.is_ident("query_param_name") {
            &mut self.query_param
        } else if meta.path.is_ident("header") || meta.path.is_ident("header_name") {
            &mut self.header
        } else {
            return Err(meta.error(
                "unsupported option, expected `default`, `query_param` or `header`",
            ));
        };

        if slot.is_some() {
            return Err(meta.error("duplicate option"));
        }
        *slot = Some(meta.value()?.parse()?);
        Ok(())
    }
}

/// Header names are HTTP tokens
fn is_header_token(name: &str) -> bool {
    name.bytes().all(|b| {
        b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                    | b'`' | b'|' | b'~'
            )
    })
}

/// Version policy macro for handler functions
///
/// Keeps the function as written and generates a sibling
/// `<name>_version_policy()` returning its `EndpointVersionPolicy`.
///
/// Options:
///
/// - `default` (required, non-empty): fallback version
/// - `query_param`: query parameter consulted first
/// - `header`: header consulted second
///
/// The long names `default_version`, `query_param_name` and `header_name`
/// are accepted too.
///
/// # Example
///
/// ```rust,ignore
/// #[versioned_body(default = "3", query_param = "v", header = "Model-Version")]
/// async fn get_order(id: u64) -> Order {
///     Order::load(id).await
/// }
///
/// endpoints.register(Method::GET, "/orders/{id}", get_order_version_policy())?;
/// ```
#[proc_macro_attribute]
pub fn versioned_body(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut settings = BodySettings::default();
    let parser = syn::meta::parser(|meta| settings.parse(meta));
    parse_macro_input!(attr with parser);
    let input = parse_macro_input!(item as ItemFn);

    expand_versioned_body(settings, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_versioned_body(settings: BodySettings, input: ItemFn) -> syn::Result<TokenStream2> {
    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;

    let default_version = settings.default_version.ok_or_else(|| {
        syn::Error::new(
            fn_name.span(),
            "#[versioned_body] requires `default = \"...\"`",
        )
    })?;
    if default_version.value().is_empty() {
        return Err(syn::Error::new(
            default_version.span(),
            "the default version must not be empty",
        ));
    }

    let query_param = settings
        .query_param
        .map(|lit| lit.value())
        .unwrap_or_default();

    let header = match settings.header {
        Some(lit) if !is_header_token(&lit.value()) => {
            return Err(syn::Error::new(
                lit.span(),
                format!("`{}` is not a valid header name", lit.value()),
            ));
        }
        Some(lit) => lit.value(),
        None => String::new(),
    };

    let policy_fn = format_ident!("{}_version_policy", fn_name);
    let doc = format!("Version policy of [`{}`].", fn_name);

    Ok(quote! {
        #input

        #[doc = #doc]
        #fn_vis fn #policy_fn() -> ::versioned_response::EndpointVersionPolicy {
            ::versioned_response::EndpointVersionPolicy::from_static(
                #default_version,
                #query_param,
                #header,
            )
        }
    })
}

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    punctuated::{Pair, Punctuated},
    token::Comma,
    FnArg, Ident, Pat,
};

/// Attribute macro turning an `async fn` into an activity constructor
///
/// The annotated function keeps its name and arguments but returns an
/// unticked frame instead of a future; arguments are captured by the
/// body factory, so each run of the activity starts from the same
/// values.
///
/// # Example
/// ```ignore
/// #[activity]
/// async fn blink(led: &Cell<bool>) {
///     loop {
///         led.set(true);
///         pause().await;
///         led.set(false);
///         pause().await;
///     }
/// }
///
/// let mut blink = pin!(blink(&led));
/// blink.as_mut().tick();
/// ```
#[proc_macro_attribute]
pub fn activity(args: TokenStream, item: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[activity] takes no arguments",
        )
        .to_compile_error()
        .into();
    }

    let mut body_fn = syn::parse_macro_input!(item as syn::ItemFn);

    if body_fn.sig.asyncness.is_none() {
        return syn::Error::new_spanned(&body_fn.sig, "activity functions must be async")
            .to_compile_error()
            .into();
    }

    let name = body_fn.sig.ident.clone();
    let args = body_fn.sig.inputs.clone();
    let generics = body_fn.sig.generics.clone();
    let where_clause = generics.where_clause.clone();

    let arg_values: Punctuated<Ident, Comma> = args
        .pairs()
        .filter_map(|pair| {
            let (arg, punct) = pair.into_tuple();

            if let FnArg::Typed(pat_type) = arg {
                if let Pat::Ident(pat_ident) = &*pat_type.pat {
                    Some(Pair::new(pat_ident.ident.clone(), punct.copied()))
                } else {
                    None
                }
            } else {
                None
            }
        })
        .collect();

    let visibility = body_fn.vis.clone();
    let attrs = body_fn.attrs.clone();
    body_fn.attrs = Vec::new();
    body_fn.vis = syn::Visibility::Inherited;
    body_fn.sig.ident = Ident::new("body", body_fn.sig.ident.span());

    let result = quote! {
        #(#attrs)*
        #visibility fn #name #generics (#args) -> impl ::tickloop::Frame #where_clause {
            #body_fn

            ::tickloop::activity::activity(move || body(#arg_values))
        }
    };
    result.into()
}

use quote::quote;

/// Implements `actlet::Message` and either `actlet::Action` or `actlet::Signal`.
///
/// A message with `#[reply(T)]` becomes an action replying `T`.  The type can
/// also be written as a string literal: `#[reply("T")]`.  A message without
/// the attribute becomes a signal.
#[proc_macro_derive(Message, attributes(reply))]
pub fn message_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let ty_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let reply = input
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("reply"))
        .map(parse_reply_type);

    let (reply_type, message_trait) = match reply {
        Some(Ok(Some(ty))) => (quote!(#ty), quote!(actlet::Action)),
        Some(Ok(None)) => (quote!(()), quote!(actlet::Action)),
        Some(Err(err)) => return err.to_compile_error().into(),
        None => (quote!(()), quote!(actlet::Signal)),
    };

    let expanded = quote! {
        impl #impl_generics actlet::Message for #ty_name #ty_generics #where_clause {
            type Reply = #reply_type;
        }

        impl #impl_generics #message_trait for #ty_name #ty_generics #where_clause {}
    };

    expanded.into()
}

fn parse_reply_type(attr: &syn::Attribute) -> syn::Result<Option<syn::Type>> {
    let tokens = match &attr.meta {
        syn::Meta::List(list) => list.tokens.clone(),
        // `#[reply]`
        _ => return Ok(None),
    };
    if tokens.is_empty() {
        return Ok(None);
    }
    match syn::parse2::<syn::LitStr>(tokens.clone()) {
        Ok(lit) => lit.parse::<syn::Type>().map(Some),
        Err(_) => syn::parse2::<syn::Type>(tokens).map(Some),
    }
}

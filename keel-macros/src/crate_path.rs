//! Crate path resolution for generated code.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

/// Returns the token stream for accessing `keel_orm` types.
///
/// `keel-orm` declares `extern crate self as keel_orm`, so the absolute path
/// also resolves inside the crate itself and its tests.
pub fn keel_orm_path() -> TokenStream {
    match crate_name("keel-orm") {
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        // Fallback - assume keel_orm is available (for error messages)
        Ok(FoundCrate::Itself) | Err(_) => quote!(::keel_orm),
    }
}

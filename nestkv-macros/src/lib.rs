use nestkv_types::{KeyPath, Segment};
use proc_macro::TokenStream;
use proc_macro_error::{abort, proc_macro_error};
use quote::quote;
use syn::{parse_macro_input, LitStr};

/// Macro to provide a safe way to create a [`&Segment`] at compile-time.
///
/// [`&Segment`]: ../nestkv/struct.Segment.html
#[proc_macro]
#[proc_macro_error]
pub fn segment(input: TokenStream) -> TokenStream {
    let s = parse_macro_input!(input as LitStr);

    match Segment::parse(&s.value()) {
        Ok(_) => quote!(unsafe { Segment::from_str_unchecked(#s) }).into(),
        Err(error) => abort!(s.span(), "{}", error),
    }
}

/// Macro to provide a safe way to create a [`&KeyPath`] at compile-time.
///
/// [`&KeyPath`]: ../nestkv/struct.KeyPath.html
#[proc_macro]
#[proc_macro_error]
pub fn path(input: TokenStream) -> TokenStream {
    let s = parse_macro_input!(input as LitStr);

    match KeyPath::parse(&s.value()) {
        Ok(_) => quote!(unsafe { KeyPath::from_str_unchecked(#s) }).into(),
        Err(error) => abort!(s.span(), "{}", error),
    }
}

use proc_macro::TokenStream;
use std::env::var_os;
use syn::{parse_macro_input, DeriveInput};

mod injectable;

/// Derives `servicewire::Injectable` from `#[inject = "name[,nullable]"]` field markers.
///
/// Marked fields must be `Injected<T>` slots. Unmarked fields are left alone.
/// Set `MACROS_DEBUG` to print the generated impl.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let ident = input.ident.clone();

    match injectable::expand(input) {
        Ok(tokens) => {
            if var_os("MACROS_DEBUG").is_some() {
                eprintln!("derive(Injectable) for {ident}: {tokens}");
            }
            tokens.into()
        }
        Err(err) => err.into_compile_error().into(),
    }
}

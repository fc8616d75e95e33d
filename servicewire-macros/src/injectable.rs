mod attr;

use crate::injectable::attr::parse_field_attrs;

use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};
use syn::{spanned::Spanned as _, Data, DeriveInput, Error, Fields, GenericArgument, PathArguments, Type};

/// Checks the field is an `Injected<T>` slot, by its last path segment.
fn is_injected_slot(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    type_path.qself.is_none()
        && type_path.path.segments.last().is_some_and(|segment| {
            segment.ident == "Injected"
                && matches!(
                    &segment.arguments,
                    PathArguments::AngleBracketed(args)
                        if args.args.len() == 1 && matches!(args.args.first(), Some(GenericArgument::Type(_)))
                )
        })
}

pub(crate) fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => return Ok(expand_impl(&input, &[])),
            Fields::Unnamed(_) => {
                return Err(Error::new_spanned(
                    &data.fields,
                    "`Injectable` can only be derived for structs with named fields",
                ))
            }
        },
        Data::Enum(data) => return Err(Error::new_spanned(data.enum_token, "`Injectable` can't be derived for enums")),
        Data::Union(data) => return Err(Error::new_spanned(data.union_token, "`Injectable` can't be derived for unions")),
    };

    let mut bindings = Vec::new();
    for field in fields {
        let Some(args) = parse_field_attrs(&field.attrs) else {
            continue;
        };
        let args = args?;

        let Some(field_ident) = &field.ident else {
            continue;
        };
        if !is_injected_slot(&field.ty) {
            return Err(Error::new_spanned(
                &field.ty,
                format!("field `{field_ident}` of `{ident}` marked with `inject` must be an `Injected<T>` slot"),
            ));
        }

        let field_name = field_ident.to_string();
        let marker = &args.marker;
        bindings.push(quote_spanned! { field.span() =>
            .field(#field_name, #marker, |target: &Self| &target.#field_ident)
        });
    }

    Ok(expand_impl(&input, &bindings))
}

fn expand_impl(input: &DeriveInput, bindings: &[TokenStream]) -> TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::servicewire::Injectable for #ident #ty_generics #where_clause {
            fn bindings() -> ::servicewire::Bindings<Self> {
                ::servicewire::Bindings::new()
                    #( #bindings )*
            }
        }
    }
}

use syn::{Attribute, Error, Expr, ExprLit, Lit, LitStr};

const ATTR: &str = "inject";
const NULLABLE: &str = "nullable";

pub(super) struct InjectArgs {
    pub(super) marker: LitStr,
}

/// Validates a marker the same way the runtime parses it, so a bad marker fails the build.
fn check_marker(marker: &LitStr) -> syn::Result<()> {
    let value = marker.value();
    let mut parts = value.split(',').map(str::trim);

    if parts.next().unwrap_or_default().is_empty() {
        return Err(Error::new_spanned(marker, "injection marker must start with a lookup name"));
    }
    for modifier in parts {
        if modifier != NULLABLE {
            return Err(Error::new_spanned(
                marker,
                format!("unknown injection modifier `{modifier}`, expected `{NULLABLE}`"),
            ));
        }
    }
    Ok(())
}

fn parse_attr(attr: &Attribute) -> syn::Result<InjectArgs> {
    let name_value = attr.meta.require_name_value()?;
    let marker = match &name_value.value {
        Expr::Lit(ExprLit { lit: Lit::Str(marker), .. }) => marker.clone(),
        value => return Err(Error::new_spanned(value, "expected `inject = \"name[,nullable]\"`")),
    };
    check_marker(&marker)?;

    Ok(InjectArgs { marker })
}

pub(super) fn parse_field_attrs(attrs: &[Attribute]) -> Option<syn::Result<InjectArgs>> {
    let mut iter = attrs.iter().filter(|attr| attr.path().is_ident(ATTR));

    let first = iter.next()?;
    if let Some(duplicate) = iter.next() {
        return Some(Err(Error::new_spanned(duplicate, "`inject` specified more than once")));
    }

    Some(parse_attr(first))
}

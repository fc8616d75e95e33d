use tracing::{debug, error};

use crate::{
    any::TypeInfo,
    errors::InjectErrorKind,
    inject::{Injected, InjectionTag},
    resolver::Resolver,
};

/// Struct with fields filled from a [`Resolver`].
///
/// Usually derived with `#[derive(Injectable)]` and `#[inject = "name"]` field markers,
/// but the binding list can be written by hand too.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn bindings() -> Bindings<Self>;
}

type BindFn<S> = Box<dyn Fn(&S, &Resolver, &str) -> bool + Send + Sync>;

pub struct FieldBinding<S> {
    pub field: &'static str,
    pub tag: InjectionTag,
    pub type_info: TypeInfo,
    bind: BindFn<S>,
}

/// Declarative binding list of a struct, in field declaration order.
pub struct Bindings<S> {
    fields: Vec<FieldBinding<S>>,
}

impl<S> Default for Bindings<S> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<S: 'static> Bindings<S> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field bound by the injection marker `marker`.
    ///
    /// # Panics
    /// Panics if `marker` isn't a valid injection marker.
    #[must_use]
    pub fn field<T>(self, field: &'static str, marker: &str, select: fn(&S) -> &Injected<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match InjectionTag::parse(marker) {
            Ok(tag) => self.tagged(field, tag, select),
            Err(err) => panic!("Invalid injection marker on field `{field}`: {err}"),
        }
    }

    #[must_use]
    pub fn tagged<T>(mut self, field: &'static str, tag: InjectionTag, select: fn(&S) -> &Injected<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.fields.push(FieldBinding {
            field,
            tag,
            type_info: TypeInfo::of::<T>(),
            bind: Box::new(move |target, resolver, name| {
                let Some(instance) = resolver.get::<T>(name) else {
                    return false;
                };
                if select(target).bind(instance).is_err() {
                    debug!(field, name, "Field already bound, keeping it");
                }
                true
            }),
        });
        self
    }

    #[inline]
    pub fn fields(&self) -> impl Iterator<Item = &FieldBinding<S>> {
        self.fields.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Binds every field of `target` in order, stopping at the first non-nullable miss.
    ///
    /// # Errors
    /// Returns [`InjectErrorKind::NotFound`] for a non-nullable field without a registered instance.
    pub fn apply(&self, target: &S, resolver: &Resolver) -> Result<(), InjectErrorKind> {
        for FieldBinding {
            field,
            tag,
            type_info,
            bind,
        } in &self.fields
        {
            if bind(target, resolver, &tag.name) {
                debug!(field, name = %tag.name, "Injected");
                continue;
            }
            if tag.nullable {
                debug!(field, name = %tag.name, "Nullable field left unbound");
                continue;
            }

            let err = InjectErrorKind::NotFound {
                field: *field,
                name: tag.name.clone(),
                type_name: type_info.name,
            };
            error!("{}", err);
            return Err(err);
        }
        Ok(())
    }
}

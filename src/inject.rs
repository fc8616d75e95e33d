use std::{
    fmt::{self, Debug, Formatter},
    ops::Deref,
    sync::{Arc, OnceLock},
};

use crate::errors::TagErrorKind;

const NULLABLE: &str = "nullable";

/// Parsed injection marker: `name[,modifier]*`.
///
/// The only modifier is `nullable`, which lets a missing instance leave the field unbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionTag {
    pub name: String,
    pub nullable: bool,
}

impl InjectionTag {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// # Errors
    /// - Returns [`TagErrorKind::EmptyName`] if the lookup name is blank
    /// - Returns [`TagErrorKind::UnknownModifier`] for any modifier except `nullable`
    pub fn parse(marker: &str) -> Result<Self, TagErrorKind> {
        let mut parts = marker.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(TagErrorKind::EmptyName {
                marker: marker.to_owned(),
            });
        }

        let mut tag = Self::new(name);
        for modifier in parts {
            match modifier {
                NULLABLE => tag.nullable = true,
                _ => {
                    return Err(TagErrorKind::UnknownModifier {
                        marker: marker.to_owned(),
                        modifier: modifier.to_owned(),
                    })
                }
            }
        }

        Ok(tag)
    }
}

/// Injection slot of a struct field.
///
/// The slot is written at most once, when the owning struct is bound.
/// Until then, and after a nullable miss, it stays empty.
pub struct Injected<T: ?Sized>(OnceLock<Arc<T>>);

impl<T: ?Sized> Injected<T> {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&Arc<T>> {
        self.0.get()
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.0.get().is_some()
    }

    /// Binds the slot. If the slot is already bound it keeps its identity
    /// and `instance` is handed back.
    #[inline]
    pub(crate) fn bind(&self, instance: Arc<T>) -> Result<(), Arc<T>> {
        self.0.set(instance)
    }
}

impl<T: ?Sized> Default for Injected<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Deref for Injected<T> {
    type Target = T;

    /// # Panics
    /// Panics if the slot is read before its struct was bound,
    /// or after a nullable binding missed. Use [`Injected::get`] for nullable fields.
    fn deref(&self) -> &Self::Target {
        match self.0.get() {
            Some(instance) => &**instance,
            None => panic!("injected field of type {} read before it was bound", core::any::type_name::<T>()),
        }
    }
}

impl<T: ?Sized> Debug for Injected<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("type_name", &core::any::type_name::<T>())
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{InjectionTag, Injected};
    use crate::errors::TagErrorKind;

    use std::sync::Arc;

    #[test]
    fn test_parse_name() {
        assert_eq!(InjectionTag::parse("cache").unwrap(), InjectionTag::new("cache"));
        assert_eq!(InjectionTag::parse(" cache ").unwrap(), InjectionTag::new("cache"));
    }

    #[test]
    fn test_parse_nullable() {
        let tag = InjectionTag::parse("cache,nullable").unwrap();
        assert_eq!(tag.name, "cache");
        assert!(tag.nullable);

        assert!(InjectionTag::parse("cache, nullable").unwrap().nullable);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(InjectionTag::parse(""), Err(TagErrorKind::EmptyName { .. })));
        assert!(matches!(InjectionTag::parse(",nullable"), Err(TagErrorKind::EmptyName { .. })));
        assert_eq!(
            InjectionTag::parse("cache,optional"),
            Err(TagErrorKind::UnknownModifier {
                marker: "cache,optional".to_owned(),
                modifier: "optional".to_owned(),
            })
        );
    }

    #[test]
    fn test_slot_is_write_once() {
        let slot = Injected::<u8>::new();
        assert!(!slot.is_bound());

        let first = Arc::new(1);
        slot.bind(first.clone()).unwrap();
        assert!(slot.bind(Arc::new(2)).is_err());

        assert!(Arc::ptr_eq(slot.get().unwrap(), &first));
        assert_eq!(*slot, 1);
    }

    #[test]
    #[should_panic(expected = "read before it was bound")]
    fn test_unbound_deref_panics() {
        let slot = Injected::<u8>::new();
        let _value: u8 = *slot;
    }
}

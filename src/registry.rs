use std::{
    any::Any,
    collections::{btree_map::Entry, BTreeMap},
    sync::Arc,
};

use crate::{any::TypeInfo, errors::RegistryErrorKind};

type BoxedInstance = Box<dyn Any + Send + Sync>;

/// Name-keyed store of instances sharing one type token.
///
/// Every entry is stored as the `Arc<T>` handed in at registration,
/// so lookups return the registered identity and never a copy of the value.
pub struct TypeRegistry {
    type_info: TypeInfo,
    instances: BTreeMap<String, BoxedInstance>,
}

impl TypeRegistry {
    #[inline]
    #[must_use]
    pub fn new(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            instances: BTreeMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// Stores `instance` under `name`.
    ///
    /// # Errors
    /// Returns [`RegistryErrorKind::Duplicate`] if the name is already taken.
    /// The stored instance is left as is.
    ///
    /// # Panics
    /// Panics if `T` isn't the type this registry was created for.
    pub fn register<T>(&mut self, name: impl Into<String>, instance: Arc<T>) -> Result<(), RegistryErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        assert!(
            TypeInfo::of::<T>() == self.type_info,
            "registry of {} can't store {}",
            self.type_info,
            TypeInfo::of::<T>(),
        );

        match self.instances.entry(name.into()) {
            Entry::Vacant(entry) => {
                entry.insert(Box::new(instance));
                Ok(())
            }
            Entry::Occupied(entry) => Err(RegistryErrorKind::Duplicate {
                type_name: self.type_info.name,
                name: entry.key().clone(),
            }),
        }
    }

    #[must_use]
    pub fn lookup<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances
            .get(name)
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Returns every stored instance. Callers must not rely on the order.
    #[must_use]
    pub fn enumerate<T>(&self) -> Vec<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances
            .values()
            .filter_map(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::TypeRegistry;
    use crate::errors::RegistryErrorKind;

    use std::sync::Arc;

    struct Connection(u8);

    #[test]
    fn test_lookup_returns_registered_identity() {
        let mut registry = TypeRegistry::of::<Connection>();
        let conn = Arc::new(Connection(1));

        registry.register("primary", conn.clone()).unwrap();

        let found = registry.lookup::<Connection>("primary").unwrap();
        assert!(Arc::ptr_eq(&conn, &found));
        assert!(registry.lookup::<Connection>("replica").is_none());
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut registry = TypeRegistry::of::<Connection>();
        let first = Arc::new(Connection(1));

        registry.register("primary", first.clone()).unwrap();
        let err = registry.register("primary", Arc::new(Connection(2))).unwrap_err();

        assert_eq!(
            err,
            RegistryErrorKind::Duplicate {
                type_name: core::any::type_name::<Connection>(),
                name: "primary".to_owned(),
            }
        );
        assert_eq!(registry.lookup::<Connection>("primary").unwrap().0, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_enumerate() {
        let mut registry = TypeRegistry::of::<Connection>();
        for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
            registry.register(name, Arc::new(Connection(i as u8))).unwrap();
        }

        let mut values = registry.enumerate::<Connection>().iter().map(|conn| conn.0).collect::<Vec<_>>();
        values.sort_unstable();

        assert_eq!(values, [0, 1, 2]);
    }

    #[test]
    #[should_panic(expected = "can't store")]
    fn test_foreign_type_rejected() {
        let mut registry = TypeRegistry::of::<Connection>();
        let _ = registry.register("primary", Arc::new(0u8));
    }
}

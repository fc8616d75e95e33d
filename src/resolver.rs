use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::{
    any::TypeInfo,
    binder::Injectable,
    errors::InjectErrorKind,
    registry::TypeRegistry,
};

/// Type-indexed instance resolver.
///
/// Instances are registered under a type token and a name. The token is the concrete type `T`,
/// or an interface `dyn I` when the instance is registered through a trait object handle.
/// Interface lookups only see instances explicitly registered as that interface,
/// so resolution never depends on the iteration order of known types.
///
/// The per-type map only grows: registries are never removed.
#[derive(Default)]
pub struct Resolver {
    registries: RwLock<BTreeMap<TypeInfo, TypeRegistry>>,
}

impl Resolver {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `instance` under `name` for the type token `T`.
    ///
    /// # Panics
    /// Panics if an instance of `T` is already registered under `name`.
    /// Duplicate registration is a programming error.
    pub fn register<T>(&self, name: impl Into<String>, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let name = name.into();
        let type_info = TypeInfo::of::<T>();

        debug!(name = %name, type_name = type_info.name, interface = type_info.is_interface(), "Register instance");

        let mut guard = self.registries.write();
        let registry = guard.entry(type_info).or_insert_with(|| TypeRegistry::new(type_info));
        if let Err(err) = registry.register(name, instance) {
            drop(guard);
            error!("{}", err);
            panic!("{err}");
        }
    }

    /// Gets the instance of `T` registered under `name`.
    #[must_use]
    pub fn get<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let found = self
            .registries
            .read()
            .get(&TypeInfo::of::<T>())
            .and_then(|registry| registry.lookup::<T>(name));

        if found.is_none() {
            debug!(name, type_name = TypeInfo::of::<T>().name, "Instance not found");
        }
        found
    }

    /// Writes the instance of `T` registered under `name` into `target`.
    /// Returns `false` and leaves `target` untouched if there is no such instance.
    pub fn get_into<T>(&self, name: &str, target: &mut Option<Arc<T>>) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.get::<T>(name) {
            Some(instance) => {
                *target = Some(instance);
                true
            }
            None => false,
        }
    }

    /// Collects every instance registered for the type token `T`.
    /// Callers must not rely on the order.
    #[must_use]
    pub fn find<T>(&self) -> Vec<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.registries
            .read()
            .get(&TypeInfo::of::<T>())
            .map(TypeRegistry::enumerate::<T>)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains<T>(&self, name: &str) -> bool
    where
        T: ?Sized + 'static,
    {
        self.registries
            .read()
            .get(&TypeInfo::of::<T>())
            .is_some_and(|registry| registry.contains(name))
    }

    /// Type tokens with at least one registry, for diagnostics.
    #[must_use]
    pub fn type_infos(&self) -> Vec<TypeInfo> {
        self.registries.read().keys().copied().collect()
    }

    /// Fills the marked fields of `target` from this resolver.
    ///
    /// # Errors
    /// Returns [`InjectErrorKind::NotFound`] for the first non-nullable field without a registered instance.
    /// Fields after it are left unbound.
    pub fn inject<S: Injectable>(&self, target: &S) -> Result<(), InjectErrorKind> {
        S::bindings().apply(target, self)
    }
}

#[cfg(test)]
mod tests {
    use super::Resolver;
    use crate::{
        binder::{Bindings, Injectable},
        errors::InjectErrorKind,
        inject::Injected,
    };

    use std::{ptr, sync::Arc};
    use tracing_test::traced_test;

    trait Hello: Send + Sync {
        fn say_hello(&self) -> u8;
    }

    struct A(u8);

    impl Hello for A {
        fn say_hello(&self) -> u8 {
            self.0
        }
    }

    struct B;

    impl Hello for B {
        fn say_hello(&self) -> u8 {
            0
        }
    }

    #[derive(Default)]
    struct Consumer {
        a1: Injected<A>,
        a2: Injected<A>,
        hello: Injected<dyn Hello>,
    }

    impl Injectable for Consumer {
        fn bindings() -> Bindings<Self> {
            Bindings::new()
                .field("a1", "a1", |consumer: &Self| &consumer.a1)
                .field("a2", "a2", |consumer: &Self| &consumer.a2)
                .field("hello", "b, nullable", |consumer: &Self| &consumer.hello)
        }
    }

    #[test]
    #[traced_test]
    fn test_get_returns_identity() {
        let resolver = Resolver::new();
        let a1 = Arc::new(A(1));
        let a2 = Arc::new(A(2));

        resolver.register("a1", a1.clone());
        resolver.register("a2", a2.clone());

        assert!(Arc::ptr_eq(&resolver.get::<A>("a1").unwrap(), &a1));
        assert!(Arc::ptr_eq(&resolver.get::<A>("a2").unwrap(), &a2));
        assert!(resolver.get::<A>("a3").is_none());
        assert!(resolver.get::<B>("a1").is_none());
    }

    #[test]
    #[traced_test]
    fn test_get_into_leaves_target_on_miss() {
        let resolver = Resolver::new();
        let a1 = Arc::new(A(1));
        resolver.register("a1", a1.clone());

        let mut target = None;
        assert!(!resolver.get_into::<A>("test", &mut target));
        assert!(target.is_none());

        assert!(resolver.get_into::<A>("a1", &mut target));
        assert!(Arc::ptr_eq(target.as_ref().unwrap(), &a1));

        assert!(!resolver.get_into::<A>("test", &mut target));
        assert!(Arc::ptr_eq(target.as_ref().unwrap(), &a1));
    }

    #[test]
    #[traced_test]
    #[should_panic(expected = "Duplicate registration of `a1`")]
    fn test_duplicate_registration_panics() {
        let resolver = Resolver::new();
        resolver.register("a1", Arc::new(A(1)));
        resolver.register("a1", Arc::new(A(2)));
    }

    #[test]
    #[traced_test]
    fn test_same_name_for_different_types() {
        let resolver = Resolver::new();
        resolver.register("shared", Arc::new(A(1)));
        resolver.register("shared", Arc::new(B));

        assert!(resolver.contains::<A>("shared"));
        assert!(resolver.contains::<B>("shared"));
        assert_eq!(resolver.type_infos().len(), 2);
    }

    #[test]
    #[traced_test]
    fn test_find_returns_every_instance() {
        let resolver = Resolver::new();
        let registered = (0..5).map(|i| Arc::new(A(i))).collect::<Vec<_>>();
        for (i, a) in registered.iter().enumerate() {
            resolver.register(format!("a{i}"), a.clone());
        }

        let found = resolver.find::<A>();
        assert_eq!(found.len(), registered.len());
        for a in &registered {
            assert_eq!(found.iter().filter(|f| Arc::ptr_eq(f, a)).count(), 1);
        }

        assert!(resolver.find::<B>().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_interface_lookup_uses_explicit_registrations() {
        let resolver = Resolver::new();
        let a = Arc::new(A(7));
        let b = Arc::new(B);

        resolver.register("a", a.clone());
        resolver.register::<dyn Hello>("a", a.clone());
        resolver.register::<dyn Hello>("b", b.clone());

        let hello = resolver.get::<dyn Hello>("a").unwrap();
        assert_eq!(hello.say_hello(), 7);
        assert!(ptr::addr_eq(Arc::as_ptr(&hello), Arc::as_ptr(&a)));

        let all = resolver.find::<dyn Hello>();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|hello| ptr::addr_eq(Arc::as_ptr(hello), Arc::as_ptr(&b))));

        // `B` itself was never registered as a concrete type
        assert!(resolver.find::<B>().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_inject() {
        let resolver = Resolver::new();
        let a1 = Arc::new(A(1));
        let a2 = Arc::new(A(2));
        resolver.register("a1", a1.clone());
        resolver.register("a2", a2.clone());

        let consumer = Consumer::default();
        resolver.inject(&consumer).unwrap();

        assert!(Arc::ptr_eq(consumer.a1.get().unwrap(), &a1));
        assert!(Arc::ptr_eq(consumer.a2.get().unwrap(), &a2));
        assert!(consumer.hello.get().is_none());

        resolver.register::<dyn Hello>("b", Arc::new(B));
        let consumer = Consumer::default();
        resolver.inject(&consumer).unwrap();
        assert_eq!(consumer.hello.say_hello(), 0);
    }

    #[test]
    #[traced_test]
    fn test_inject_missing() {
        let resolver = Resolver::new();
        resolver.register("a2", Arc::new(A(2)));

        let consumer = Consumer::default();
        let err = resolver.inject(&consumer).unwrap_err();

        assert_eq!(
            err,
            InjectErrorKind::NotFound {
                field: "a1",
                name: "a1".to_owned(),
                type_name: core::any::type_name::<A>(),
            }
        );
        // fail-fast: later fields are not processed
        assert!(consumer.a2.get().is_none());
    }
}
